use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use tracing::info;

use crate::handlers::callbacks::{CANCEL_CALLBACK, CONFIRM_CALLBACK, IMPROVE_CALLBACK};
use crate::llm::OpenRouterClient;
use crate::product::{heuristic, merge, MergePriority, ProductRecord, TextAnalyzer};
use crate::state::{AppState, ConversationEvent, ConversationState};

pub(crate) fn confirm_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([
        [InlineKeyboardButton::callback("✅ Всё верно", CONFIRM_CALLBACK)],
        [InlineKeyboardButton::callback("💡 Улучшить описание", IMPROVE_CALLBACK)],
        [InlineKeyboardButton::callback("❌ Отмена", CANCEL_CALLBACK)],
    ])
}

/// Shows the extracted record and asks the user to confirm or correct it.
pub(crate) async fn send_confirmation(
    bot: &Bot,
    chat_id: ChatId,
    record: &ProductRecord,
) -> Result<()> {
    let text = format!(
        "{}\n\nВсё верно? Если нет — отправьте уточнение текстом,\nнапример: «цена 2990, цвет чёрный».",
        record.summary()
    );
    bot.send_message(chat_id, text)
        .reply_markup(confirm_keyboard())
        .await?;
    Ok(())
}

/// Runs heuristic extraction over free text and falls back to the language
/// model only when the heuristics could not find a product name. Heuristic
/// values win the merge; the model fills the gaps.
pub(crate) async fn extract_record(state: &AppState, text: &str) -> ProductRecord {
    let record = heuristic::extract(text);
    if record.name.is_some() {
        return record;
    }

    info!("Heuristics found no product name, asking the model");
    let analyzer = TextAnalyzer::new(OpenRouterClient::new(&state.config));
    let ai_record = analyzer.extract_product_info(text).await;
    merge(&ai_record, &record, MergePriority::Secondary)
}

pub async fn text_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    let Some(text) = message.text() else {
        return Ok(());
    };
    let chat_id = message.chat.id;
    let session = state.session(chat_id);

    // While data is awaiting confirmation, plain text is a correction:
    // whatever the user states now overrides the extracted values.
    if session.state == ConversationState::ConfirmingData {
        let correction = heuristic::extract(text);
        let merged = merge(&session.record, &correction, MergePriority::Secondary);
        state.update_session(chat_id, |s| {
            s.record = merged.clone();
            s.state = s.state.on_event(ConversationEvent::CorrectionReceived);
        });
        send_confirmation(&bot, chat_id, &merged).await?;
        return Ok(());
    }

    state.apply_event(chat_id, ConversationEvent::TextReceived);
    bot.send_message(chat_id, "Анализирую описание…").await?;

    let record = extract_record(&state, text).await;
    state.update_session(chat_id, |s| {
        s.record = record.clone();
        s.original_text = Some(text.to_string());
        s.photo_url = None;
        s.state = s.state.on_event(ConversationEvent::ExtractionFinished);
    });

    if record.is_usable() {
        send_confirmation(&bot, chat_id, &record).await?;
    } else {
        // Stay in the confirmation state so the next message merges in
        // as a correction instead of restarting extraction.
        bot.send_message(
            chat_id,
            "Мне не хватает данных для карточки. Отправьте хотя бы название товара и цену или описание.",
        )
        .await?;
    }
    Ok(())
}
