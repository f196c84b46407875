use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::FileId;
use tracing::warn;

use crate::handlers::description::{extract_record, send_confirmation};
use crate::llm::OpenRouterClient;
use crate::product::{heuristic, merge, MergePriority, VisionAnalyzer};
use crate::state::{AppState, ConversationEvent};

pub async fn get_file_url(bot: &Bot, file_id: &FileId, bot_token: &str) -> Result<String> {
    let file = bot.get_file(file_id.clone()).await?;
    Ok(format!(
        "https://api.telegram.org/file/bot{}/{}",
        bot_token, file.path
    ))
}

pub async fn photo_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    let Some(photo) = message.photo().and_then(|sizes| sizes.last()) else {
        return Ok(());
    };
    let chat_id = message.chat.id;

    state.apply_event(chat_id, ConversationEvent::PhotoReceived);
    bot.send_message(chat_id, "Анализирую фото товара…").await?;

    let file_url = match get_file_url(&bot, &photo.file.id, &state.config.bot_token).await {
        Ok(url) => url,
        Err(err) => {
            warn!("Failed to resolve photo file URL: {err}");
            bot.send_message(chat_id, "Не удалось загрузить фото, попробуйте ещё раз.")
                .await?;
            state.apply_event(chat_id, ConversationEvent::Reset);
            return Ok(());
        }
    };

    let analyzer = VisionAnalyzer::new(OpenRouterClient::new(&state.config));
    let mut record = analyzer.analyze_product_image(&file_url).await;

    // Caption text is the user's own words, so its fields override what
    // the vision model guessed.
    if let Some(caption) = message.caption() {
        let caption_record = extract_record(&state, caption).await;
        record = merge(&record, &caption_record, MergePriority::Secondary);
    } else if !record.is_usable() {
        // No caption and a weak vision read: price tags and labels on the
        // photo itself often carry the missing fields.
        let visible_text = analyzer.extract_text_from_image(&file_url).await;
        if !visible_text.is_empty() {
            let label_record = heuristic::extract(&visible_text);
            record = merge(&record, &label_record, MergePriority::Primary);
        }
    }

    state.update_session(chat_id, |s| {
        s.record = record.clone();
        s.photo_url = Some(file_url.clone());
        s.original_text = message.caption().map(|c| c.to_string());
        s.state = s.state.on_event(ConversationEvent::ExtractionFinished);
    });

    if record.is_usable() {
        send_confirmation(&bot, chat_id, &record).await?;
    } else {
        bot.send_message(
            chat_id,
            "По фото не удалось понять, что это за товар. Добавьте текстом название и цену.",
        )
        .await?;
    }
    Ok(())
}
