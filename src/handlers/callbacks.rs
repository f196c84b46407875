use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, InputFile};
use tracing::{error, info};

use crate::card::{CardBuilder, TemplateStyle};
use crate::llm::{ImageGenerator, OpenRouterClient};
use crate::product::TextAnalyzer;
use crate::state::{AppState, ConversationEvent, ConversationState};

pub const CONFIRM_CALLBACK: &str = "confirm_data";
pub const IMPROVE_CALLBACK: &str = "improve_description";
pub const CANCEL_CALLBACK: &str = "cancel";
pub const TEMPLATE_CALLBACK_PREFIX: &str = "template_";

fn template_keyboard() -> InlineKeyboardMarkup {
    let rows = TemplateStyle::ALL.into_iter().map(|style| {
        vec![InlineKeyboardButton::callback(
            style.label(),
            format!("{TEMPLATE_CALLBACK_PREFIX}{}", style.name()),
        )]
    });
    InlineKeyboardMarkup::new(rows)
}

pub async fn callback_handler(bot: Bot, state: AppState, query: CallbackQuery) -> Result<()> {
    let Some(data) = query.data.clone() else {
        return Ok(());
    };
    let Some(message) = query.message.clone() else {
        return Ok(());
    };
    let chat_id = message.chat().id;
    let message_id = message.id();
    bot.answer_callback_query(query.id.clone()).await?;

    match data.as_str() {
        CONFIRM_CALLBACK => {
            if state.session(chat_id).state != ConversationState::ConfirmingData {
                return Ok(());
            }
            state.apply_event(chat_id, ConversationEvent::DataConfirmed);
            bot.edit_message_text(chat_id, message_id, "Выберите шаблон карточки:")
                .reply_markup(template_keyboard())
                .await?;
        }
        IMPROVE_CALLBACK => {
            let session = state.session(chat_id);
            if session.state != ConversationState::ConfirmingData {
                return Ok(());
            }
            let Some(description) = session.record.description.clone() else {
                bot.send_message(chat_id, "Пока нечего улучшать: описание не заполнено.")
                    .await?;
                return Ok(());
            };
            let analyzer = TextAnalyzer::new(OpenRouterClient::new(&state.config));
            match analyzer.suggest_improvements(&description).await {
                Ok(suggestion) => {
                    let text = format!(
                        "Вариант описания:\n\n{suggestion}\n\nЧтобы принять его, отправьте текст описания обычным сообщением.",
                    );
                    bot.send_message(chat_id, text).await?;
                }
                Err(err) => {
                    error!("Description improvement failed for chat {chat_id}: {err}");
                    bot.send_message(chat_id, "Не удалось получить предложения, попробуйте позже.")
                        .await?;
                }
            }
        }
        CANCEL_CALLBACK => {
            state.reset_session(chat_id);
            bot.edit_message_text(
                chat_id,
                message_id,
                "Отменено. Отправьте описание или фото товара, чтобы начать заново.",
            )
            .await?;
        }
        other if other.starts_with(TEMPLATE_CALLBACK_PREFIX) => {
            let name = other.trim_start_matches(TEMPLATE_CALLBACK_PREFIX);
            let style = match TemplateStyle::from_name(name) {
                Ok(style) => style,
                Err(err) => {
                    bot.send_message(chat_id, err.to_string()).await?;
                    return Ok(());
                }
            };

            let session = state.session(chat_id);
            if session.state != ConversationState::SelectingTemplate {
                return Ok(());
            }

            bot.edit_message_text(chat_id, message_id, "Создаю карточку…")
                .await?;

            // A real product photo wins; only generate one when the user
            // never sent any and generation is enabled.
            let mut photo_source = session.photo_url.clone();
            if photo_source.is_none() && state.config.enable_image_generation {
                photo_source = ImageGenerator::new(&state.config)
                    .generate_product_image(&session.record)
                    .await;
            }

            let builder = CardBuilder::new(style, state.config.cards_dir.clone());
            match builder
                .build_card(&session.record, photo_source.as_deref())
                .await
            {
                Ok(path) => {
                    info!("Sending card {} to chat {}", path.display(), chat_id);
                    bot.send_photo(chat_id, InputFile::file(path))
                        .caption(session.record.summary())
                        .await?;
                    state.apply_event(chat_id, ConversationEvent::TemplateChosen);
                    state.reset_session(chat_id);
                }
                Err(err) => {
                    error!("Card generation failed for chat {chat_id}: {err}");
                    bot.send_message(
                        chat_id,
                        "Не удалось создать карточку. Попробуйте ещё раз или выберите другой шаблон.",
                    )
                    .await?;
                }
            }
        }
        _ => {}
    }
    Ok(())
}
