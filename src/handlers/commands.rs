use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::ParseMode;

use crate::card::TemplateStyle;
use crate::state::AppState;

pub async fn start_handler(bot: Bot, message: Message) -> Result<()> {
    let text = "Привет! Я помогу создать карточку товара.\n\n\
        Отправьте мне описание товара текстом (например: «Кеды, 3400 руб, синие»)\n\
        или фото товара — подпись к фото тоже учитывается.\n\n\
        Я распознаю название, цену, категорию, цвет и размер, покажу их вам \
        на подтверждение и соберу готовую карточку в выбранном шаблоне.\n\n\
        Команды:\n\
        /templates — список шаблонов\n\
        /cancel — начать заново\n\
        /help — справка";
    bot.send_message(message.chat.id, text).await?;
    Ok(())
}

pub async fn help_handler(bot: Bot, message: Message) -> Result<()> {
    let text = "Как это работает:\n\n\
        1. Отправьте описание товара или его фото.\n\
        2. Я извлеку данные и покажу, что понял.\n\
        3. Если что-то не так — просто отправьте уточнение текстом \
        (например: «цена 2990, цвет чёрный»).\n\
        4. Подтвердите данные и выберите шаблон карточки.\n\n\
        Поддерживаются цены в рублях, долларах, евро и фунтах.";
    bot.send_message(message.chat.id, text).await?;
    Ok(())
}

pub async fn templates_handler(bot: Bot, message: Message) -> Result<()> {
    let mut text = String::from("Доступные шаблоны:\n");
    for style in TemplateStyle::ALL {
        text.push_str(&format!("\n*{}*\n{}\n", style.label(), style.description()));
    }
    bot.send_message(message.chat.id, text)
        .parse_mode(ParseMode::Markdown)
        .await?;
    Ok(())
}

pub async fn cancel_handler(bot: Bot, state: AppState, message: Message) -> Result<()> {
    state.reset_session(message.chat.id);
    bot.send_message(
        message.chat.id,
        "Хорошо, начнём заново. Отправьте описание или фото товара.",
    )
    .await?;
    Ok(())
}
