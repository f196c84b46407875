//! Prompt templates for the OpenRouter-backed extractors. `{text}` and
//! `{description}` placeholders are substituted before sending.

pub const EXTRACT_FROM_TEXT: &str = "\
Ты помощник по каталогизации товаров. Извлеки информацию о товаре из описания ниже.
Ответь СТРОГО одним JSON объектом без пояснений, со следующими ключами
(значение null, если информации нет):
{\"name\": string, \"price\": string, \"description\": string, \"category\": string, \
\"color\": string, \"size\": string, \"other_features\": {string: string}}

Описание товара:
{text}";

pub const EXTRACT_FROM_IMAGE: &str = "\
Ты помощник по каталогизации товаров. Посмотри на фотографию товара и опиши его.
Ответь СТРОГО одним JSON объектом без пояснений, со следующими ключами
(значение null, если определить нельзя):
{\"product_name\": string, \"category\": string, \"color\": string, \"size\": string, \
\"description\": string, \"estimated_price\": string, \"other_features\": {string: string}}

Описание и название пиши на русском языке.";

pub const EXTRACT_TEXT_FROM_IMAGE: &str = "\
Перечисли весь видимый текст на этой фотографии товара (этикетки, ценники, надписи).
Если текста нет, ответь пустой строкой. Не добавляй пояснений.";

pub const SUGGEST_IMPROVEMENTS: &str = "\
Ты копирайтер интернет-магазина. Предложи улучшенную версию описания товара ниже:
сделай его продающим, кратким и конкретным. Ответь только улучшенным текстом.

Текущее описание:
{description}";
