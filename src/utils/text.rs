use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+(?:[.,]\d+)?").unwrap());
static DIGIT_GAP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d)\s+(\d)").unwrap());
static CODE_BLOCK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").unwrap());

/// Collapses runs of whitespace and optionally truncates to `max_length`
/// characters with a `...` marker.
pub fn sanitize_text(text: &str, max_length: Option<usize>) -> String {
    let collapsed = WHITESPACE_RE.replace_all(text.trim(), " ").into_owned();
    match max_length {
        Some(limit) => truncate_with_ellipsis(&collapsed, limit),
        None => collapsed,
    }
}

pub fn truncate_with_ellipsis(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let head: String = text.chars().take(limit.saturating_sub(3)).collect();
    format!("{}...", head.trim_end())
}

pub fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}

/// Uppercases the first character, leaving the rest of the string intact.
pub fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn join_digit_groups(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = DIGIT_GAP_RE.replace_all(&current, "${1}${2}").into_owned();
        if next == current {
            return next;
        }
        current = next;
    }
}

/// Normalizes a raw price snippet to `<number><currency marker>` form
/// (`3400₽`, `$100`, `€50`). Rubles are the default currency. Returns `None`
/// when the input carries no numeric value. Idempotent: feeding an already
/// formatted price back in yields the same string.
pub fn format_price(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let lowered = trimmed.to_lowercase();
    if matches!(lowered.as_str(), "null" | "none" | "n/a" | "не указана") {
        return None;
    }

    let joined = join_digit_groups(trimmed);
    let number = NUMBER_RE.find(&joined)?.as_str().replace(',', ".");

    if trimmed.contains('₽') || lowered.contains("руб") || lowered.contains("rub") {
        Some(format!("{number}₽"))
    } else if trimmed.contains('$') || lowered.contains("usd") {
        Some(format!("${number}"))
    } else if trimmed.contains('€') || lowered.contains("eur") {
        Some(format!("€{number}"))
    } else if trimmed.contains('£') || lowered.contains("gbp") {
        Some(format!("£{number}"))
    } else {
        Some(format!("{number}₽"))
    }
}

/// Pulls a JSON object out of a model response that may wrap it in markdown
/// fences or surrounding prose. Tries a direct parse first, then each fenced
/// code block, then the substring between the first `{` and the last `}`.
pub fn extract_json_from_text(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text.trim()) {
        if value.is_object() {
            return Some(value);
        }
    }

    for caps in CODE_BLOCK_RE.captures_iter(text) {
        if let Some(block) = caps.get(1) {
            if let Ok(value) = serde_json::from_str::<Value>(block.as_str().trim()) {
                if value.is_object() {
                    return Some(value);
                }
            }
        }
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if end > start {
            if let Ok(value) = serde_json::from_str::<Value>(&text[start..=end]) {
                if value.is_object() {
                    return Some(value);
                }
            }
        }
    }

    warn!("Failed to extract JSON from model response");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_price_appends_ruble_marker_by_default() {
        assert_eq!(format_price("3400").as_deref(), Some("3400₽"));
    }

    #[test]
    fn format_price_detects_currency_words() {
        assert_eq!(format_price("3400 руб").as_deref(), Some("3400₽"));
        assert_eq!(format_price("100 usd").as_deref(), Some("$100"));
        assert_eq!(format_price("50 eur").as_deref(), Some("€50"));
        assert_eq!(format_price("$ 12.50").as_deref(), Some("$12.50"));
    }

    #[test]
    fn format_price_joins_spaced_digit_groups() {
        assert_eq!(format_price("1 500 ₽").as_deref(), Some("1500₽"));
    }

    #[test]
    fn format_price_is_idempotent() {
        for price in ["3400₽", "$100", "€50.5", "£7"] {
            let formatted = format_price(price).unwrap();
            assert_eq!(format_price(&formatted).unwrap(), formatted);
        }
    }

    #[test]
    fn format_price_rejects_null_markers() {
        assert_eq!(format_price(""), None);
        assert_eq!(format_price("null"), None);
        assert_eq!(format_price("не указана"), None);
        assert_eq!(format_price("дорого"), None);
    }

    #[test]
    fn sanitize_text_collapses_whitespace_and_caps_length() {
        assert_eq!(sanitize_text("  a\t b\n\nc  ", None), "a b c");
        let long = "x".repeat(600);
        let capped = sanitize_text(&long, Some(500));
        assert_eq!(capped.chars().count(), 500);
        assert!(capped.ends_with("..."));
    }

    #[test]
    fn json_extraction_handles_raw_fenced_and_embedded_payloads() {
        let raw = r#"{"name": "Кеды", "price": "3400"}"#;
        let fenced = format!("```json\n{raw}\n```");
        let embedded = format!("Вот данные о товаре:\n{raw}\nНадеюсь, это поможет!");

        let expected = serde_json::from_str::<Value>(raw).unwrap();
        assert_eq!(extract_json_from_text(raw), Some(expected.clone()));
        assert_eq!(extract_json_from_text(&fenced), Some(expected.clone()));
        assert_eq!(extract_json_from_text(&embedded), Some(expected));
    }

    #[test]
    fn json_extraction_returns_none_for_prose() {
        assert_eq!(extract_json_from_text("просто текст без данных"), None);
        assert_eq!(extract_json_from_text("[1, 2, 3]"), None);
    }
}
