use once_cell::sync::Lazy;
use regex::Regex;

use crate::product::record::{ProductRecord, DESCRIPTION_MAX_LEN};
use crate::utils::text::{capitalize, format_price, sanitize_text};

/// Span to drop from the working text after a price pattern matches.
enum PriceRemoval {
    WholeMatch,
    DigitsOnly,
}

struct PricePattern {
    re: Regex,
    removal: PriceRemoval,
}

static PRICE_PATTERNS: Lazy<Vec<PricePattern>> = Lazy::new(|| {
    vec![
        // 3400₽, 3 400 руб, 3400 рублей, 100 rub
        PricePattern {
            re: Regex::new(r"(?i)\d[\d\s]*(?:[.,]\d+)?\s*(?:₽|руб(?:лей|ля)?\b\.?|rub\b)")
                .unwrap(),
            removal: PriceRemoval::WholeMatch,
        },
        // цена: 3400, стоимость - 3400, price 100
        PricePattern {
            re: Regex::new(r"(?i)(?:цена|стоимость|price|cost)[:\s-]*\d[\d\s]*(?:[.,]\d+)?")
                .unwrap(),
            removal: PriceRemoval::WholeMatch,
        },
        // $100, € 50.5
        PricePattern {
            re: Regex::new(r"[$€£]\s*\d+(?:[.,]\d+)?").unwrap(),
            removal: PriceRemoval::WholeMatch,
        },
        // 100$, 50 €
        PricePattern {
            re: Regex::new(r"\d+(?:[.,]\d+)?\s*[$€£]").unwrap(),
            removal: PriceRemoval::WholeMatch,
        },
        // Last resort: a 3+-digit number forming its own comma-delimited
        // segment. Deliberately narrower than "any 3+-digit number anywhere"
        // so sizes, quantities and phone numbers inside free text do not
        // misfire; only the digits are consumed so the comma structure of
        // the remaining text survives for the name/description split.
        PricePattern {
            re: Regex::new(r"(?:^|,)\s*(\d{3,})\s*(?:,|$)").unwrap(),
            removal: PriceRemoval::DigitsOnly,
        },
    ]
});

static CATEGORY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)категори[яию][:\s-]+([^,\n]+)").unwrap());

static SIZE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)размер[:\s-]+([^,\n]+)").unwrap(),
        Regex::new(r"(?i)\b(xxxl|xxl|xl|xs|s|m|l)\b").unwrap(),
        Regex::new(r"(?i)\b(\d+\s*(?:см|мм|м|x|х)\s*\d*)\b").unwrap(),
        Regex::new(r"(?i)\b(большой|средний|маленький|огромный|мини)\b").unwrap(),
    ]
});

/// Surface forms (with grammatical variants) mapped to canonical color names.
/// The first vocabulary hit wins.
static COLOR_VOCAB: &[(&[&str], &str)] = &[
    (&["красный", "красная", "красное", "красные"], "Красный"),
    (&["синий", "синяя", "синее", "синие"], "Синий"),
    (
        &["зелёный", "зеленый", "зелёная", "зеленая", "зелёные", "зеленые"],
        "Зелёный",
    ),
    (&["жёлтый", "желтый", "жёлтая", "желтая"], "Жёлтый"),
    (&["белый", "белая", "белое", "белые"], "Белый"),
    (
        &["чёрный", "черный", "чёрная", "черная", "чёрные", "черные"],
        "Чёрный",
    ),
    (&["розовый", "розовая", "розовые"], "Розовый"),
    (&["оранжевый", "оранжевая"], "Оранжевый"),
    (&["фиолетовый", "фиолетовая"], "Фиолетовый"),
    (&["голубой", "голубая", "голубые"], "Голубой"),
    (&["серый", "серая", "серые"], "Серый"),
    (&["коричневый", "коричневая"], "Коричневый"),
    (&["бежевый", "бежевая"], "Бежевый"),
];

/// Keywords that mark a leftover segment as already-extracted metadata; such
/// segments are dropped from the description.
const METADATA_KEYWORDS: &[&str] = &["размер", "категори", "цвет"];

static COMMA_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*,[\s,]*").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

fn extract_price(working: &mut String) -> Option<String> {
    for pattern in PRICE_PATTERNS.iter() {
        let Some(caps) = pattern.re.captures(working) else {
            continue;
        };
        let whole = caps.get(0).expect("group 0 always present");
        let Some(price) = format_price(whole.as_str()) else {
            continue;
        };
        let span = match pattern.removal {
            PriceRemoval::WholeMatch => whole.range(),
            PriceRemoval::DigitsOnly => caps.get(1).map(|m| m.range()).unwrap_or(whole.range()),
        };
        working.replace_range(span, "");
        return Some(price);
    }
    None
}

fn extract_category(working: &mut String) -> Option<String> {
    let caps = CATEGORY_RE.captures(working)?;
    let value = capitalize(caps.get(1)?.as_str().trim());
    let span = caps.get(0)?.range();
    working.replace_range(span, "");
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn extract_size(working: &mut String) -> Option<String> {
    for pattern in SIZE_PATTERNS.iter() {
        let Some(caps) = pattern.captures(working) else {
            continue;
        };
        let value = caps
            .get(1)
            .map(|m| m.as_str())
            .unwrap_or_else(|| caps.get(0).expect("group 0 always present").as_str())
            .trim()
            .to_string();
        let span = caps.get(0).expect("group 0 always present").range();
        working.replace_range(span, "");
        if !value.is_empty() {
            return Some(value);
        }
    }
    None
}

fn extract_color(working: &mut String) -> Option<String> {
    let lowered = working.to_lowercase();
    for (variants, canonical) in COLOR_VOCAB {
        for variant in *variants {
            if !lowered.contains(variant) {
                continue;
            }
            let escaped = regex::escape(variant);
            let phrase = Regex::new(&format!(r"(?i)цвет[а]?\s+{escaped}")).unwrap();
            *working = phrase.replace(working, "").into_owned();
            let word = Regex::new(&format!(r"(?i)\b{escaped}\b")).unwrap();
            *working = word.replace(working, "").into_owned();
            return Some(canonical.to_string());
        }
    }
    None
}

fn cleanup(working: &str) -> String {
    let joined = COMMA_RUN_RE.replace_all(working, ", ");
    let collapsed = WHITESPACE_RE.replace_all(&joined, " ");
    collapsed.trim_matches(|c| c == ',' || c == ' ').to_string()
}

/// Regex/lexicon extraction of product attributes from free text. Pure and
/// deterministic: no I/O, no hidden state; empty input yields an all-null
/// record. Each step consumes the span it matched so later steps never
/// re-match the same text.
pub fn extract(text: &str) -> ProductRecord {
    let mut record = ProductRecord::default();
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return record;
    }

    let mut working = trimmed.to_string();

    record.price = extract_price(&mut working);
    record.category = extract_category(&mut working);
    record.size = extract_size(&mut working);
    record.color = extract_color(&mut working);

    let remaining = cleanup(&working);
    if remaining.is_empty() {
        return record;
    }

    let parts: Vec<&str> = remaining
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();

    if let Some(first) = parts.first() {
        record.name = Some(capitalize(first));
    }
    if parts.len() > 1 {
        let description_parts: Vec<&str> = parts[1..]
            .iter()
            .copied()
            .filter(|part| {
                let lowered = part.to_lowercase();
                !METADATA_KEYWORDS
                    .iter()
                    .any(|keyword| lowered.contains(keyword))
            })
            .collect();
        if !description_parts.is_empty() {
            record.description = Some(sanitize_text(
                &description_parts.join(", "),
                Some(DESCRIPTION_MAX_LEN),
            ));
        }
    }

    record
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_name_price_and_color_from_comma_separated_text() {
        let record = extract("Кеды, 3400 руб, синие");
        assert_eq!(record.name.as_deref(), Some("Кеды"));
        assert_eq!(record.price.as_deref(), Some("3400₽"));
        assert_eq!(record.color.as_deref(), Some("Синий"));
        assert_eq!(record.description, None);
    }

    #[test]
    fn price_label_pattern_wins_without_currency_marker() {
        let record = extract("Футболка, цена: 1200, белая");
        assert_eq!(record.price.as_deref(), Some("1200₽"));
        assert_eq!(record.color.as_deref(), Some("Белый"));
    }

    #[test]
    fn detects_dollar_and_euro_prices() {
        assert_eq!(extract("Часы, $150").price.as_deref(), Some("$150"));
        assert_eq!(extract("Сумка, 90€").price.as_deref(), Some("€90"));
    }

    #[test]
    fn bare_number_counts_as_price_only_as_its_own_segment() {
        let record = extract("Кроссовки, 4500, удобные");
        assert_eq!(record.price.as_deref(), Some("4500₽"));
        assert_eq!(record.name.as_deref(), Some("Кроссовки"));
        assert_eq!(record.description.as_deref(), Some("удобные"));

        // A 3+-digit number buried inside a segment is not a price.
        let record = extract("Чехол для iPhone 15 Pro, кожаный");
        assert_eq!(record.price, None);
    }

    #[test]
    fn extracts_labeled_category_and_size() {
        let record = extract("Платье, категория: одежда, размер: M, красное");
        assert_eq!(record.category.as_deref(), Some("Одежда"));
        assert_eq!(record.size.as_deref(), Some("M"));
        assert_eq!(record.color.as_deref(), Some("Красный"));
        assert_eq!(record.name.as_deref(), Some("Платье"));
    }

    #[test]
    fn detects_size_codes_and_dimensions() {
        assert_eq!(extract("Толстовка xl, серая").size.as_deref(), Some("xl"));
        assert_eq!(
            extract("Ковёр, 200 x 300, бежевый").size.as_deref(),
            Some("200 x 300")
        );
        assert_eq!(
            extract("Брелок, маленький, жёлтый").size.as_deref(),
            Some("маленький")
        );
    }

    #[test]
    fn plural_color_variant_maps_to_canonical_name() {
        assert_eq!(extract("Носки, чёрные").color.as_deref(), Some("Чёрный"));
        assert_eq!(extract("Кеды синие").color.as_deref(), Some("Синий"));
    }

    #[test]
    fn color_phrase_is_removed_from_description() {
        let record = extract("Рюкзак, 2500 руб, цвет синий, водонепроницаемый");
        assert_eq!(record.color.as_deref(), Some("Синий"));
        assert_eq!(record.description.as_deref(), Some("водонепроницаемый"));
    }

    #[test]
    fn leftover_metadata_segments_are_filtered_from_description() {
        let record = extract("Кружка, керамическая, размерный ряд уточняйте");
        assert_eq!(record.name.as_deref(), Some("Кружка"));
        assert_eq!(record.description.as_deref(), Some("керамическая"));
    }

    #[test]
    fn empty_input_yields_all_null_record() {
        assert_eq!(extract(""), ProductRecord::default());
        assert_eq!(extract("   \n\t "), ProductRecord::default());
    }

    #[test]
    fn extraction_is_idempotent_for_fixed_input() {
        let input = "Кеды, 3400 руб, синие, категория: обувь";
        assert_eq!(extract(input), extract(input));
    }
}
