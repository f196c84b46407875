use std::collections::HashMap;

use serde_json::Value;
use tracing::{info, warn};

use crate::llm::openrouter::OpenRouterClient;
use crate::product::prompts;
use crate::product::record::{ProductRecord, DESCRIPTION_MAX_LEN};
use crate::utils::text::{extract_json_from_text, format_price, sanitize_text, truncate_for_log};

const FIELD_MAX_LEN: usize = 120;

fn string_field(data: &Value, keys: &[&str], max_length: usize) -> Option<String> {
    for key in keys {
        let Some(raw) = data.get(*key) else {
            continue;
        };
        let text = match raw {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => continue,
        };
        let cleaned = sanitize_text(&text, Some(max_length));
        if !cleaned.is_empty() {
            return Some(cleaned);
        }
    }
    None
}

fn feature_map(data: &Value, keys: &[&str]) -> HashMap<String, String> {
    let mut features = HashMap::new();
    for key in keys {
        let Some(Value::Object(map)) = data.get(*key) else {
            continue;
        };
        for (name, value) in map {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => continue,
            };
            let cleaned = sanitize_text(&text, Some(FIELD_MAX_LEN));
            if !cleaned.is_empty() {
                features.insert(sanitize_text(name, Some(FIELD_MAX_LEN)), cleaned);
            }
        }
        if !features.is_empty() {
            break;
        }
    }
    features
}

fn record_from_json(data: &Value, name_keys: &[&str], price_keys: &[&str]) -> ProductRecord {
    ProductRecord {
        name: string_field(data, name_keys, FIELD_MAX_LEN),
        price: string_field(data, price_keys, FIELD_MAX_LEN)
            .and_then(|raw| format_price(&raw)),
        description: string_field(data, &["description"], DESCRIPTION_MAX_LEN),
        category: string_field(data, &["category"], FIELD_MAX_LEN),
        color: string_field(data, &["color"], FIELD_MAX_LEN),
        size: string_field(data, &["size"], FIELD_MAX_LEN),
        features: feature_map(data, &["other_features", "features"]),
    }
}

/// Extracts product attributes from free text with a remote model. Used as
/// a fallback when the heuristic pass could not find a product name. Every
/// failure mode degrades to an all-null record; the pipeline never aborts
/// because of this extractor.
pub struct TextAnalyzer {
    client: OpenRouterClient,
}

impl TextAnalyzer {
    pub fn new(client: OpenRouterClient) -> Self {
        TextAnalyzer { client }
    }

    pub async fn extract_product_info(&self, text: &str) -> ProductRecord {
        info!("Analyzing text: {}", truncate_for_log(text, 100));
        let prompt = prompts::EXTRACT_FROM_TEXT.replace("{text}", text);
        let response = match self.client.analyze_text(&prompt).await {
            Ok(response) => response,
            Err(err) => {
                warn!("Text analysis request failed: {err}");
                return ProductRecord::default();
            }
        };
        let record = parse_model_response(&response, &["name"], &["price"]);
        if let Some(name) = &record.name {
            info!("Extracted product from text: {name}");
        }
        record
    }

    /// Asks the model for an improved version of a product description.
    pub async fn suggest_improvements(&self, description: &str) -> anyhow::Result<String> {
        let prompt = prompts::SUGGEST_IMPROVEMENTS.replace("{description}", description);
        self.client.generate_completion(&prompt).await
    }
}

/// Extracts product attributes from a photo using the model's vision
/// capability. Same degradation contract as [`TextAnalyzer`].
pub struct VisionAnalyzer {
    client: OpenRouterClient,
}

impl VisionAnalyzer {
    pub fn new(client: OpenRouterClient) -> Self {
        VisionAnalyzer { client }
    }

    pub async fn analyze_product_image(&self, image_url: &str) -> ProductRecord {
        info!("Analyzing product photo");
        let response = match self
            .client
            .analyze_image(image_url, prompts::EXTRACT_FROM_IMAGE)
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!("Image analysis request failed: {err}");
                return ProductRecord::default();
            }
        };
        let record = parse_model_response(
            &response,
            &["product_name", "name"],
            &["price", "estimated_price", "estimated_price_range"],
        );
        if let Some(name) = &record.name {
            info!("Extracted product from photo: {name}");
        }
        record
    }

    /// Pulls visible text (labels, price tags) off a product photo.
    pub async fn extract_text_from_image(&self, image_url: &str) -> String {
        match self
            .client
            .analyze_image(image_url, prompts::EXTRACT_TEXT_FROM_IMAGE)
            .await
        {
            Ok(text) => text.trim().to_string(),
            Err(err) => {
                warn!("Text extraction from photo failed: {err}");
                String::new()
            }
        }
    }
}

fn parse_model_response(response: &str, name_keys: &[&str], price_keys: &[&str]) -> ProductRecord {
    match extract_json_from_text(response) {
        Some(data) => record_from_json(&data, name_keys, price_keys),
        None => {
            warn!("Model response did not contain a JSON object");
            ProductRecord::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_text_response_with_sanitized_fields() {
        let response = r#"```json
{"name": "  Кеды  ", "price": "3400 руб", "description": "Лёгкие   летние кеды",
 "category": "Обувь", "color": "Синий", "size": null,
 "other_features": {"материал": "текстиль"}}
```"#;
        let record = parse_model_response(response, &["name"], &["price"]);
        assert_eq!(record.name.as_deref(), Some("Кеды"));
        assert_eq!(record.price.as_deref(), Some("3400₽"));
        assert_eq!(record.description.as_deref(), Some("Лёгкие летние кеды"));
        assert_eq!(record.size, None);
        assert_eq!(record.features["материал"], "текстиль");
    }

    #[test]
    fn vision_aliases_map_onto_the_same_record() {
        let data = json!({
            "product_name": "Сумка",
            "estimated_price": "2000-3000 руб",
            "features": {"бренд": "Acme"}
        });
        let record = record_from_json(
            &data,
            &["product_name", "name"],
            &["price", "estimated_price", "estimated_price_range"],
        );
        assert_eq!(record.name.as_deref(), Some("Сумка"));
        assert_eq!(record.price.as_deref(), Some("2000₽"));
        assert_eq!(record.features["бренд"], "Acme");
    }

    #[test]
    fn unparseable_response_degrades_to_empty_record() {
        let record = parse_model_response("не могу распознать товар", &["name"], &["price"]);
        assert_eq!(record, ProductRecord::default());
    }

    #[test]
    fn numeric_price_field_is_normalized() {
        let data = json!({"name": "Часы", "price": 4500});
        let record = record_from_json(&data, &["name"], &["price"]);
        assert_eq!(record.price.as_deref(), Some("4500₽"));
    }
}
