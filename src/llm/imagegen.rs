use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::config::Config;
use crate::llm::openrouter::OpenRouterClient;
use crate::product::ProductRecord;
use crate::utils::text::truncate_for_log;

static DATA_IMAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"data:image/[^;]+;base64,[A-Za-z0-9+/=]+").unwrap());

/// Generates a studio-style product photo when the user supplied only a text
/// description. Uses the image-capable model through the same chat
/// completions endpoint with `modalities: ["image", "text"]`. Failures are
/// never fatal: a card can always be rendered without a photo.
pub struct ImageGenerator {
    client: OpenRouterClient,
    timeout: Duration,
}

impl ImageGenerator {
    pub fn new(config: &Config) -> Self {
        ImageGenerator {
            client: OpenRouterClient::for_model(config, &config.image_model),
            timeout: Duration::from_secs(config.image_timeout_secs),
        }
    }

    /// Returns a base64 data URL of the generated image, or `None`.
    pub async fn generate_product_image(&self, record: &ProductRecord) -> Option<String> {
        let Some(name) = record.name.as_deref() else {
            return None;
        };
        let prompt = build_prompt(name, record);
        info!(
            "Generating product image with prompt: {}",
            truncate_for_log(&prompt, 100)
        );

        let payload = json!({
            "model": self.client.model(),
            "messages": [{ "role": "user", "content": prompt }],
            "modalities": ["image", "text"],
            "max_tokens": 4096,
        });

        match self.client.call_chat_completions(&payload, self.timeout).await {
            Ok(response) => {
                let image = extract_image_from_response(&response);
                if image.is_none() {
                    warn!("Image generation response contained no image");
                }
                image
            }
            Err(err) => {
                warn!("Image generation failed: {err}");
                None
            }
        }
    }
}

fn build_prompt(name: &str, record: &ProductRecord) -> String {
    let mut parts = vec![format!(
        "Generate a professional realistic product photograph of {name}"
    )];
    if let Some(color) = &record.color {
        parts.push(format!("in {color} color"));
    }
    if let Some(size) = &record.size {
        parts.push(format!("{size} size"));
    }
    if let Some(category) = &record.category {
        parts.push(format!("({category})"));
    }
    parts.push(
        "on a clean white or light gradient background, studio lighting, \
         high resolution, centered composition, no text or watermarks, \
         product only, professional e-commerce style"
            .to_string(),
    );
    parts.join(", ")
}

/// Pulls a `data:image/...;base64,` URL out of a chat completions response.
/// Checks, in order: the message's `images` field, list-typed `content`
/// parts (`image_url` or `inline_data`), and finally a regex scan of
/// string-typed `content`.
pub(crate) fn extract_image_from_response(response: &Value) -> Option<String> {
    let message = response.pointer("/choices/0/message")?;

    if let Some(images) = message.get("images").and_then(|v| v.as_array()) {
        for img in images {
            let url = img
                .pointer("/image_url/url")
                .and_then(|v| v.as_str())
                .unwrap_or("");
            if url.starts_with("data:image") {
                return Some(url.to_string());
            }
        }
    }

    match message.get("content") {
        Some(Value::Array(parts)) => {
            for part in parts {
                if part.get("type").and_then(|v| v.as_str()) == Some("image_url") {
                    let url = part
                        .pointer("/image_url/url")
                        .and_then(|v| v.as_str())
                        .unwrap_or("");
                    if url.starts_with("data:image") {
                        return Some(url.to_string());
                    }
                } else if let Some(inline) = part.get("inline_data") {
                    let mime = inline
                        .get("mime_type")
                        .and_then(|v| v.as_str())
                        .unwrap_or("image/png");
                    let data = inline.get("data").and_then(|v| v.as_str()).unwrap_or("");
                    if !data.is_empty() {
                        return Some(format!("data:{mime};base64,{data}"));
                    }
                }
            }
            None
        }
        Some(Value::String(content)) => DATA_IMAGE_RE
            .find(content)
            .map(|m| m.as_str().to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_image_from_images_field() {
        let response = json!({
            "choices": [{
                "message": {
                    "content": "here you go",
                    "images": [{
                        "type": "image_url",
                        "image_url": { "url": "data:image/png;base64,AAAA" }
                    }]
                }
            }]
        });
        assert_eq!(
            extract_image_from_response(&response).as_deref(),
            Some("data:image/png;base64,AAAA")
        );
    }

    #[test]
    fn extracts_image_from_content_parts() {
        let response = json!({
            "choices": [{
                "message": {
                    "content": [
                        { "type": "text", "text": "done" },
                        { "type": "image_url", "image_url": { "url": "data:image/webp;base64,BBBB" } }
                    ]
                }
            }]
        });
        assert_eq!(
            extract_image_from_response(&response).as_deref(),
            Some("data:image/webp;base64,BBBB")
        );

        let inline = json!({
            "choices": [{
                "message": {
                    "content": [{ "inline_data": { "mime_type": "image/png", "data": "CCCC" } }]
                }
            }]
        });
        assert_eq!(
            extract_image_from_response(&inline).as_deref(),
            Some("data:image/png;base64,CCCC")
        );
    }

    #[test]
    fn scans_string_content_for_embedded_data_url() {
        let response = json!({
            "choices": [{
                "message": { "content": "result: data:image/png;base64,DDDD= and some text" }
            }]
        });
        assert_eq!(
            extract_image_from_response(&response).as_deref(),
            Some("data:image/png;base64,DDDD=")
        );
    }

    #[test]
    fn returns_none_when_no_image_is_present() {
        let response = json!({
            "choices": [{ "message": { "content": "no image today" } }]
        });
        assert_eq!(extract_image_from_response(&response), None);
    }

    #[test]
    fn prompt_includes_known_attributes() {
        let record = ProductRecord {
            name: Some("кеды".to_string()),
            color: Some("Синий".to_string()),
            category: Some("Обувь".to_string()),
            ..ProductRecord::default()
        };
        let prompt = build_prompt("кеды", &record);
        assert!(prompt.contains("Синий"));
        assert!(prompt.contains("(Обувь)"));
    }
}
