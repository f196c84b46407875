use std::time::Duration;

use anyhow::{anyhow, Result};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::config::Config;
use crate::utils::http::get_http_client;
use crate::utils::text::truncate_for_log;

const HTTP_REFERER: &str = "https://github.com/product-card-bot";
const APP_TITLE: &str = "Product Card Bot";

fn summarize_error_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        if let Some(message) = value.pointer("/error/message").and_then(|v| v.as_str()) {
            return message.to_string();
        }
    }

    truncate_for_log(trimmed, 2000)
}

/// Client for the OpenRouter chat completions API. Built once from the
/// process configuration and shared by the text and vision analyzers.
///
/// Transport policy: one bounded retry budget with exponential backoff on
/// rate limiting, linear redelivery on timeouts; any other HTTP error fails
/// fast. Callers above this layer never retry.
#[derive(Debug, Clone)]
pub struct OpenRouterClient {
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: i32,
    max_retries: usize,
    retry_base_delay: Duration,
    request_timeout: Duration,
}

impl OpenRouterClient {
    pub fn new(config: &Config) -> Self {
        Self::for_model(config, &config.text_model)
    }

    /// Same transport policy, different model. Used by the image generator.
    pub fn for_model(config: &Config, model: &str) -> Self {
        OpenRouterClient {
            api_key: config.openrouter_api_key.clone(),
            base_url: config.openrouter_base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
            retry_base_delay: Duration::from_secs(config.retry_base_delay_secs),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    pub(crate) async fn call_chat_completions(
        &self,
        payload: &Value,
        timeout: Duration,
    ) -> Result<Value> {
        let client = get_http_client();
        let url = format!("{}/chat/completions", self.base_url);

        for attempt in 0..self.max_retries {
            let response = match client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("HTTP-Referer", HTTP_REFERER)
                .header("X-Title", APP_TITLE)
                .timeout(timeout)
                .json(payload)
                .send()
                .await
            {
                Ok(response) => response,
                Err(err) if err.is_timeout() || err.is_connect() => {
                    warn!(
                        "OpenRouter request failed: {err} (attempt {}/{})",
                        attempt + 1,
                        self.max_retries
                    );
                    if attempt + 1 == self.max_retries {
                        return Err(err.into());
                    }
                    tokio::time::sleep(self.retry_base_delay).await;
                    continue;
                }
                Err(err) => return Err(err.into()),
            };

            let status = response.status();
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let wait = self.retry_base_delay * 2u32.pow(attempt as u32);
                warn!(
                    "OpenRouter rate limited; waiting {}s before retry (attempt {}/{})",
                    wait.as_secs(),
                    attempt + 1,
                    self.max_retries
                );
                if attempt + 1 == self.max_retries {
                    return Err(anyhow!("OpenRouter request failed: rate limit exhausted"));
                }
                tokio::time::sleep(wait).await;
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let detail = summarize_error_body(&body);
                warn!("OpenRouter API error: status={status}, body={detail}");
                return Err(anyhow!(
                    "OpenRouter request failed with status {status}: {detail}"
                ));
            }

            let value = response.json::<Value>().await?;
            debug!(
                "OpenRouter response received for model={}",
                payload
                    .get("model")
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown")
            );
            return Ok(value);
        }

        Err(anyhow!("OpenRouter request failed after all retries"))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn extract_content(response: &Value) -> Result<String> {
        response
            .pointer("/choices/0/message/content")
            .and_then(|v| v.as_str())
            .map(|v| v.to_string())
            .ok_or_else(|| anyhow!("OpenRouter response missing message content"))
    }

    /// Sends a plain text prompt and returns the model's answer.
    pub async fn analyze_text(&self, prompt: &str) -> Result<String> {
        let payload = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });
        let response = self
            .call_chat_completions(&payload, self.request_timeout)
            .await?;
        Self::extract_content(&response)
    }

    /// Sends a vision request: a text prompt plus an image reference (an
    /// https URL or a base64 data URL).
    pub async fn analyze_image(&self, image_url: &str, prompt: &str) -> Result<String> {
        let payload = json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt },
                    { "type": "image_url", "image_url": { "url": image_url } }
                ]
            }],
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
        });
        let response = self
            .call_chat_completions(&payload, self.request_timeout)
            .await?;
        Self::extract_content(&response)
    }

    pub async fn generate_completion(&self, prompt: &str) -> Result<String> {
        self.analyze_text(prompt).await
    }
}
