use std::env;
use std::path::PathBuf;

use anyhow::{bail, Result};

/// Process configuration, loaded from the environment once at startup and
/// threaded into the OpenRouter client and card builder as a constructor
/// argument. Core extraction/rendering code never reads ambient state.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub log_level: String,
    pub openrouter_api_key: String,
    pub openrouter_base_url: String,
    pub text_model: String,
    pub image_model: String,
    pub temperature: f32,
    pub max_tokens: i32,
    pub request_timeout_secs: u64,
    pub image_timeout_secs: u64,
    pub max_retries: usize,
    pub retry_base_delay_secs: u64,
    pub enable_image_generation: bool,
    pub cards_dir: PathBuf,
}

fn env_string(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .map(|value| value.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn env_f32(name: &str, default: f32) -> f32 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<f32>().ok())
        .unwrap_or(default)
}

fn env_i32(name: &str, default: i32) -> i32 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<i32>().ok())
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn load() -> Result<Config> {
        let config = Config {
            bot_token: env_string("BOT_TOKEN", ""),
            log_level: env_string("LOG_LEVEL", "info"),
            openrouter_api_key: env_string("OPENROUTER_API_KEY", ""),
            openrouter_base_url: env_string(
                "OPENROUTER_BASE_URL",
                "https://openrouter.ai/api/v1",
            ),
            text_model: env_string("MODEL_NAME", "google/gemini-2.5-flash"),
            image_model: env_string("IMAGE_MODEL_NAME", "google/gemini-2.5-flash-image"),
            temperature: env_f32("MODEL_TEMPERATURE", 0.3),
            max_tokens: env_i32("MODEL_MAX_TOKENS", 1024),
            request_timeout_secs: env_u64("REQUEST_TIMEOUT_SECONDS", 60),
            image_timeout_secs: env_u64("IMAGE_TIMEOUT_SECONDS", 120),
            max_retries: env_usize("MAX_RETRIES", 3).max(1),
            retry_base_delay_secs: env_u64("RETRY_BASE_DELAY_SECONDS", 2),
            enable_image_generation: env_bool("ENABLE_IMAGE_GENERATION", true),
            cards_dir: PathBuf::from(env_string("CARDS_DIR", "cards")),
        };

        if config.bot_token.trim().is_empty() {
            bail!("BOT_TOKEN is required");
        }
        if config.openrouter_api_key.trim().is_empty() {
            bail!("OPENROUTER_API_KEY is required");
        }

        Ok(config)
    }
}

#[cfg(test)]
impl Config {
    pub fn default_for_tests() -> Config {
        Config {
            bot_token: "test-token".to_string(),
            log_level: "debug".to_string(),
            openrouter_api_key: "test-key".to_string(),
            openrouter_base_url: "https://openrouter.ai/api/v1".to_string(),
            text_model: "google/gemini-2.5-flash".to_string(),
            image_model: "google/gemini-2.5-flash-image".to_string(),
            temperature: 0.3,
            max_tokens: 1024,
            request_timeout_secs: 60,
            image_timeout_secs: 120,
            max_retries: 3,
            retry_base_delay_secs: 2,
            enable_image_generation: false,
            cards_dir: PathBuf::from("cards"),
        }
    }
}
