use std::time::Duration;

use base64::{engine::general_purpose, Engine as _};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::StatusCode;
use tracing::{error, warn};

use crate::utils::http::get_http_client;
use crate::utils::text::truncate_for_log;

const DOWNLOAD_MAX_ATTEMPTS: usize = 3;
const DOWNLOAD_BASE_DELAY_MS: u64 = 400;
const DOWNLOAD_ERROR_BODY_LIMIT: usize = 800;

static DATA_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^data:image/[^;]+;base64,(.+)$").unwrap());

pub fn detect_mime_type(data: &[u8]) -> Option<String> {
    infer::get(data).map(|kind| kind.mime_type().to_string())
}

/// Decodes an inline `data:image/...;base64,` URL into raw image bytes.
pub fn decode_data_url(url: &str) -> Option<Vec<u8>> {
    let caps = DATA_URL_RE.captures(url.trim())?;
    match general_purpose::STANDARD.decode(caps.get(1)?.as_str()) {
        Ok(bytes) => Some(bytes),
        Err(err) => {
            warn!("Failed to decode base64 data URL: {err}");
            None
        }
    }
}

fn should_retry_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
}

fn should_retry_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}

/// Downloads a product photo with bounded retries. Any terminal failure is
/// reported as `None`; a card without a photo is still a valid card.
pub async fn download_media(url: &str) -> Option<Vec<u8>> {
    let client = get_http_client();
    for attempt in 0..DOWNLOAD_MAX_ATTEMPTS {
        let response = match client.get(url).send().await {
            Ok(resp) => resp,
            Err(err) => {
                warn!(
                    "Failed to fetch photo {url}: {err} (attempt {}/{})",
                    attempt + 1,
                    DOWNLOAD_MAX_ATTEMPTS
                );
                if !should_retry_error(&err) || attempt + 1 == DOWNLOAD_MAX_ATTEMPTS {
                    return None;
                }
                let delay = Duration::from_millis(DOWNLOAD_BASE_DELAY_MS << attempt);
                tokio::time::sleep(delay).await;
                continue;
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(
                "Photo download failed for {url} with status {status}: {}",
                truncate_for_log(&body, DOWNLOAD_ERROR_BODY_LIMIT)
            );
            if !should_retry_status(status) || attempt + 1 == DOWNLOAD_MAX_ATTEMPTS {
                return None;
            }
            let delay = Duration::from_millis(DOWNLOAD_BASE_DELAY_MS << attempt);
            tokio::time::sleep(delay).await;
            continue;
        }

        match response.bytes().await {
            Ok(bytes) => return Some(bytes.to_vec()),
            Err(err) => {
                error!(
                    "Failed to read photo bytes from {url}: {err} (attempt {}/{})",
                    attempt + 1,
                    DOWNLOAD_MAX_ATTEMPTS
                );
                if attempt + 1 == DOWNLOAD_MAX_ATTEMPTS {
                    return None;
                }
                let delay = Duration::from_millis(DOWNLOAD_BASE_DELAY_MS << attempt);
                tokio::time::sleep(delay).await;
            }
        }
    }

    None
}

/// Resolves a photo source — an https URL or an inline base64 data URL —
/// into raw bytes, rejecting payloads that are not actually an image.
pub async fn resolve_photo_source(source: &str) -> Option<Vec<u8>> {
    let bytes = if source.trim_start().starts_with("data:image") {
        decode_data_url(source)
    } else {
        download_media(source).await
    }?;

    match detect_mime_type(&bytes) {
        Some(mime) if mime.starts_with("image/") => Some(bytes),
        other => {
            warn!("Photo source resolved to non-image payload ({other:?})");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose, Engine as _};

    #[test]
    fn decodes_inline_base64_data_url() {
        let payload = b"fake image bytes";
        let encoded = general_purpose::STANDARD.encode(payload);
        let url = format!("data:image/png;base64,{encoded}");
        assert_eq!(decode_data_url(&url).as_deref(), Some(payload.as_slice()));
    }

    #[test]
    fn rejects_non_data_urls_and_bad_base64() {
        assert_eq!(decode_data_url("https://example.com/a.png"), None);
        assert_eq!(decode_data_url("data:image/png;base64,@@@"), None);
    }
}
