use std::path::PathBuf;

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, info};

use crate::card::render::{render_card, RenderError};
use crate::card::template::TemplateStyle;
use crate::llm::media::resolve_photo_source;
use crate::product::ProductRecord;

#[derive(Debug, Error)]
pub enum CardError {
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error("failed to write card file: {0}")]
    Io(#[from] std::io::Error),
    #[error("card rendering task was aborted")]
    TaskAborted,
}

/// Assembles a finished card file from a product record: fetches the
/// photo if one is referenced, renders the bitmap off the async runtime
/// and persists it under a content-addressed name.
pub struct CardBuilder {
    style: TemplateStyle,
    cards_dir: PathBuf,
}

impl CardBuilder {
    pub fn new(style: TemplateStyle, cards_dir: impl Into<PathBuf>) -> CardBuilder {
        CardBuilder {
            style,
            cards_dir: cards_dir.into(),
        }
    }

    /// Renders the record into a PNG on disk and returns its path.
    /// `photo_source` is either an `https` URL or a base64 `data:` URL;
    /// a source that fails to fetch or decode yields a card without a
    /// photo rather than an error.
    pub async fn build_card(
        &self,
        record: &ProductRecord,
        photo_source: Option<&str>,
    ) -> Result<PathBuf, CardError> {
        let photo = match photo_source {
            Some(source) => resolve_photo_source(source).await,
            None => None,
        };

        let descriptor = self.style.descriptor();
        let record_for_task = record.clone();
        let png = tokio::task::spawn_blocking(move || {
            render_card(descriptor, &record_for_task, photo.as_deref())
        })
        .await
        .map_err(|_| CardError::TaskAborted)??;

        let digest = Sha256::digest(&png);
        let mut hash = String::with_capacity(12);
        for byte in &digest[..6] {
            hash.push_str(&format!("{byte:02x}"));
        }

        let filename = format!("card_{}_{hash}.png", self.style.name());
        let path = self.cards_dir.join(filename);

        tokio::fs::create_dir_all(&self.cards_dir).await?;
        tokio::fs::write(&path, &png).await?;
        debug!("Wrote {} bytes to {}", png.len(), path.display());
        info!("Card generated: style={} path={}", self.style.name(), path.display());

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ProductRecord {
        ProductRecord {
            name: Some("Футболка".to_string()),
            price: Some("990₽".to_string()),
            description: Some("Хлопковая футболка".to_string()),
            ..ProductRecord::default()
        }
    }

    #[tokio::test]
    async fn builds_card_file_with_content_hash_name() {
        let dir = std::env::temp_dir().join(format!("cards_test_{}", std::process::id()));
        let builder = CardBuilder::new(TemplateStyle::Minimal, &dir);

        let path = builder.build_card(&record(), None).await.unwrap();
        assert!(path.exists());

        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("card_minimal_"));
        assert!(name.ends_with(".png"));

        // Identical input produces the identical filename.
        let again = builder.build_card(&record(), None).await.unwrap();
        assert_eq!(path, again);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
