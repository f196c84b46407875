use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Hard ceiling for the description field; longer text is truncated with an
/// ellipsis marker before it is ever stored.
pub const DESCRIPTION_MAX_LEN: usize = 500;

/// Normalized product attributes extracted from text and/or a photo. All
/// fields are optional; a record is built up incrementally by the extractors
/// and the reconciler before it is handed to the card renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub name: Option<String>,
    pub price: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub color: Option<String>,
    pub size: Option<String>,
    #[serde(default)]
    pub features: HashMap<String, String>,
}

impl ProductRecord {
    /// A record can be turned into a card only when it has a name and at
    /// least a price or a description.
    pub fn is_usable(&self) -> bool {
        self.name.is_some() && (self.price.is_some() || self.description.is_some())
    }

    /// Human-readable summary shown to the user for confirmation.
    pub fn summary(&self) -> String {
        let mut lines = Vec::new();
        lines.push(format!(
            "Название: {}",
            self.name.as_deref().unwrap_or("—")
        ));
        lines.push(format!(
            "Цена: {}",
            self.price.as_deref().unwrap_or("не указана")
        ));
        if let Some(category) = &self.category {
            lines.push(format!("Категория: {category}"));
        }
        if let Some(color) = &self.color {
            lines.push(format!("Цвет: {color}"));
        }
        if let Some(size) = &self.size {
            lines.push(format!("Размер: {size}"));
        }
        if let Some(description) = &self.description {
            lines.push(format!("Описание: {description}"));
        }
        if !self.features.is_empty() {
            let mut keys: Vec<_> = self.features.iter().collect();
            keys.sort_by(|a, b| a.0.cmp(b.0));
            for (key, value) in keys {
                lines.push(format!("{key}: {value}"));
            }
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_is_usable_with_name_and_price_or_description() {
        let mut record = ProductRecord::default();
        assert!(!record.is_usable());

        record.name = Some("Кеды".to_string());
        assert!(!record.is_usable());

        record.price = Some("3400₽".to_string());
        assert!(record.is_usable());

        record.price = None;
        record.description = Some("синие".to_string());
        assert!(record.is_usable());
    }
}
