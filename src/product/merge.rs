use crate::product::record::{ProductRecord, DESCRIPTION_MAX_LEN};
use crate::utils::text::truncate_with_ellipsis;

/// Which side of a merge wins when both carry a value for the same field.
/// Caption text and user corrections are merged at `Secondary` priority so
/// an explicit statement from the user always overrides what the vision
/// model guessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePriority {
    Primary,
    Secondary,
}

fn pick(
    primary: &Option<String>,
    secondary: &Option<String>,
    priority: MergePriority,
) -> Option<String> {
    match priority {
        MergePriority::Primary => primary.clone().or_else(|| secondary.clone()),
        MergePriority::Secondary => secondary.clone().or_else(|| primary.clone()),
    }
}

/// Field-level merge of two partial records. The priority side's non-null
/// value wins; the other side fills the gaps, so a populated field is never
/// downgraded to null. Descriptions concatenate when both sides have one;
/// feature maps union with the priority side's keys overwriting.
pub fn merge(
    primary: &ProductRecord,
    secondary: &ProductRecord,
    priority: MergePriority,
) -> ProductRecord {
    let description = match (&primary.description, &secondary.description) {
        (Some(first), Some(second)) => Some(truncate_with_ellipsis(
            &format!("{first}. {second}"),
            DESCRIPTION_MAX_LEN,
        )),
        (Some(first), None) => Some(first.clone()),
        (None, Some(second)) => Some(second.clone()),
        (None, None) => None,
    };

    let mut features = match priority {
        MergePriority::Primary => secondary.features.clone(),
        MergePriority::Secondary => primary.features.clone(),
    };
    let winning = match priority {
        MergePriority::Primary => &primary.features,
        MergePriority::Secondary => &secondary.features,
    };
    for (key, value) in winning {
        features.insert(key.clone(), value.clone());
    }

    ProductRecord {
        name: pick(&primary.name, &secondary.name, priority),
        price: pick(&primary.price, &secondary.price, priority),
        description,
        category: pick(&primary.category, &secondary.category, priority),
        color: pick(&primary.color, &secondary.color, priority),
        size: pick(&primary.size, &secondary.size, priority),
        features,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn record(name: Option<&str>, price: Option<&str>, description: Option<&str>) -> ProductRecord {
        ProductRecord {
            name: name.map(str::to_string),
            price: price.map(str::to_string),
            description: description.map(str::to_string),
            ..ProductRecord::default()
        }
    }

    #[test]
    fn secondary_priority_overrides_populated_primary_fields() {
        let vision = record(Some("Кроссовки"), Some("5000₽"), None);
        let caption = record(None, Some("3400₽"), None);
        let merged = merge(&vision, &caption, MergePriority::Secondary);
        assert_eq!(merged.price.as_deref(), Some("3400₽"));
        assert_eq!(merged.name.as_deref(), Some("Кроссовки"));
    }

    #[test]
    fn merge_never_downgrades_a_populated_field_to_null() {
        let samples = [
            record(Some("A"), None, Some("left")),
            record(None, Some("10₽"), None),
            record(Some("B"), Some("20₽"), Some("right")),
            ProductRecord::default(),
        ];
        for a in &samples {
            for b in &samples {
                for priority in [MergePriority::Primary, MergePriority::Secondary] {
                    let merged = merge(a, b, priority);
                    assert_eq!(merged.name.is_some(), a.name.is_some() || b.name.is_some());
                    assert_eq!(
                        merged.price.is_some(),
                        a.price.is_some() || b.price.is_some()
                    );
                    assert_eq!(
                        merged.description.is_some(),
                        a.description.is_some() || b.description.is_some()
                    );
                }
            }
        }
    }

    #[test]
    fn descriptions_concatenate_instead_of_discarding() {
        let a = record(None, None, Some("Лёгкие кеды"));
        let b = record(None, None, Some("подходят для лета"));
        let merged = merge(&a, &b, MergePriority::Secondary);
        assert_eq!(
            merged.description.as_deref(),
            Some("Лёгкие кеды. подходят для лета")
        );
    }

    #[test]
    fn concatenated_description_respects_length_cap() {
        let long_a = "x".repeat(400);
        let long_b = "y".repeat(400);
        let a = record(None, None, Some(long_a.as_str()));
        let b = record(None, None, Some(long_b.as_str()));
        let merged = merge(&a, &b, MergePriority::Primary);
        assert!(merged.description.unwrap().chars().count() <= DESCRIPTION_MAX_LEN);
    }

    #[test]
    fn non_description_fields_are_order_insensitive_under_fixed_priority() {
        let a = record(Some("A"), Some("10₽"), None);
        let b = record(Some("B"), None, None);
        let ab = merge(&a, &b, MergePriority::Primary);
        let ba = merge(&b, &a, MergePriority::Secondary);
        assert_eq!(ab.name, ba.name);
        assert_eq!(ab.price, ba.price);
        assert_eq!(ab.category, ba.category);
    }

    #[test]
    fn feature_maps_union_with_priority_keys_winning() {
        let mut a = ProductRecord::default();
        a.features = HashMap::from([
            ("материал".to_string(), "кожа".to_string()),
            ("бренд".to_string(), "Acme".to_string()),
        ]);
        let mut b = ProductRecord::default();
        b.features = HashMap::from([("материал".to_string(), "текстиль".to_string())]);

        let merged = merge(&a, &b, MergePriority::Secondary);
        assert_eq!(merged.features["материал"], "текстиль");
        assert_eq!(merged.features["бренд"], "Acme");
    }
}
