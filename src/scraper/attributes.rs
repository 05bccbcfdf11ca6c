use std::collections::BTreeMap;

use serde::Deserialize;

use crate::models::Attribute;

/// Bare separators sites put between linked values.
const SEPARATORS: &[&str] = &[",", ";", "|", "/"];

/// One `label: value, value` line as read from the anime page.
#[derive(Debug, Clone, Deserialize)]
pub struct AttributeRow {
    pub label: String,
    #[serde(default)]
    pub values: Vec<Option<String>>,
}

/// `" Género: "` -> `"género"`
pub fn normalize_label(raw: &str) -> String {
    raw.trim().trim_end_matches(':').trim().to_lowercase()
}

pub fn clean_values(raw: impl IntoIterator<Item = Option<String>>) -> Vec<String> {
    raw.into_iter()
        .flatten()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !SEPARATORS.contains(&v.as_str()))
        .collect()
}

pub fn collect_attributes(rows: Vec<AttributeRow>) -> BTreeMap<String, Attribute> {
    let mut attributes = BTreeMap::new();
    for row in rows {
        let key = normalize_label(&row.label);
        if key.is_empty() {
            continue;
        }
        if let Some(attribute) = Attribute::from_values(clean_values(row.values)) {
            attributes.insert(key, attribute);
        }
    }
    attributes
}
