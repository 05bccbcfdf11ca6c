use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// One row of a "latest episodes" listing or an episode index page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CatalogEntry {
    pub slug: String,
    #[serde(rename = "img", default)]
    pub image_url: String,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "episode", default)]
    pub episode_label: String,
}

/// A labelled value on an anime page. Labels listing a single value stay
/// scalar; consumers rely on that distinction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Attribute {
    Scalar(String),
    List(Vec<String>),
}

impl Attribute {
    /// Collapses parsed values; `None` when there is nothing to keep.
    pub fn from_values(mut values: Vec<String>) -> Option<Self> {
        match values.len() {
            0 => None,
            1 => values.pop().map(Attribute::Scalar),
            _ => Some(Attribute::List(values)),
        }
    }

    pub fn values(&self) -> Vec<&str> {
        match self {
            Attribute::Scalar(v) => vec![v.as_str()],
            Attribute::List(vs) => vs.iter().map(String::as_str).collect(),
        }
    }

    pub fn joined(&self, sep: &str) -> String {
        self.values().join(sep)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AnimeDetail {
    pub title: String,
    pub slug: String,
    #[serde(rename = "img")]
    pub image_url: String,
    pub synopsis: String,
    #[serde(rename = "additional_info")]
    pub attributes: BTreeMap<String, Attribute>,
}

/// One page of an anime's episode index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EpisodePage {
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_pages: u32,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_episodes: u32,
    #[serde(default, deserialize_with = "lenient_count")]
    pub last_episode: u32,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub episodes: Vec<CatalogEntry>,
}

/// One playable source candidate for an episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSource {
    #[serde(rename = "server")]
    pub host_name: String,
    /// Opaque handle, see [`crate::token`].
    #[serde(rename = "remote")]
    pub token: String,
}

// Pages that hide a counter yield `null` (a NaN through JSON.stringify).
fn lenient_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| v.as_u64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok())))
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0))
}
