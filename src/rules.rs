//! Site-coupled extraction rules: CSS selectors for static pages, in-page
//! scripts for rendered pages and the per-host media URL expressions.
//!
//! The builtin table targets jkanime. When the site drifts, ship a TOML file
//! overriding only the sections that changed and point `scraper.rules_path`
//! at it; every missing section falls back to the builtin one.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const RULES_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionRules {
    pub version: u32,
    pub latest: ListingRules,
    pub search: SearchRules,
    pub detail: DetailRules,
    pub episodes: EpisodeRules,
    pub servers: ServerRules,
    /// Host name -> expression evaluated on the host's embed page.
    pub hosts: BTreeMap<String, String>,
}

/// Cards on the home page "latest episodes" grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingRules {
    pub card: String,
    pub image: String,
    pub image_attr: String,
    pub title: String,
    pub badge: String,
}

/// Result cards on `/buscar/{query}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchRules {
    pub card: String,
    pub title: String,
    pub image: String,
    pub image_attr: String,
    pub link: String,
    pub status: String,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetailRules {
    /// Must yield `{title, synopsis, image}`.
    pub summary: String,
    /// Must yield `[{label, values: [..]}]`, one row per attribute line.
    pub attributes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpisodeRules {
    /// Must yield `{total_pages, total_episodes, last_episode, episodes}`.
    pub script: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerRules {
    /// Must yield `[{server, src}]` with absolute `src` URLs.
    pub script: String,
    /// Low quality or unsupported hosts dropped from server lists.
    pub excluded: Vec<String>,
}

const DETAIL_SUMMARY_JS: &str = r#"
(() => ({
    title: document.querySelector('.anime_info h3')?.textContent.trim() ?? '',
    synopsis: document.querySelector('.anime_info .scroll')?.textContent.trim() ?? '',
    image: document.querySelector('.anime_pic img')?.getAttribute('src') ?? ''
}))()
"#;

const DETAIL_ATTRIBUTES_JS: &str = r#"
(() => Array.from(document.querySelectorAll('.card-bod ul li'))
    .map(li => {
        const label = li.querySelector(':scope > span');
        if (!label) return null;
        const nodes = Array.from(li.childNodes);
        return {
            label: label.textContent,
            values: nodes.slice(nodes.indexOf(label) + 1).map(node => node.textContent)
        };
    })
    .filter(Boolean))()
"#;

const EPISODES_JS: &str = r#"
(() => {
    const last = document.querySelector('#uep')?.href.split('/')[4];
    const title = document.querySelector('.anime_info h3')?.textContent.trim() ?? '';
    return {
        total_pages: document.querySelectorAll('.anime__pagination .option').length,
        total_episodes: parseInt(last),
        last_episode: parseInt(last),
        episodes: Array.from(document.querySelectorAll('#episodes-content .anime__item')).map(item => {
            const parts = new URL(item.querySelector('a').href).pathname.split('/').filter(Boolean);
            return {
                title,
                img: item.querySelector('.anime__item__pic')?.dataset.setbg ?? '',
                slug: parts[0] ?? '',
                episode: parts[1] ?? ''
            };
        })
    };
})()
"#;

const SERVERS_JS: &str = r#"
(() => {
    const frames = (typeof video !== 'undefined' && Array.isArray(video) ? video : [])
        .map(html => (/src="([^"]+)"/.exec(html) || [])[1]);
    const iframes = Array.from(document.querySelectorAll('iframe'));
    return [0, 1]
        .map(i => {
            const button = document.querySelector('#btn-show-' + i);
            const src = frames[i] || iframes[i]?.getAttribute('src');
            if (!button || !src) return null;
            return { server: button.textContent.trim(), src: new URL(src, location.href).href };
        })
        .filter(Boolean);
})()
"#;

impl Default for ExtractionRules {
    fn default() -> Self {
        let hosts = [
            ("Desu", "parts.segments.swarmId"),
            ("Magi", "player.options_.sources[0].src"),
            ("Streamwish", "player.getConfig().playlist[0].file"),
            ("Vidhide", "player.getConfig().playlist[0].file"),
            ("Filemoon", "jwplayer().getConfig().playlist[0].file"),
            ("VOE", "jwplayer().getConfig().playlist[0].file"),
            ("Streamtape", "player.source"),
        ]
        .into_iter()
        .map(|(host, expr)| (host.to_string(), expr.to_string()))
        .collect();

        Self {
            version: RULES_VERSION,
            latest: ListingRules::default(),
            search: SearchRules::default(),
            detail: DetailRules::default(),
            episodes: EpisodeRules::default(),
            servers: ServerRules::default(),
            hosts,
        }
    }
}

impl Default for ListingRules {
    fn default() -> Self {
        Self {
            card: "#animes .card a".to_string(),
            image: "img".to_string(),
            image_attr: "src".to_string(),
            title: "h5".to_string(),
            badge: ".badge-primary".to_string(),
        }
    }
}

impl Default for SearchRules {
    fn default() -> Self {
        Self {
            card: ".anime__item".to_string(),
            title: "h5".to_string(),
            image: ".anime__item__pic".to_string(),
            image_attr: "data-setbg".to_string(),
            link: "a".to_string(),
            status: "ul li".to_string(),
            kind: "li.anime".to_string(),
        }
    }
}

impl Default for DetailRules {
    fn default() -> Self {
        Self {
            summary: DETAIL_SUMMARY_JS.trim().to_string(),
            attributes: DETAIL_ATTRIBUTES_JS.trim().to_string(),
        }
    }
}

impl Default for EpisodeRules {
    fn default() -> Self {
        Self {
            script: EPISODES_JS.trim().to_string(),
        }
    }
}

impl Default for ServerRules {
    fn default() -> Self {
        Self {
            script: SERVERS_JS.trim().to_string(),
            excluded: ["Mega", "Mediafire", "Mixdrop", "Mp4upload", "SaveFiles"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl ExtractionRules {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Builtin rules, or the override file when one is configured.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Media URL expression for a host, matched case-insensitively.
    pub fn host_expression(&self, host: &str) -> Option<&str> {
        let host = host.trim();
        self.hosts
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(host))
            .map(|(_, expr)| expr.as_str())
    }

    pub fn is_excluded(&self, host: &str) -> bool {
        let host = host.trim();
        self.servers
            .excluded
            .iter()
            .any(|name| name.eq_ignore_ascii_case(host))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_hosts() {
        let rules = ExtractionRules::default();
        assert_eq!(rules.host_expression("Magi"), Some("player.options_.sources[0].src"));
        assert_eq!(rules.host_expression("voe"), Some("jwplayer().getConfig().playlist[0].file"));
        assert_eq!(rules.host_expression(" Streamtape "), Some("player.source"));
        assert_eq!(rules.host_expression("Unknown"), None);
        assert_eq!(rules.host_expression("Mega"), None);
    }

    #[test]
    fn test_exclusions() {
        let rules = ExtractionRules::default();
        assert!(rules.is_excluded("Mega"));
        assert!(rules.is_excluded("mp4upload"));
        assert!(!rules.is_excluded("Desu"));
    }

    #[test]
    fn test_partial_override_keeps_builtin_sections() {
        let rules: ExtractionRules = toml::from_str(
            r#"
            version = 2

            [hosts]
            Okru = "document.querySelector('video').src"
            "#,
        )
        .unwrap();

        assert_eq!(rules.version, 2);
        assert_eq!(rules.hosts.len(), 1);
        assert!(rules.host_expression("Desu").is_none());
        assert!(rules.host_expression("okru").is_some());
        assert_eq!(rules.latest, ListingRules::default());
        assert_eq!(rules.servers, ServerRules::default());
    }

    #[test]
    fn test_partial_section_override() {
        let rules: ExtractionRules = toml::from_str(
            r##"
            [latest]
            card = "#latest .card a"
            "##,
        )
        .unwrap();

        assert_eq!(rules.latest.card, "#latest .card a");
        assert_eq!(rules.latest.badge, ".badge-primary");
        assert_eq!(rules.hosts, ExtractionRules::default().hosts);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.toml");
        std::fs::write(&path, "[servers]\nexcluded = [\"Desu\"]\n").unwrap();

        let rules = ExtractionRules::load_or_default(Some(&path)).unwrap();
        assert!(rules.is_excluded("desu"));
        assert!(!rules.is_excluded("Mega"));

        let builtin = ExtractionRules::load_or_default(None).unwrap();
        assert_eq!(builtin, ExtractionRules::default());
    }

    #[test]
    fn test_builtin_round_trips_through_toml() {
        let rules = ExtractionRules::default();
        let text = toml::to_string_pretty(&rules).unwrap();
        let back: ExtractionRules = toml::from_str(&text).unwrap();
        assert_eq!(back, rules);
    }
}
