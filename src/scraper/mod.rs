//! The extraction engine: one method per site operation, sequencing static
//! fetches and browser sessions and normalizing what they return.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::browser::{BrowserConfig, ChromeLauncher, SessionLauncher};
use crate::config::ScraperConfig;
use crate::error::{Error, Result, require};
use crate::fetcher::{PageFetcher, StaticFetcher};
use crate::models::{AnimeDetail, CatalogEntry, EpisodePage, StreamSource};
use crate::rules::ExtractionRules;
use crate::token;

mod attributes;
pub mod parse;

pub use attributes::{AttributeRow, clean_values, collect_attributes, normalize_label};

#[derive(Debug, Deserialize)]
struct DetailSummary {
    #[serde(default)]
    title: String,
    #[serde(default)]
    synopsis: String,
    #[serde(default)]
    image: String,
}

#[derive(Debug, Deserialize)]
struct RawServer {
    server: String,
    #[serde(default)]
    src: String,
}

pub struct Scraper<F = StaticFetcher, L = ChromeLauncher> {
    fetcher: F,
    launcher: L,
    rules: Arc<ExtractionRules>,
    base_url: Url,
    session_timeout: Duration,
    settle: Duration,
}

impl Scraper {
    /// The production engine: reqwest for static pages, headless Chrome for
    /// rendered ones.
    pub fn from_config(config: &ScraperConfig) -> Result<Self> {
        let rules = ExtractionRules::load_or_default(config.rules_path.as_deref())?;
        let fetcher = StaticFetcher::new(config)?;
        let launcher = ChromeLauncher::new(BrowserConfig::from_scraper(config));

        Ok(Scraper::new(fetcher, launcher, rules, &config.base_url)?
            .with_session_timeout(config.session_timeout())
            .with_settle(config.settle()))
    }
}

impl<F: PageFetcher, L: SessionLauncher> Scraper<F, L> {
    pub fn new(fetcher: F, launcher: L, rules: ExtractionRules, base_url: &str) -> Result<Self> {
        let mut base = base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| Error::Validation(format!("invalid base URL {:?}: {}", base_url, e)))?;

        let defaults = ScraperConfig::default();
        Ok(Self {
            fetcher,
            launcher,
            rules: Arc::new(rules),
            base_url,
            session_timeout: defaults.session_timeout(),
            settle: defaults.settle(),
        })
    }

    /// Deadline for each browser session.
    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    /// Fixed wait between navigation and evaluation on rendered pages.
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn rules(&self) -> &ExtractionRules {
        &self.rules
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn site_url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Validation(format!("invalid path {:?}: {}", path, e)))
    }

    /// Latest aired episodes from the home page.
    pub async fn list_latest(&self) -> Result<Vec<CatalogEntry>> {
        let html = self.fetcher.fetch(&self.base_url).await?;
        parse::latest_entries(&html, &self.base_url, &self.rules.latest)
    }

    pub async fn get_detail(&self, slug: &str) -> Result<AnimeDetail> {
        require("slug", slug)?;
        let slug = slug.trim();
        let url = self.site_url(&segment(slug))?;
        let scripts = self.rules.detail.clone();

        debug!(slug = %slug, "Fetching anime detail");

        let (summary, rows) = self
            .launcher
            .with_session(self.session_timeout, move |session| {
                session.navigate(url.as_str())?;
                let summary = session.evaluate(&scripts.summary)?;
                let rows = session.evaluate(&scripts.attributes)?;
                Ok((summary, rows))
            })
            .await?;

        let summary: DetailSummary = from_json(summary, "anime summary")?;
        let rows: Vec<AttributeRow> = from_json(rows, "anime attributes")?;

        if summary.title.trim().is_empty() {
            return Err(Error::Extraction(format!("no anime title found for {}", slug)));
        }

        Ok(AnimeDetail {
            title: summary.title.trim().to_string(),
            slug: slug.to_string(),
            image_url: summary.image,
            synopsis: summary.synopsis.trim().to_string(),
            attributes: collect_attributes(rows),
        })
    }

    /// One page of the episode index. Page 0 means the first page.
    pub async fn get_episode_page(&self, slug: &str, page: u32) -> Result<EpisodePage> {
        require("slug", slug)?;
        let page = page.max(1);
        let path = if page == 1 {
            format!("{}/", segment(slug.trim()))
        } else {
            format!("{}/#pag{}", segment(slug.trim()), page)
        };
        let url = self.site_url(&path)?;
        let script = self.rules.episodes.script.clone();
        let settle = self.settle;

        debug!(slug = %slug, page, "Fetching episode page");

        let value = self
            .launcher
            .with_session(self.session_timeout, move |session| {
                session.navigate(url.as_str())?;
                session.wait_fixed(settle)?;
                session.evaluate(&script)
            })
            .await?;

        let mut episodes: EpisodePage = from_json(value, "episode page")?;
        episodes.page = page;
        Ok(episodes)
    }

    /// Playable sources for an episode, minus the excluded hosts.
    pub async fn get_servers(&self, slug: &str, episode: &str) -> Result<Vec<StreamSource>> {
        require("slug", slug)?;
        require("episode", episode)?;
        let url = self.site_url(&format!("{}/{}", segment(slug.trim()), segment(episode.trim())))?;
        let script = self.rules.servers.script.clone();

        debug!(slug = %slug, episode = %episode, "Fetching servers");

        let value = self
            .launcher
            .with_session(self.session_timeout, move |session| {
                session.navigate(url.as_str())?;
                session.evaluate(&script)
            })
            .await?;

        let servers: Vec<RawServer> = from_json(value, "server list")?;

        Ok(servers
            .into_iter()
            .filter(|s| !s.src.trim().is_empty())
            .filter(|s| !self.rules.is_excluded(&s.server))
            .map(|s| StreamSource {
                host_name: s.server.trim().to_string(),
                token: token::encode(s.src.trim()),
            })
            .collect())
    }

    /// Media URL behind a source, read from the host's player object.
    pub async fn resolve_stream(&self, host_name: &str, stream_token: &str) -> Result<Url> {
        require("server", host_name)?;
        require("token", stream_token)?;

        let host = host_name.trim().to_string();
        let expression = self
            .rules
            .host_expression(&host)
            .ok_or_else(|| Error::UnsupportedHost(host.clone()))?
            .to_string();
        let embed_url = token::decode(stream_token)?;
        let target = embed_url.clone();
        let settle = self.settle;

        debug!(host = %host, "Resolving stream");

        let value = self
            .launcher
            .with_session(self.session_timeout, move |session| {
                session.navigate(target.as_str())?;
                session.wait_fixed(settle)?;
                session.evaluate(&expression)
            })
            .await?;

        let raw = value
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::Extraction(format!("{} player exposed no media URL", host)))?;

        embed_url
            .join(raw)
            .map_err(|e| Error::Extraction(format!("{} player exposed an invalid URL {:?}: {}", host, raw, e)))
    }

    /// Search results; page 0 and 1 both mean the first page.
    pub async fn search(&self, query: &str, page: u32) -> Result<Vec<AnimeDetail>> {
        require("query", query)?;
        let mut path = format!("buscar/{}", segment(query.trim()));
        if page > 1 {
            path.push_str(&format!("/{}", page));
        }
        let url = self.site_url(&path)?;

        let html = self.fetcher.fetch(&url).await?;
        parse::search_results(&html, &self.base_url, &self.rules.search)
    }
}

fn segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

fn from_json<T: DeserializeOwned>(value: serde_json::Value, what: &str) -> Result<T> {
    serde_json::from_value(value).map_err(|e| Error::Extraction(format!("unexpected {} shape: {}", what, e)))
}
