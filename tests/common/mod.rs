//! Hand-written doubles for the engine's two I/O seams.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::Url;
use serde_json::Value;

use yokai::Scraper;
use yokai::browser::{Session, SessionLauncher};
use yokai::error::{Error, Result};
use yokai::fetcher::PageFetcher;
use yokai::rules::ExtractionRules;

pub const BASE_URL: &str = "https://jkanime.net/";

/// Serves canned HTML by exact URL; anything else is a 404.
#[derive(Clone, Default)]
pub struct FixtureFetcher {
    pages: Arc<Mutex<HashMap<String, String>>>,
    fetched: Arc<Mutex<Vec<String>>>,
}

impl FixtureFetcher {
    pub fn with_page(self, url: &str, html: &str) -> Self {
        self.pages.lock().unwrap().insert(url.to_string(), html.to_string());
        self
    }

    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetched.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl PageFetcher for FixtureFetcher {
    async fn fetch(&self, url: &Url) -> Result<String> {
        self.fetched.lock().unwrap().push(url.to_string());
        self.pages
            .lock()
            .unwrap()
            .get(url.as_str())
            .cloned()
            .ok_or_else(|| Error::Fetch {
                url: url.to_string(),
                status: 404,
            })
    }
}

/// Answers each `evaluate` with the next queued JSON value for the page the
/// session last navigated to.
#[derive(Clone, Default)]
pub struct FixtureLauncher {
    scripts: Arc<Mutex<HashMap<String, VecDeque<Value>>>>,
    navigated: Arc<Mutex<Vec<String>>>,
    waits: Arc<Mutex<Vec<Duration>>>,
    launches: Arc<AtomicUsize>,
}

impl FixtureLauncher {
    pub fn with_result(self, url: &str, value: Value) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(value);
        self
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn navigated(&self) -> Vec<String> {
        self.navigated.lock().unwrap().clone()
    }

    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

struct FixtureSession {
    launcher: FixtureLauncher,
    current: Option<String>,
}

impl Session for FixtureSession {
    fn navigate(&mut self, url: &str) -> Result<()> {
        self.launcher.navigated.lock().unwrap().push(url.to_string());
        if !self.launcher.scripts.lock().unwrap().contains_key(url) {
            return Err(Error::Navigation(format!("{}: net::ERR_NAME_NOT_RESOLVED", url)));
        }
        self.current = Some(url.to_string());
        Ok(())
    }

    fn wait_fixed(&mut self, duration: Duration) -> Result<()> {
        self.launcher.waits.lock().unwrap().push(duration);
        Ok(())
    }

    fn evaluate(&mut self, _script: &str) -> Result<Value> {
        let url = self
            .current
            .clone()
            .ok_or_else(|| Error::Extraction("evaluate before navigate".into()))?;
        self.launcher
            .scripts
            .lock()
            .unwrap()
            .get_mut(&url)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| Error::Extraction(format!("no scripted result left for {}", url)))
    }
}

#[async_trait::async_trait]
impl SessionLauncher for FixtureLauncher {
    async fn with_session<T, F>(&self, _timeout: Duration, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn Session) -> Result<T> + Send + 'static,
    {
        self.launches.fetch_add(1, Ordering::SeqCst);
        let mut session = FixtureSession {
            launcher: self.clone(),
            current: None,
        };
        f(&mut session)
    }
}

pub fn engine(
    fetcher: &FixtureFetcher,
    launcher: &FixtureLauncher,
) -> Scraper<FixtureFetcher, FixtureLauncher> {
    Scraper::new(
        fetcher.clone(),
        launcher.clone(),
        ExtractionRules::default(),
        BASE_URL,
    )
    .unwrap()
    .with_settle(Duration::from_millis(250))
}

pub const LATEST_HTML: &str = r#"
    <html><body>
    <div id="animes">
        <div class="card">
            <a href="https://jkanime.net/a-1/12/">
                <img src="https://cdn.jkanime.net/a-1.jpg">
                <h5>Anime One</h5>
                <span class="badge badge-primary">Episodio 12</span>
            </a>
        </div>
        <div class="card">
            <a href="https://jkanime.net/b-2/5/">
                <img src="https://cdn.jkanime.net/b-2.jpg">
                <h5>Anime Two</h5>
                <span class="badge badge-primary">Episodio 5</span>
            </a>
        </div>
    </div>
    </body></html>
"#;

pub const SEARCH_HTML: &str = r#"
    <div class="anime__item">
        <a href="https://jkanime.net/naruto-shippuden/">
            <div class="anime__item__pic" data-setbg="https://cdn.jkanime.net/shippuden.jpg"></div>
        </a>
        <div class="anime__item__text">
            <ul><li>Concluido</li><li class="anime">Serie</li></ul>
            <h5><a href="https://jkanime.net/naruto-shippuden/">Naruto Shippuden</a></h5>
        </div>
    </div>
"#;
