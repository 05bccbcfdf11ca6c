use std::ffi::OsString;
use std::time::Duration;

use crate::config::{DEFAULT_USER_AGENT, ScraperConfig};

/// Launch settings for the per-operation headless Chrome.
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,

    pub window_size: (u32, u32),

    pub user_agent: String,

    pub disable_gpu: bool,

    /// Chrome's own sandbox; off so it runs inside containers
    pub sandbox: bool,

    /// How long an idle DevTools connection is kept before Chrome is dropped
    pub idle_timeout: Duration,

    /// Additional Chrome flags
    pub chrome_flags: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_size: (1920, 1080),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            disable_gpu: true,
            sandbox: false,
            idle_timeout: Duration::from_secs(60),
            chrome_flags: vec![],
        }
    }
}

impl BrowserConfig {
    pub fn from_scraper(config: &ScraperConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            idle_timeout: config.session_timeout().max(Duration::from_secs(30)),
            ..Self::default()
        }
    }

    /// Non-headless, for watching what a rule actually sees
    pub fn debug_mode() -> Self {
        Self {
            headless: false,
            ..Self::default()
        }
    }

    /// Chrome command-line arguments on top of headless_chrome's defaults.
    pub fn launch_args(&self) -> Vec<OsString> {
        let mut args = vec![
            OsString::from(format!("--user-agent={}", self.user_agent)),
            OsString::from("--disable-dev-shm-usage"),
        ];
        if self.disable_gpu {
            args.push(OsString::from("--disable-gpu"));
        }
        if !self.sandbox {
            args.push(OsString::from("--no-sandbox"));
        }
        args.extend(self.chrome_flags.iter().map(OsString::from));
        args
    }
}
