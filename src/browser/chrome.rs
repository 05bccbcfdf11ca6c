use std::ffi::OsStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use headless_chrome::{Browser, LaunchOptions, Tab};
use tracing::debug;

use super::config::BrowserConfig;
use super::{Session, SessionLauncher};
use crate::error::{Error, Result};

/// Extra time the blocking task gets to notice its deadline and shut Chrome
/// down before the caller stops waiting for it.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Launches one headless Chrome per operation.
#[derive(Debug, Clone, Default)]
pub struct ChromeLauncher {
    config: BrowserConfig,
}

impl ChromeLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    fn launch(config: &BrowserConfig) -> Result<Browser> {
        let args = config.launch_args();
        let options = LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(config.sandbox)
            .window_size(Some(config.window_size))
            .idle_browser_timeout(config.idle_timeout)
            .args(args.iter().map(OsStr::new).collect())
            .build()
            .map_err(|e| Error::Navigation(format!("invalid browser options: {}", e)))?;

        Browser::new(options).map_err(|e| Error::Navigation(format!("failed to start browser: {}", e)))
    }
}

#[async_trait::async_trait]
impl SessionLauncher for ChromeLauncher {
    async fn with_session<T, F>(&self, timeout: Duration, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn Session) -> Result<T> + Send + 'static,
    {
        let config = self.config.clone();
        let deadline = Instant::now() + timeout;

        let task = tokio::task::spawn_blocking(move || {
            let browser = Self::launch(&config)?;
            let tab = browser
                .new_tab()
                .map_err(|e| Error::Navigation(format!("failed to open tab: {}", e)))?;
            tab.set_user_agent(&config.user_agent, None, None)
                .map_err(|e| Error::Navigation(format!("failed to set user agent: {}", e)))?;

            let mut session = ChromeSession { tab, deadline, timeout };
            let result = f(&mut session);

            // Dropping the browser kills the Chrome process.
            drop(session);
            drop(browser);
            debug!("Browser session closed");
            result
        });

        match tokio::time::timeout(timeout + SHUTDOWN_GRACE, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(Error::Navigation(format!("browser task failed: {}", e))),
            Err(_) => Err(Error::Timeout(timeout)),
        }
    }
}

struct ChromeSession {
    tab: Arc<Tab>,
    deadline: Instant,
    timeout: Duration,
}

impl ChromeSession {
    fn remaining(&self) -> Result<Duration> {
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(Error::Timeout(self.timeout));
        }
        Ok(remaining)
    }

    fn expired(&self) -> bool {
        Instant::now() >= self.deadline
    }
}

impl Session for ChromeSession {
    fn navigate(&mut self, url: &str) -> Result<()> {
        let remaining = self.remaining()?;
        self.tab.set_default_timeout(remaining);

        debug!(url = %url, "Browser navigating");

        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map(|_| ())
            .map_err(|e| {
                if self.expired() {
                    Error::Timeout(self.timeout)
                } else {
                    Error::Navigation(format!("{}: {}", url, e))
                }
            })
    }

    fn wait_fixed(&mut self, duration: Duration) -> Result<()> {
        let remaining = self.remaining()?;
        std::thread::sleep(duration.min(remaining));
        if duration >= remaining {
            return Err(Error::Timeout(self.timeout));
        }
        Ok(())
    }

    fn evaluate(&mut self, script: &str) -> Result<serde_json::Value> {
        let remaining = self.remaining()?;
        self.tab.set_default_timeout(remaining);

        // Objects only come back by value as a string.
        let expression = format!("JSON.stringify({})", script.trim().trim_end_matches(';'));

        let result = self.tab.evaluate(&expression, false).map_err(|e| {
            if self.expired() {
                Error::Timeout(self.timeout)
            } else {
                Error::Extraction(format!("script failed: {}", e))
            }
        })?;

        let json = result
            .value
            .as_ref()
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::Extraction("script returned no value".to_string()))?;

        serde_json::from_str(json)
            .map_err(|e| Error::Extraction(format!("script returned invalid JSON: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launch_options_build() {
        let config = BrowserConfig::default();
        let args = config.launch_args();
        let options = LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(config.sandbox)
            .args(args.iter().map(OsStr::new).collect())
            .build();
        assert!(options.is_ok());
    }

    #[tokio::test]
    #[ignore] // Requires Chrome to be installed
    async fn test_evaluate_round_trip() {
        let launcher = ChromeLauncher::default();
        let value = launcher
            .with_session(Duration::from_secs(30), |session| {
                session.navigate("https://example.com")?;
                session.evaluate("({ title: document.title, n: 1 + 1 })")
            })
            .await
            .unwrap();

        assert_eq!(value["n"], 2);
        assert!(value["title"].as_str().unwrap().contains("Example"));
    }

    #[tokio::test]
    #[ignore] // Requires Chrome to be installed
    async fn test_session_deadline() {
        let launcher = ChromeLauncher::default();
        let result = launcher
            .with_session(Duration::from_secs(20), |session| {
                session.navigate("https://example.com")?;
                session.wait_fixed(Duration::from_secs(60))
            })
            .await;

        assert!(matches!(result, Err(Error::Timeout(_))));
    }
}
