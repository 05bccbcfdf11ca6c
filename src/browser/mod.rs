//! Browser automation for pages that only exist after JavaScript runs.
//!
//! Each operation gets its own browser: [`SessionLauncher::with_session`]
//! starts one, hands a [`Session`] to the closure and tears the browser down
//! on every exit path. Sessions are never shared or pooled, so every call pays
//! the Chrome start-up cost in exchange for isolation.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use yokai::browser::{BrowserConfig, ChromeLauncher, SessionLauncher};
//!
//! # async fn run() -> yokai::error::Result<()> {
//! let launcher = ChromeLauncher::new(BrowserConfig::default());
//! let title = launcher
//!     .with_session(Duration::from_secs(30), |session| {
//!         session.navigate("https://example.com")?;
//!         session.evaluate("document.title")
//!     })
//!     .await?;
//! println!("{}", title);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use crate::error::Result;

pub mod chrome;
pub mod config;

pub use chrome::ChromeLauncher;
pub use config::BrowserConfig;

/// One live browser context. Steps run strictly in order.
pub trait Session {
    fn navigate(&mut self, url: &str) -> Result<()>;

    /// Gives client-side rendering time to settle.
    fn wait_fixed(&mut self, duration: Duration) -> Result<()>;

    /// Evaluates a JavaScript expression and returns its JSON value.
    fn evaluate(&mut self, script: &str) -> Result<serde_json::Value>;
}

#[async_trait::async_trait]
pub trait SessionLauncher: Send + Sync {
    /// Runs `f` against a fresh session bounded by `timeout`.
    async fn with_session<T, F>(&self, timeout: Duration, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn Session) -> Result<T> + Send + 'static;
}
