mod app;
mod player;
mod ui;

use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use yokai::Scraper;
use yokai::config::{self, Config};
use yokai::error::Result;

use crate::app::App;

fn setup_logging() -> Result<()> {
    let data_dir = config::data_dir()?;
    std::fs::create_dir_all(&data_dir)?;

    let file_appender = tracing_appender::rolling::daily(&data_dir, "yokai.log");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("yokai=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(file_appender).with_ansi(false))
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // File logging, the TUI owns the terminal
    if let Err(e) = setup_logging() {
        eprintln!("Warning: Could not set up logging: {}", e);
    }

    info!("Starting yokai");

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to load config, using defaults: {}", e);
            Config::default()
        }
    };

    let scraper = Scraper::from_config(&config.scraper)?;
    info!(base_url = %scraper.base_url(), "Engine ready");

    let mut terminal = app::init_terminal()?;

    let mut app = App::new(&config, scraper);
    let result = app.run(&mut terminal).await;

    app::restore_terminal()?;

    result
}
