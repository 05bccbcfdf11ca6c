use actix_web::{App, HttpServer, middleware, web};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use yokai::Scraper;
use yokai::api;
use yokai::browser::ChromeLauncher;
use yokai::config::{Config, ServerConfig};
use yokai::fetcher::StaticFetcher;

fn setup_logging(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("yokai=info,actix_web=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!server.is_production())
        .init();
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let server = ServerConfig::from_env().map_err(std::io::Error::other)?;
    setup_logging(&server);

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            warn!("Failed to load config, using defaults: {}", e);
            Config::default()
        }
    };

    let engine = Scraper::from_config(&config.scraper).map_err(std::io::Error::other)?;
    let engine = web::Data::new(engine);

    info!(
        port = server.port,
        environment = %server.environment,
        base_url = %engine.base_url(),
        "Yokai API listening"
    );

    HttpServer::new(move || {
        App::new()
            .app_data(engine.clone())
            .wrap(middleware::Logger::default())
            .configure(api::configure::<StaticFetcher, ChromeLauncher>)
    })
    .bind(("0.0.0.0", server.port))?
    .shutdown_timeout(5)
    .run()
    .await
}
