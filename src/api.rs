//! HTTP routes over the engine.

use actix_web::http::StatusCode;
use actix_web::http::header::LOCATION;
use actix_web::{HttpResponse, ResponseError, web};
use serde::Deserialize;
use tracing::error;

use crate::browser::SessionLauncher;
use crate::error::{Error, Result};
use crate::fetcher::PageFetcher;
use crate::scraper::Scraper;

pub const WELCOME: &str = "Welcome to Yokai API!";

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        if self.is_validation() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    fn error_response(&self) -> HttpResponse {
        if !self.is_validation() {
            error!(error = %self, "Request failed");
        }
        HttpResponse::build(self.status_code()).json(serde_json::json!({ "error": self.to_string() }))
    }
}

#[derive(Debug, Deserialize)]
pub struct SlugQuery {
    #[serde(default)]
    pub slug: String,
}

#[derive(Debug, Deserialize)]
pub struct EpisodesQuery {
    #[serde(default)]
    pub slug: String,
    pub page: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ServersQuery {
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub episode: String,
}

#[derive(Debug, Deserialize)]
pub struct PlayQuery {
    #[serde(default)]
    pub server: String,
    #[serde(default, alias = "slug")]
    pub remote: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub name: String,
    pub page: Option<String>,
}

/// Optional page number; absent or blank means the first page.
fn parse_page(raw: Option<&str>) -> Result<u32> {
    match raw.map(str::trim).filter(|p| !p.is_empty()) {
        None => Ok(1),
        Some(p) => p
            .parse()
            .map_err(|_| Error::Validation("page must be a number".to_string())),
    }
}

type Engine<F, L> = web::Data<Scraper<F, L>>;

async fn index() -> HttpResponse {
    HttpResponse::Ok().body(WELCOME)
}

async fn latest<F: PageFetcher + 'static, L: SessionLauncher + 'static>(
    engine: Engine<F, L>,
) -> Result<HttpResponse> {
    let entries = engine.list_latest().await?;
    Ok(HttpResponse::Ok().json(entries))
}

async fn anime<F: PageFetcher + 'static, L: SessionLauncher + 'static>(
    engine: Engine<F, L>,
    query: web::Query<SlugQuery>,
) -> Result<HttpResponse> {
    let detail = engine.get_detail(&query.slug).await?;
    Ok(HttpResponse::Ok().json(detail))
}

async fn episodes<F: PageFetcher + 'static, L: SessionLauncher + 'static>(
    engine: Engine<F, L>,
    query: web::Query<EpisodesQuery>,
) -> Result<HttpResponse> {
    let page = parse_page(query.page.as_deref())?;
    let episodes = engine.get_episode_page(&query.slug, page).await?;
    Ok(HttpResponse::Ok().json(episodes))
}

async fn servers<F: PageFetcher + 'static, L: SessionLauncher + 'static>(
    engine: Engine<F, L>,
    query: web::Query<ServersQuery>,
) -> Result<HttpResponse> {
    let episode = query.episode.trim();
    if !episode.is_empty() && episode.parse::<u32>().is_err() {
        return Err(Error::Validation("episode must be a number".to_string()));
    }
    let servers = engine.get_servers(&query.slug, episode).await?;
    Ok(HttpResponse::Ok().json(servers))
}

async fn play<F: PageFetcher + 'static, L: SessionLauncher + 'static>(
    engine: Engine<F, L>,
    query: web::Query<PlayQuery>,
) -> Result<HttpResponse> {
    let url = engine.resolve_stream(&query.server, &query.remote).await?;
    Ok(HttpResponse::Found()
        .insert_header((LOCATION, url.as_str()))
        .finish())
}

async fn search<F: PageFetcher + 'static, L: SessionLauncher + 'static>(
    engine: Engine<F, L>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse> {
    let page = parse_page(query.page.as_deref())?;
    let results = engine.search(&query.name, page).await?;
    Ok(HttpResponse::Ok().json(results))
}

/// Mounts `/` and the `/api` routes. The engine must be registered as
/// `web::Data<Scraper<F, L>>`.
pub fn configure<F, L>(cfg: &mut web::ServiceConfig)
where
    F: PageFetcher + 'static,
    L: SessionLauncher + 'static,
{
    cfg.route("/", web::get().to(index)).service(
        web::scope("/api")
            .route("/latest", web::get().to(latest::<F, L>))
            .route("/anime", web::get().to(anime::<F, L>))
            .route("/episodes", web::get().to(episodes::<F, L>))
            .route("/servers", web::get().to(servers::<F, L>))
            .route("/play", web::get().to(play::<F, L>))
            .route("/search", web::get().to(search::<F, L>)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_parse_page() {
        assert_eq!(parse_page(None).unwrap(), 1);
        assert_eq!(parse_page(Some("")).unwrap(), 1);
        assert_eq!(parse_page(Some("3")).unwrap(), 3);
        assert_eq!(parse_page(Some("0")).unwrap(), 0);
        assert!(parse_page(Some("two")).unwrap_err().is_validation());
        assert!(parse_page(Some("-1")).unwrap_err().is_validation());
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            Error::Validation("slug cannot be empty".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::Extraction("no title".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            Error::UnsupportedHost("Mega".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            Error::Timeout(Duration::from_secs(45)).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_play_query_accepts_slug_alias() {
        let query: PlayQuery = serde_json::from_value(serde_json::json!({
            "server": "Desu",
            "slug": "dG9rZW4="
        }))
        .unwrap();
        assert_eq!(query.remote, "dG9rZW4=");
    }
}
