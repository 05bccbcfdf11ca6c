//! Scraping engine for the jkanime catalog: latest episodes, anime detail,
//! episode pages, stream servers, stream resolution and search.

pub mod api;
pub mod browser;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod models;
pub mod rules;
pub mod scraper;
pub mod token;

pub use crate::error::{Error, Result};
pub use crate::scraper::Scraper;
