//! Static HTML extraction for pages that render server-side.

use reqwest::Url;
use ::scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{AnimeDetail, Attribute, CatalogEntry};
use crate::rules::{ListingRules, SearchRules};

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Extraction(format!("invalid selector {:?}: {}", css, e)))
}

fn clean_text(element: ElementRef) -> String {
    element.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

fn first_text(parent: ElementRef, selector: &Selector) -> String {
    parent.select(selector).next().map(clean_text).unwrap_or_default()
}

fn first_attr(parent: ElementRef, selector: &Selector, attr: &str) -> String {
    parent
        .select(selector)
        .next()
        .and_then(|e| e.value().attr(attr))
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

/// First non-empty path segment of `href`, resolved against the site root.
pub fn slug_from_href(base: &Url, href: &str) -> Option<String> {
    let url = base.join(href.trim()).ok()?;
    let segment = url.path_segments()?.find(|s| !s.is_empty())?;
    Some(
        urlencoding::decode(segment)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| segment.to_string()),
    )
}

/// `"Episodio 12"` -> `"12"`; anything without a second word is unlabeled.
pub fn episode_label(badge: &str) -> String {
    badge.split_whitespace().nth(1).unwrap_or_default().to_string()
}

pub fn latest_entries(html: &str, base: &Url, rules: &ListingRules) -> Result<Vec<CatalogEntry>> {
    let document = Html::parse_document(html);

    let card_selector = selector(&rules.card)?;
    let image_selector = selector(&rules.image)?;
    let title_selector = selector(&rules.title)?;
    let badge_selector = selector(&rules.badge)?;

    let mut entries = Vec::new();

    for card in document.select(&card_selector) {
        let Some(slug) = card.value().attr("href").and_then(|href| slug_from_href(base, href)) else {
            debug!("Skipping listing card without a link");
            continue;
        };

        entries.push(CatalogEntry {
            slug,
            image_url: first_attr(card, &image_selector, &rules.image_attr),
            title: first_text(card, &title_selector),
            episode_label: episode_label(&first_text(card, &badge_selector)),
        });
    }

    debug!(count = entries.len(), "Parsed latest episodes");
    Ok(entries)
}

pub fn search_results(html: &str, base: &Url, rules: &SearchRules) -> Result<Vec<AnimeDetail>> {
    let document = Html::parse_document(html);

    let card_selector = selector(&rules.card)?;
    let title_selector = selector(&rules.title)?;
    let image_selector = selector(&rules.image)?;
    let link_selector = selector(&rules.link)?;
    let status_selector = selector(&rules.status)?;
    let kind_selector = selector(&rules.kind)?;

    let mut results = Vec::new();

    for card in document.select(&card_selector) {
        let slug = card
            .select(&link_selector)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| slug_from_href(base, href))
            .unwrap_or_default();

        let mut anime = AnimeDetail {
            title: first_text(card, &title_selector),
            slug,
            image_url: first_attr(card, &image_selector, &rules.image_attr),
            ..AnimeDetail::default()
        };

        let status = first_text(card, &status_selector);
        if !status.is_empty() {
            anime.attributes.insert("status".to_string(), Attribute::Scalar(status));
        }
        let kind = first_text(card, &kind_selector);
        if !kind.is_empty() {
            anime.attributes.insert("type".to_string(), Attribute::Scalar(kind));
        }

        results.push(anime);
    }

    debug!(count = results.len(), "Parsed search results");
    Ok(results)
}
