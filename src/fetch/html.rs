// src/fetch/html.rs
// =============================================================================
// This module extracts links from downloaded HTML pages.
//
// We use the `scraper` crate which:
// - Parses HTML into a DOM (Document Object Model)
// - Supports CSS selectors for finding elements
// - Is built on html5ever (Mozilla's HTML parser)
//
// We also use the `url` crate to:
// - Resolve relative links against the page URL
// - Drop #fragments, so "/docs#install" and "/docs" are the same page
//
// Parsing is CPU work, so HtmlDocument runs it on tokio's blocking thread
// pool instead of inside an extraction worker.
// =============================================================================

use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

use super::{Document, ExtractError};

// A page fetched by HttpDownloader
#[derive(Debug, Clone)]
pub struct HtmlDocument {
    url: String,
    html: String,
}

impl HtmlDocument {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }
}

#[async_trait]
impl Document for HtmlDocument {
    async fn extract_links(&self) -> Result<Vec<String>, ExtractError> {
        let page = self.clone();
        tokio::task::spawn_blocking(move || extract_html_links(&page.html, &page.url))
            .await
            .map_err(|e| ExtractError::Task(e.to_string()))?
    }
}

// Extracts all crawlable links from HTML content
//
// Parameters:
//   html: the HTML content to parse
//   base_url: the URL of the page (for resolving relative links)
//
// Returns: absolute http(s) URLs without fragments, in document order,
// each listed once
//
// Example:
//   html = "<a href='/docs#intro'>Docs</a>"
//   base_url = "https://example.com"
//   result = ["https://example.com/docs"]
pub fn extract_html_links(html: &str, base_url: &str) -> Result<Vec<String>, ExtractError> {
    let base = Url::parse(base_url).map_err(|e| ExtractError::InvalidBaseUrl {
        url: base_url.to_string(),
        reason: e.to_string(),
    })?;

    let selector = match Selector::parse("a[href]") {
        Ok(selector) => selector,
        Err(e) => return Err(ExtractError::Task(format!("{:?}", e))),
    };

    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if let Some(link) = resolve_link(&base, href) {
            if seen.insert(link.clone()) {
                links.push(link);
            }
        }
    }

    Ok(links)
}

// Resolves a link (possibly relative) to an absolute, fragment-free URL
//
// Returns None for anchors, non-http schemes and hrefs that don't resolve
fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("javascript:")
        || href.starts_with("data:")
    {
        return None;
    }

    // join() handles both absolute hrefs and relative ones
    let mut url = base.join(href).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.set_fragment(None);
    Some(url.to_string())
}
