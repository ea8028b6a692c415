// src/fetch/mod.rs
// =============================================================================
// This module contains everything the crawler needs from the outside world:
//
// - Downloader: fetches a URL and hands back a Document
// - Document: a downloaded page that knows how to list its links
// - HostResolver: turns a URL into the host used for per-host limits
//
// The crawler core only talks to these traits. The real implementations
// (reqwest + scraper + url) live in the submodules; tests plug in fakes.
//
// Submodules:
// - http: HttpDownloader built on reqwest
// - html: HtmlDocument and link extraction built on scraper
// - host: UrlHostResolver built on the url crate
// =============================================================================

mod host;
mod html;
mod http;

use async_trait::async_trait;
use thiserror::Error;

use crate::crawl::UrlError;

pub use host::UrlHostResolver;
pub use html::HtmlDocument;
pub use http::HttpDownloader;

// Why a download failed.
//
// These are plain data (no reqwest::Error inside) so they can be cloned into
// the crawl result and compared in tests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Server answered with a non-2xx status
    #[error("HTTP {status}")]
    Status { status: u16 },
    /// Request timed out
    #[error("request timed out")]
    Timeout,
    /// Redirect loop or redirect limit exceeded
    #[error("too many redirects")]
    TooManyRedirects,
    /// DNS failure, refused connection, TLS handshake...
    #[error("connection failed: {message}")]
    Connect { message: String },
    /// Anything else the transport reported (body decode, protocol errors)
    #[error("{message}")]
    Transport { message: String },
    /// The downloader panicked while fetching this URL
    #[error("downloader panicked: {message}")]
    Panicked { message: String },
}

// Why link extraction failed. Never shows up in crawl results.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("invalid page url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("link extraction task failed: {0}")]
    Task(String),
}

// Fetches pages. Called concurrently from every download worker.
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, url: &str) -> Result<Box<dyn Document>, FetchError>;
}

// A downloaded page.
#[async_trait]
pub trait Document: Send + Sync {
    async fn extract_links(&self) -> Result<Vec<String>, ExtractError>;
}

// Maps a URL to the key its downloads are limited under.
pub trait HostResolver: Send + Sync {
    fn host(&self, url: &str) -> Result<String, UrlError>;
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why #[async_trait]?
//    - The crawler stores the downloader as Arc<dyn Downloader>
//    - Plain `async fn` in traits can't be used through `dyn` yet
//    - async_trait rewrites the method to return a boxed future, which can
//      be called through `dyn` like any other method
//
// 2. Why Send + Sync on the traits?
//    - Many workers call the same downloader at the same time
//    - Send + Sync is how the compiler checks that this is safe
//
// 3. Why Box<dyn Document>?
//    - Different downloaders return different page types
//    - The crawler doesn't care which, it only calls extract_links()
// -----------------------------------------------------------------------------
