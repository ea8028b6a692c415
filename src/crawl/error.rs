// src/crawl/error.rs
// =============================================================================
// Error types for the crawler.
//
// There are two very different kinds of failure:
// - UrlError: something went wrong with ONE url (bad url, fetch failed).
//   These are collected into the crawl result and never stop the crawl.
// - CrawlError: something went wrong with the crawl itself (bad config,
//   the crawler was shut down while a level was still running).
//   These are returned as Err(...) from Crawler::crawl().
//
// Link extraction failures are NOT in here as a per-url error: a page that
// can't be parsed simply contributes no links.
// =============================================================================

use thiserror::Error;

use crate::fetch::FetchError;

// A failure attached to a single URL in the crawl result
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    /// The URL could not be parsed, or has no host to queue it under
    #[error("malformed url: {reason}")]
    MalformedUrl { reason: String },

    /// The downloader could not fetch the page
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

impl UrlError {
    // Short machine-friendly name, used by the JSON report and the table
    pub fn kind(&self) -> &'static str {
        match self {
            UrlError::MalformedUrl { .. } => "malformed_url",
            UrlError::Fetch(_) => "fetch",
        }
    }
}

// A failure of the crawl call as a whole
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("invalid crawler configuration: {0}")]
    InvalidConfig(String),

    #[error("crawler has been shut down")]
    ShutDown,

    /// The worker pools went away while a level was still waiting for tasks
    #[error("crawl interrupted while waiting for level {depth} to finish")]
    Interrupted { depth: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_error_kind() {
        let malformed = UrlError::MalformedUrl { reason: "relative URL without a base".into() };
        assert_eq!(malformed.kind(), "malformed_url");
        assert_eq!(malformed.to_string(), "malformed url: relative URL without a base");

        let fetch = UrlError::from(FetchError::Status { status: 404 });
        assert_eq!(fetch.kind(), "fetch");
        assert_eq!(fetch.to_string(), "HTTP 404");
    }
}
