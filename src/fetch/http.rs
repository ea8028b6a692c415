// src/fetch/http.rs
// =============================================================================
// The real Downloader: fetches pages over HTTP with reqwest.
//
// Key functionality:
// - One shared Client (connection pooling across all download workers)
// - Per-request timeout and a small redirect limit
// - Non-2xx responses count as failed downloads
// - Transport errors are sorted into timeout / redirect / connect / other
//
// There is no retry here: every URL gets exactly one attempt.
// =============================================================================

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::{Document, Downloader, FetchError, HtmlDocument};

const MAX_REDIRECTS: usize = 5;

#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    // Builds the shared HTTP client
    //
    // Fails only if reqwest can't set up its TLS backend
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(concat!("level-crawler/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn download(&self, url: &str) -> Result<Box<dyn Document>, FetchError> {
        let response = self.client.get(url).send().await.map_err(categorize_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let html = response.text().await.map_err(categorize_error)?;
        debug!(url, bytes = html.len(), "page downloaded");
        Ok(Box::new(HtmlDocument::new(url, html)))
    }
}

// Categorizes the different error types reqwest can return
fn categorize_error(error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout
    } else if error.is_redirect() {
        FetchError::TooManyRedirects
    } else if error.is_connect() {
        FetchError::Connect {
            message: error.to_string(),
        }
    } else {
        FetchError::Transport {
            message: error.to_string(),
        }
    }
}
