// src/crawl/result.rs
// =============================================================================
// What a crawl hands back, and the shared state it is built from.
//
// While a crawl runs, workers insert into concurrent sets/maps (DashSet,
// DashMap). Inserting a URL that is already there is a harmless no-op.
// When the last level is done the orchestrator copies everything into a
// CrawlResult with sorted, ordinary collections.
// =============================================================================

use dashmap::{DashMap, DashSet};
use std::collections::{BTreeMap, BTreeSet};

use super::error::UrlError;

// The outcome of one crawl() call.
//
// Every URL the crawler dispatched is in exactly one of the two fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlResult {
    pub downloaded: BTreeSet<String>,
    pub errors: BTreeMap<String, UrlError>,
}

impl CrawlResult {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn total(&self) -> usize {
        self.downloaded.len() + self.errors.len()
    }
}

// Per-crawl state shared with every task of that crawl
#[derive(Default)]
pub(crate) struct CrawlState {
    pub visited: DashSet<String>,
    pub downloaded: DashSet<String>,
    pub errors: DashMap<String, UrlError>,
}

impl CrawlState {
    // Marks a URL as visited; false if some earlier dispatch already did
    pub fn visit(&self, url: &str) -> bool {
        if self.visited.contains(url) {
            return false;
        }
        self.visited.insert(url.to_string())
    }

    pub fn record_download(&self, url: String) {
        self.downloaded.insert(url);
    }

    pub fn record_error(&self, url: String, error: UrlError) {
        self.errors.insert(url, error);
    }

    pub fn snapshot(&self) -> CrawlResult {
        CrawlResult {
            downloaded: self.downloaded.iter().map(|url| url.key().clone()).collect(),
            errors: self
                .errors
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().clone()))
                .collect(),
        }
    }
}
