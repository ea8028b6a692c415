// src/crawl/testing.rs
// =============================================================================
// An in-memory web for crawler tests.
//
// FakeSite maps URLs to canned pages and counts everything the crawler does
// with them: downloads per URL, extractions, and the highest number of
// downloads that were in flight for each host at the same moment.
// =============================================================================

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::fetch::{Document, Downloader, ExtractError, FetchError};

#[derive(Clone)]
enum Page {
    Links(Vec<String>),
    Failing,
    Unparsable,
    Panicking,
}

#[derive(Default)]
struct HostLoad {
    in_flight: usize,
    peak: usize,
}

pub struct FakeSite {
    pages: HashMap<String, Page>,
    latency: Duration,
    calls: DashMap<String, usize>,
    load: Mutex<HashMap<String, HostLoad>>,
    extractions: Arc<AtomicUsize>,
}

#[derive(Default)]
pub struct FakeSiteBuilder {
    pages: HashMap<String, Page>,
    latency: Duration,
}

impl FakeSiteBuilder {
    pub fn page(mut self, url: &str, links: &[&str]) -> Self {
        let links = links.iter().map(|link| link.to_string()).collect();
        self.pages.insert(url.to_string(), Page::Links(links));
        self
    }

    // Downloading this URL fails with HTTP 500
    pub fn failing(mut self, url: &str) -> Self {
        self.pages.insert(url.to_string(), Page::Failing);
        self
    }

    // Downloads fine, but link extraction fails
    pub fn unparsable(mut self, url: &str) -> Self {
        self.pages.insert(url.to_string(), Page::Unparsable);
        self
    }

    pub fn panicking(mut self, url: &str) -> Self {
        self.pages.insert(url.to_string(), Page::Panicking);
        self
    }

    // How long every download takes
    pub fn latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn build(self) -> Arc<FakeSite> {
        Arc::new(FakeSite {
            pages: self.pages,
            latency: self.latency,
            calls: DashMap::new(),
            load: Mutex::new(HashMap::new()),
            extractions: Arc::new(AtomicUsize::new(0)),
        })
    }
}

impl FakeSite {
    pub fn builder() -> FakeSiteBuilder {
        FakeSiteBuilder::default()
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.get(url).map(|count| *count).unwrap_or(0)
    }

    // Every URL the crawler asked for, in order
    pub fn requested(&self) -> BTreeSet<String> {
        self.calls.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.iter().map(|entry| *entry.value()).sum()
    }

    pub fn extractions(&self) -> usize {
        self.extractions.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self, host: &str) -> usize {
        self.load.lock().get(host).map(|load| load.peak).unwrap_or(0)
    }

    fn host_of(url: &str) -> String {
        Url::parse(url)
            .ok()
            .and_then(|parsed| parsed.host_str().map(str::to_owned))
            .unwrap_or_else(|| url.to_string())
    }

    fn enter(&self, host: &str) {
        let mut load = self.load.lock();
        let entry = load.entry(host.to_string()).or_default();
        entry.in_flight += 1;
        entry.peak = entry.peak.max(entry.in_flight);
    }

    fn leave(&self, host: &str) {
        if let Some(entry) = self.load.lock().get_mut(host) {
            entry.in_flight -= 1;
        }
    }
}

struct FakePage {
    links: Result<Vec<String>, ExtractError>,
    extractions: Arc<AtomicUsize>,
}

#[async_trait]
impl Document for FakePage {
    async fn extract_links(&self) -> Result<Vec<String>, ExtractError> {
        self.extractions.fetch_add(1, Ordering::SeqCst);
        self.links.clone()
    }
}

#[async_trait]
impl Downloader for FakeSite {
    async fn download(&self, url: &str) -> Result<Box<dyn Document>, FetchError> {
        *self.calls.entry(url.to_string()).or_insert(0) += 1;

        let host = Self::host_of(url);
        self.enter(&host);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.leave(&host);

        let links = match self.pages.get(url).cloned() {
            Some(Page::Links(links)) => Ok(links),
            Some(Page::Unparsable) => Err(ExtractError::Task("unparsable page".into())),
            Some(Page::Failing) => return Err(FetchError::Status { status: 500 }),
            Some(Page::Panicking) => panic!("downloader blew up on {}", url),
            None => return Err(FetchError::Status { status: 404 }),
        };

        Ok(Box::new(FakePage {
            links,
            extractions: Arc::clone(&self.extractions),
        }))
    }
}
