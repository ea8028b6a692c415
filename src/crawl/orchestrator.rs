// src/crawl/orchestrator.rs
// =============================================================================
// The Crawler: a breadth-first crawl, one level at a time.
//
// How a crawl runs:
// 1. Level 0 is just the seed URL
// 2. Every URL of the level that hasn't been visited yet is dispatched:
//    its host is resolved and a download is submitted through that host's
//    admission queue
// 3. A successful download (if another level follows) submits an extraction
//    task, which adds the page's links to the next level's frontier
// 4. The orchestrator waits on the level barrier until every download and
//    extraction of the level is done
// 5. The frontier becomes the next level; repeat until max_depth levels ran
//
// Per-URL failures (bad URL, failed fetch) are recorded and the crawl keeps
// going. Only a shutdown in the middle of a level fails the whole call.
//
// The two worker pools and the host table belong to the Crawler and are
// reused by every crawl() call until shutdown().
// =============================================================================

use dashmap::DashSet;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use super::barrier::{LevelBarrier, Party};
use super::config::CrawlerConfig;
use super::error::{CrawlError, UrlError};
use super::host_queue::{HostSlot, HostTable};
use super::pool::{Job, WorkerPool};
use super::result::{CrawlResult, CrawlState};
use crate::fetch::{Document, Downloader, FetchError, HostResolver, UrlHostResolver};

pub struct Crawler {
    downloader: Arc<dyn Downloader>,
    resolver: Arc<dyn HostResolver>,
    config: CrawlerConfig,
    download_pool: Arc<WorkerPool>,
    extract_pool: Arc<WorkerPool>,
    hosts: HostTable,
    shutdown: watch::Sender<bool>,
}

// What every task of one level shares
struct Level {
    depth: usize,
    max_depth: usize,
    barrier: Arc<LevelBarrier>,
    next: Arc<DashSet<String>>,
    crawl: Arc<CrawlState>,
}

impl Level {
    fn has_next(&self) -> bool {
        self.depth + 1 < self.max_depth
    }
}

impl Crawler {
    // Creates a crawler that keys per-host limits by the URL's host.
    //
    // Starts both worker pools, so this must be called from inside a tokio
    // runtime.
    pub fn new(downloader: Arc<dyn Downloader>, config: CrawlerConfig) -> Result<Self, CrawlError> {
        Self::with_resolver(downloader, Arc::new(UrlHostResolver), config)
    }

    pub fn with_resolver(
        downloader: Arc<dyn Downloader>,
        resolver: Arc<dyn HostResolver>,
        config: CrawlerConfig,
    ) -> Result<Self, CrawlError> {
        config.validate()?;

        let download_pool = Arc::new(WorkerPool::new("download", config.downloaders));
        let extract_pool = Arc::new(WorkerPool::new("extract", config.extractors));
        let hosts = HostTable::new(config.per_host, Arc::clone(&download_pool));
        let (shutdown, _) = watch::channel(false);

        info!(
            downloaders = config.downloaders,
            extractors = config.extractors,
            per_host = config.per_host,
            "crawler started"
        );

        Ok(Self {
            downloader,
            resolver,
            config,
            download_pool,
            extract_pool,
            hosts,
            shutdown,
        })
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    #[cfg(test)]
    fn known_hosts(&self) -> usize {
        self.hosts.len()
    }

    // Crawls breadth-first from `seed`, downloading `max_depth` levels.
    //
    // max_depth = 1 downloads only the seed, 2 adds the pages it links to,
    // and so on. max_depth = 0 downloads nothing.
    #[instrument(skip(self))]
    pub async fn crawl(&self, seed: &str, max_depth: usize) -> Result<CrawlResult, CrawlError> {
        if *self.shutdown.borrow() {
            return Err(CrawlError::ShutDown);
        }

        let crawl = Arc::new(CrawlState::default());
        let mut frontier = vec![seed.to_string()];

        for depth in 0..max_depth {
            if frontier.is_empty() {
                debug!(depth, "nothing left to crawl");
                break;
            }

            let (barrier, sentinel) = LevelBarrier::new(depth);
            let level = Arc::new(Level {
                depth,
                max_depth,
                barrier: Arc::clone(&barrier),
                next: Arc::new(DashSet::new()),
                crawl: Arc::clone(&crawl),
            });

            info!(depth, urls = frontier.len(), "dispatching level");
            let mut dispatched = 0;
            for url in frontier {
                // First dispatch to mark a URL visited wins; later ones skip it
                if !crawl.visit(&url) {
                    continue;
                }
                let party = barrier.register();
                self.dispatch(url, party, &level);
                dispatched += 1;
            }

            barrier
                .await_advance(sentinel, self.shutdown.subscribe())
                .await?;
            // The level may have emptied right as the pools went away
            if *self.shutdown.borrow() {
                return Err(CrawlError::Interrupted { depth });
            }

            let mut next: Vec<String> = level.next.iter().map(|url| url.key().clone()).collect();
            next.sort();
            debug!(depth, dispatched, discovered = next.len(), "level finished");
            frontier = next;
        }

        self.hosts.prune_idle();
        let result = crawl.snapshot();
        info!(
            downloaded = result.downloaded.len(),
            errors = result.errors.len(),
            "crawl finished"
        );
        Ok(result)
    }

    fn dispatch(&self, url: String, party: Party, level: &Arc<Level>) {
        let host = match self.resolver.host(&url) {
            Ok(host) => host,
            Err(error) => {
                warn!(url = %url, error = %error, "skipping malformed url");
                level.crawl.record_error(url, error);
                party.arrive();
                return;
            }
        };

        let downloader = Arc::clone(&self.downloader);
        let extract_pool = Arc::clone(&self.extract_pool);
        let level = Arc::clone(level);
        self.hosts.submit(
            &host,
            Box::new(move |slot: HostSlot| -> Job {
                Box::pin(download_task(url, downloader, extract_pool, level, slot, party))
            }),
        );
    }

    // Stops both worker pools right away. A crawl that is still running
    // fails with CrawlError::Interrupted; later crawls fail with ShutDown.
    pub fn shutdown(&self) {
        if self.shutdown.send_replace(true) {
            return;
        }
        self.download_pool.shutdown();
        self.extract_pool.shutdown();
        self.hosts.clear();
        info!("crawler shut down");
    }
}

impl Drop for Crawler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn download_task(
    url: String,
    downloader: Arc<dyn Downloader>,
    extract_pool: Arc<WorkerPool>,
    level: Arc<Level>,
    slot: HostSlot,
    party: Party,
) {
    debug!(url = %url, host = slot.host(), depth = level.depth, "downloading");

    let fetched = AssertUnwindSafe(downloader.download(&url))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| {
            Err(FetchError::Panicked {
                message: panic_message(panic.as_ref()),
            })
        });

    match fetched {
        Ok(document) => {
            level.crawl.record_download(url.clone());
            if level.has_next() {
                // Registered before our own party goes away
                let extraction = level.barrier.register();
                let job: Job = Box::pin(extract_task(
                    url,
                    document,
                    Arc::clone(&level.next),
                    extraction,
                ));
                if extract_pool.submit(job).is_err() {
                    debug!("extract pool closed, skipping link extraction");
                }
            }
        }
        Err(error) => {
            warn!(url = %url, error = %error, "download failed");
            level.crawl.record_error(url, UrlError::Fetch(error));
        }
    }

    drop(slot);
    party.arrive();
}

async fn extract_task(
    url: String,
    document: Box<dyn Document>,
    next: Arc<DashSet<String>>,
    party: Party,
) {
    match document.extract_links().await {
        Ok(links) => {
            debug!(url = %url, links = links.len(), "links extracted");
            for link in links {
                next.insert(link);
            }
        }
        Err(error) => {
            debug!(url = %url, error = %error, "link extraction failed, treating as no links");
        }
    }
    party.arrive();
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
