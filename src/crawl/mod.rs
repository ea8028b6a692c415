// src/crawl/mod.rs
// =============================================================================
// This module handles the crawl itself.
//
// Features:
// - Breadth-first crawling, one level at a time, up to a depth limit
// - Two worker pools: downloads and link extraction never wait on each other
// - Per-host limit on concurrent downloads, without blocking any worker
// - Every URL downloaded at most once per crawl
// - Per-URL errors are collected, they never abort the crawl
//
// Submodules:
// - orchestrator: the Crawler and its level-by-level loop
// - host_queue: per-host admission control
// - pool: fixed-size worker pools
// - barrier: waits for all tasks of one level
// - result / error / config: the types the crawler hands in and out
// =============================================================================

mod barrier;
mod config;
mod error;
mod host_queue;
mod orchestrator;
mod pool;
mod result;

#[cfg(test)]
mod testing;

pub use config::CrawlerConfig;
pub use error::UrlError;
pub use orchestrator::Crawler;
pub use result::CrawlResult;
