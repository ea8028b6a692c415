// src/crawl/config.rs
// =============================================================================
// Crawler configuration: the sizes of the two worker pools and the per-host
// limit. All three must be at least 1; the CLI supplies the defaults.
// =============================================================================

use super::error::CrawlError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlerConfig {
    /// Number of download workers
    pub downloaders: usize,
    /// Number of link extraction workers
    pub extractors: usize,
    /// Maximum concurrent downloads from one host
    pub per_host: usize,
}

impl CrawlerConfig {
    pub fn new(downloaders: usize, extractors: usize, per_host: usize) -> Self {
        Self {
            downloaders,
            extractors,
            per_host,
        }
    }

    pub fn validate(&self) -> Result<(), CrawlError> {
        let fields = [
            ("downloaders", self.downloaders),
            ("extractors", self.extractors),
            ("per_host", self.per_host),
        ];
        for (name, value) in fields {
            if value == 0 {
                return Err(CrawlError::InvalidConfig(format!(
                    "{} must be at least 1",
                    name
                )));
            }
        }
        Ok(())
    }
}
