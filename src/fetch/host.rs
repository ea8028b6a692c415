// src/fetch/host.rs
// =============================================================================
// Host resolution with the `url` crate.
//
// The host is only used as a key for per-host admission control, so we take
// exactly what Url::host_str() gives us: no lowercasing beyond what the url
// crate already does, no port, no "www." stripping.
// =============================================================================

use url::Url;

use super::HostResolver;
use crate::crawl::UrlError;

#[derive(Debug, Default, Clone, Copy)]
pub struct UrlHostResolver;

impl HostResolver for UrlHostResolver {
    fn host(&self, url: &str) -> Result<String, UrlError> {
        let parsed = Url::parse(url).map_err(|e| UrlError::MalformedUrl {
            reason: format!("'{}': {}", url, e),
        })?;

        // file:, data:, mailto: and friends parse fine but have nowhere to go
        parsed
            .host_str()
            .map(str::to_owned)
            .ok_or_else(|| UrlError::MalformedUrl {
                reason: format!("'{}' has no host", url),
            })
    }
}
