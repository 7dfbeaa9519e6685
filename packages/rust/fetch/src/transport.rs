//! The transport seam shared by the direct and rendering fetchers.

use async_trait::async_trait;
use url::Url;

use sitesignal_shared::{FetchOptions, Result};

/// A single way of acquiring page markup.
///
/// Implementations perform exactly one attempt; retrying and transport
/// selection belong to [`crate::Fetcher`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short name for tracing (`"direct"`, `"render"`).
    fn name(&self) -> &'static str;

    /// Whether this transport can serve a request right now.
    ///
    /// Checked before every attempt, so an implementation may change its
    /// answer between attempts (e.g. after a browser crash).
    async fn is_available(&self) -> bool {
        true
    }

    /// Fetch `url` once and return its markup.
    async fn fetch(&self, url: &Url, opts: &FetchOptions) -> Result<String>;
}
