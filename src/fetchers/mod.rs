//! Fetching raw HTML over HTTP.

use async_trait::async_trait;

mod request;

pub use request::RequestFetcher;

/// Source of raw HTML documents.
///
/// Failures are not errors at this level: anything that prevents getting a
/// usable document is logged by the implementation and reported as `None`.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Option<String>;
}
