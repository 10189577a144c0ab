//! Service traits for the outbound side of the collector.

use anyhow::Result;
use async_trait::async_trait;

/// Outcome of requesting one search-results page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageFetch {
    /// 2xx response with its body.
    Success(String),
    /// The server answered with a non-success status.
    Failed { status: u16 },
}

/// Source of paginated search-result HTML.
///
/// A returned `Err` means the request itself failed (connect, timeout, body
/// read); a non-success HTTP status is `Ok(PageFetch::Failed { .. })`.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, page: u32) -> Result<PageFetch>;
}
