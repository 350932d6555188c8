//! Platform sources: where ranked items come from before they reach the
//! snapshot store.

pub mod error;
pub mod feed;
pub mod file;
pub mod http;
pub mod registry;
mod retry;

use async_trait::async_trait;
use dramatrack_core::ScrapedItem;

pub use error::SourceError;
pub use feed::FeedDocument;
pub use file::JsonFileSource;
pub use http::{FetchSettings, HttpFeedSource};
pub use registry::SourceRegistry;
pub use retry::RetryPolicy;

/// Capability to fetch the current ranking for one platform.
#[async_trait]
pub trait PlatformSource: Send + Sync {
    /// Platform id this source produces items for.
    fn platform(&self) -> &str;

    /// Fetch at most `top_n` items, ordered by rank ascending.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the feed is unreachable or malformed.
    async fn fetch(&self, top_n: usize) -> Result<Vec<ScrapedItem>, SourceError>;
}
