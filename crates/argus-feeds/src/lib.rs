//! Argus Feeds - Syndicated feed source
//!
//! This crate produces normalized [`Record`]s from:
//! - RSS 2.0 channels
//! - Atom feeds
//!
//! Entries outside the recency window are dropped here, so downstream
//! stages never see stale items.

pub mod dates;
pub mod error;
pub mod parse;
pub mod source;

pub use dates::{normalize_published, Published, RecencyWindow};
pub use error::FeedError;
pub use parse::{parse_feed, FeedEntry};
pub use source::{normalize_entries, FeedSource};

use argus_core::Record;
use async_trait::async_trait;

/// Producer of normalized records for one pipeline run.
#[async_trait]
pub trait Source: Send + Sync {
    /// Fetch every configured feed and return entries inside `window`,
    /// in feed order then entry order.
    async fn fetch(&self, window: RecencyWindow) -> Result<Vec<Record>, FeedError>;
}
