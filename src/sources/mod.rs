//! Source adapters for the four upstream platforms.
//!
//! Each adapter wraps one platform's access pattern and hands back the same
//! normalized [`NewsRecord`](crate::models::NewsRecord) shape:
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | Reddit | [`reddit`] | listing API | OAuth client credentials, paged per subreddit |
//! | YouTube | [`youtube`] | search API | API key, one query per topic, paged |
//! | TechCrunch | [`techcrunch`] | HTML scraping | AI category listing, next-page link |
//! | Medium | [`medium`] | WebDriver | tag archives, scroll-to-load loop |
//!
//! Adapters perform network/browser I/O only; persistence and filtering
//! happen downstream in the aggregator. Per-source cleanup (the English
//! language check for the scraped sources, author fallbacks, cross-topic
//! de-dup) is part of normalization and lives inside the adapter.

use crate::error::SourceError;
use crate::filter::TimeWindow;
use crate::models::{NewsRecord, SourceKind};
use async_trait::async_trait;

pub mod medium;
pub mod reddit;
pub mod techcrunch;
pub mod youtube;

/// Capability every source adapter provides: fetch and normalize.
///
/// Implementations are selected by configuration in `main` and driven by
/// the aggregator through this interface; the aggregator never knows which
/// transport is behind a given adapter.
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Which source this adapter feeds.
    fn kind(&self) -> SourceKind;

    /// Fetch everything the source currently offers for `window` and return
    /// it as normalized records.
    ///
    /// The window is a hint for the upstream query (listing walks stop
    /// early, search APIs get a `publishedAfter`); the authoritative window
    /// check still happens in the relevance filter.
    ///
    /// # Errors
    ///
    /// Any [`SourceError`] means this source is unavailable for the run.
    /// The caller logs it and continues with the remaining sources.
    async fn fetch(&self, window: &TimeWindow) -> Result<Vec<NewsRecord>, SourceError>;
}
