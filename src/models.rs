//! Data models shared across the ingestion pipeline.
//!
//! This module defines the core data structures used throughout the application:
//! - [`SourceKind`]: which of the four upstream sources a record came from
//! - [`NewsRecord`]: the normalized record shape every adapter produces
//!
//! Raw per-source payloads (Reddit listings, YouTube search responses, parsed
//! HTML fragments) live inside the adapter modules and never escape them; the
//! rest of the pipeline only ever sees [`NewsRecord`].

use chrono::{DateTime, Utc};
use std::fmt;

/// The four upstream sources the pipeline aggregates.
///
/// Each kind maps to a fixed table in the SQLite store and to a section
/// heading in the rendered digest. [`SourceKind::ALL`] lists the kinds in
/// digest section order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Reddit posts fetched through the listing API.
    Reddit,
    /// YouTube videos found through the search API.
    Youtube,
    /// TechCrunch articles scraped from the AI category listing.
    Techcrunch,
    /// Medium posts collected from browser-rendered tag archives.
    Medium,
}

impl SourceKind {
    /// All kinds, in the order sections appear in the digest.
    pub const ALL: [SourceKind; 4] = [
        SourceKind::Techcrunch,
        SourceKind::Youtube,
        SourceKind::Reddit,
        SourceKind::Medium,
    ];

    /// The store table this kind persists to.
    pub fn table(&self) -> &'static str {
        match self {
            SourceKind::Reddit => "reddit_posts",
            SourceKind::Youtube => "youtube_videos",
            SourceKind::Techcrunch => "techcrunch_articles",
            SourceKind::Medium => "medium_posts",
        }
    }

    /// The digest section heading for this kind.
    pub fn heading(&self) -> &'static str {
        match self {
            SourceKind::Reddit => "Reddit Posts",
            SourceKind::Youtube => "YouTube Videos",
            SourceKind::Techcrunch => "TechCrunch Articles",
            SourceKind::Medium => "Medium.com Posts",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::Reddit => "reddit",
            SourceKind::Youtube => "youtube",
            SourceKind::Techcrunch => "techcrunch",
            SourceKind::Medium => "medium",
        };
        f.write_str(name)
    }
}

/// A normalized news record, the common shape every adapter emits.
///
/// Records are immutable once built. They flow through the relevance filter
/// and the dedup gate, and are either dropped or persisted exactly once; the
/// store never updates or deletes them.
///
/// # Identity
///
/// `(kind, natural_id)` is the dedup key. The natural id is whatever the
/// upstream source uses to identify the item: the post id for Reddit, the
/// video id for YouTube, and the article URL for TechCrunch and Medium.
#[derive(Debug, Clone, PartialEq)]
pub struct NewsRecord {
    /// Which source produced this record.
    pub kind: SourceKind,
    /// Source-specific identifier, unique within `kind`.
    pub natural_id: String,
    /// Item title or headline.
    pub title: String,
    /// Author, channel, or poster name when the source exposes one.
    pub author: Option<String>,
    /// Canonical URL of the item.
    pub url: String,
    /// Publish timestamp. `None` when the source gave no parseable date;
    /// such records are rejected by the relevance filter.
    pub published_at: Option<DateTime<Utc>>,
    /// When this pipeline run fetched the item.
    pub fetched_at: DateTime<Utc>,
    /// Body text, description, or excerpt depending on the source.
    pub snippet: String,
    /// Source-specific leftovers (subreddit, score, search topic, image URL,
    /// ...), kept as a JSON object.
    pub extra: serde_json::Value,
}

impl NewsRecord {
    /// The record's channel or topic from `extra`, if the adapter recorded
    /// one. Used for exact term matching in the relevance filter.
    pub fn channel_or_topic(&self) -> Option<&str> {
        self.extra
            .get("subreddit")
            .or_else(|| self.extra.get("topic"))
            .and_then(|v| v.as_str())
    }
}
