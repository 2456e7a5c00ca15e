//! YouTube video adapter.
//!
//! Queries the Data API v3 search endpoint once per configured topic,
//! newest first, restricted to videos published after the window start.
//! The same video routinely matches several topics, so results are
//! de-duplicated by video id before they leave the adapter; the topic that
//! found a video first is the one recorded on it.

use crate::error::SourceError;
use crate::filter::TimeWindow;
use crate::models::{NewsRecord, SourceKind};
use crate::sources::NewsSource;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use itertools::Itertools;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

const SEARCH_URL: &str = "https://www.googleapis.com/youtube/v3/search";
const PAGE_SIZE: u32 = 50;
/// Search pages fetched per topic. Two pages of 50 is already more than a
/// day of uploads for these queries.
const MAX_PAGES: u32 = 2;

/// Video adapter over the YouTube search API.
#[derive(Debug)]
pub struct YoutubeSource {
    api_key: String,
    topics: Vec<String>,
    client: reqwest::Client,
}

impl YoutubeSource {
    /// Build the adapter.
    ///
    /// # Errors
    ///
    /// [`SourceError::MissingCredentials`] when the API key is absent.
    pub fn new(
        topics: Vec<String>,
        api_key: Option<String>,
        client: reqwest::Client,
    ) -> Result<Self, SourceError> {
        let api_key = api_key.ok_or(SourceError::MissingCredentials("YOUTUBE_API_KEY"))?;
        Ok(Self {
            api_key,
            topics,
            client,
        })
    }

    /// Run one topic's search, following `nextPageToken` up to the page cap.
    #[instrument(level = "info", skip_all, fields(%topic))]
    async fn search_topic(
        &self,
        topic: &str,
        published_after: DateTime<Utc>,
    ) -> Result<Vec<NewsRecord>, SourceError> {
        let mut records = Vec::new();
        let mut page_token: Option<String> = None;

        for _page in 0..MAX_PAGES {
            let mut url = format!(
                "{SEARCH_URL}?part=snippet&type=video&order=date&relevanceLanguage=en\
                 &maxResults={PAGE_SIZE}&q={}&publishedAfter={}&key={}",
                urlencoding::encode(topic),
                urlencoding::encode(
                    &published_after.to_rfc3339_opts(SecondsFormat::Secs, true)
                ),
                self.api_key,
            );
            if let Some(token) = &page_token {
                url.push_str("&pageToken=");
                url.push_str(token);
            }

            let response = self.client.get(&url).send().await?.error_for_status()?;
            let payload: SearchResponse = response.json().await?;

            for item in payload.items {
                match normalize(&item, topic) {
                    Some(record) => records.push(record),
                    None => warn!(%topic, "Skipping search result without a video id"),
                }
            }

            page_token = payload.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        Ok(records)
    }
}

#[async_trait]
impl NewsSource for YoutubeSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Youtube
    }

    #[instrument(level = "info", skip_all)]
    async fn fetch(&self, window: &TimeWindow) -> Result<Vec<NewsRecord>, SourceError> {
        let mut all = Vec::new();
        for topic in &self.topics {
            let found = self.search_topic(topic, window.start).await?;
            info!(%topic, count = found.len(), "Fetched topic search results");
            all.extend(found);
        }

        // The same upload shows up under several topics; first topic wins.
        let unique: Vec<NewsRecord> = all
            .into_iter()
            .unique_by(|r| r.natural_id.clone())
            .collect();

        info!(count = unique.len(), "Fetched YouTube videos");
        Ok(unique)
    }
}

/// Map one search result to the normalized record shape. Results that are
/// not videos (no video id) are dropped.
fn normalize(item: &SearchItem, topic: &str) -> Option<NewsRecord> {
    let video_id = item.id.video_id.as_deref()?;
    let url = format!("https://www.youtube.com/watch?v={video_id}");
    let published_at = item
        .snippet
        .published_at
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc));

    Some(NewsRecord {
        kind: SourceKind::Youtube,
        natural_id: video_id.to_string(),
        title: item.snippet.title.clone(),
        author: Some(item.snippet.channel_title.clone()),
        url,
        published_at,
        fetched_at: Utc::now(),
        snippet: item.snippet.description.clone(),
        extra: json!({
            "channel": item.snippet.channel_title,
            "topic": topic,
        }),
    })
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "channelTitle", default)]
    channel_title: String,
}
