//! Reddit forum adapter.
//!
//! Authenticates with the client-credentials OAuth flow, then walks the
//! `new` listing of each configured subreddit through
//! `oauth.reddit.com`. Listings come newest-first, so the walk stops as
//! soon as a page's oldest post falls before the window start instead of
//! paging through years of history.

use crate::error::SourceError;
use crate::filter::TimeWindow;
use crate::models::{NewsRecord, SourceKind};
use crate::sources::NewsSource;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, instrument};

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const API_BASE: &str = "https://oauth.reddit.com";
const PAGE_SIZE: u32 = 100;
/// Upper bound on listing pages per subreddit; with 100 posts per page this
/// is far beyond any realistic one-week window.
const MAX_PAGES: u32 = 10;

/// Forum adapter over the Reddit listing API.
#[derive(Debug)]
pub struct RedditSource {
    channels: Vec<String>,
    client_id: String,
    client_secret: String,
    user_agent: String,
    client: reqwest::Client,
}

impl RedditSource {
    /// Build the adapter from explicit credentials.
    ///
    /// # Errors
    ///
    /// [`SourceError::MissingCredentials`] when any credential is absent;
    /// the caller drops just this source and the run continues.
    pub fn new(
        channels: Vec<String>,
        client_id: Option<String>,
        client_secret: Option<String>,
        user_agent: Option<String>,
        client: reqwest::Client,
    ) -> Result<Self, SourceError> {
        let client_id =
            client_id.ok_or(SourceError::MissingCredentials("REDDIT_CLIENT_ID"))?;
        let client_secret =
            client_secret.ok_or(SourceError::MissingCredentials("REDDIT_CLIENT_SECRET"))?;
        let user_agent =
            user_agent.ok_or(SourceError::MissingCredentials("REDDIT_USER_AGENT"))?;
        Ok(Self {
            channels,
            client_id,
            client_secret,
            user_agent,
            client,
        })
    }

    /// Obtain an application-only bearer token.
    async fn access_token(&self) -> Result<String, SourceError> {
        let response = self
            .client
            .post(TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header("User-Agent", &self.user_agent)
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?
            .error_for_status()?;

        let token: TokenResponse = response.json().await?;
        if token.access_token.is_empty() {
            return Err(SourceError::UnexpectedShape(
                "empty access_token in token response".to_string(),
            ));
        }
        Ok(token.access_token)
    }

    /// Walk one subreddit's `new` listing until the window is exhausted.
    #[instrument(level = "info", skip_all, fields(%channel))]
    async fn fetch_channel(
        &self,
        token: &str,
        channel: &str,
        window: &TimeWindow,
    ) -> Result<Vec<NewsRecord>, SourceError> {
        let mut records = Vec::new();
        let mut after: Option<String> = None;

        for _page in 0..MAX_PAGES {
            let mut url = format!("{API_BASE}/r/{channel}/new?limit={PAGE_SIZE}&raw_json=1");
            if let Some(cursor) = &after {
                url.push_str("&after=");
                url.push_str(cursor);
            }

            let response = self
                .client
                .get(&url)
                .bearer_auth(token)
                .header("User-Agent", &self.user_agent)
                .send()
                .await?
                .error_for_status()?;
            let listing: Listing = response.json().await?;

            let mut reached_window_start = false;
            for child in &listing.data.children {
                let published_at = timestamp_from_epoch(child.data.created_utc);
                if let Some(t) = published_at {
                    if t < window.start {
                        // Listings are newest-first; everything after this
                        // point is older still.
                        reached_window_start = true;
                        break;
                    }
                }
                records.push(normalize(&child.data, published_at));
            }

            debug!(page_items = listing.data.children.len(), total = records.len(), "Walked listing page");

            after = listing.data.after;
            if reached_window_start || after.is_none() || listing.data.children.is_empty() {
                break;
            }
        }

        info!(count = records.len(), "Walked subreddit listing");
        Ok(records)
    }
}

#[async_trait]
impl NewsSource for RedditSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Reddit
    }

    #[instrument(level = "info", skip_all)]
    async fn fetch(&self, window: &TimeWindow) -> Result<Vec<NewsRecord>, SourceError> {
        let token = self.access_token().await?;

        // Channels share nothing but the token, so their walks can overlap.
        let per_channel = future::try_join_all(
            self.channels
                .iter()
                .map(|channel| self.fetch_channel(&token, channel, window)),
        )
        .await?;
        let records: Vec<NewsRecord> = per_channel.into_iter().flatten().collect();

        info!(count = records.len(), "Fetched Reddit posts");
        Ok(records)
    }
}

/// Map one listing entry to the normalized record shape.
fn normalize(post: &Post, published_at: Option<DateTime<Utc>>) -> NewsRecord {
    let url = format!("https://www.reddit.com{}", post.permalink);
    // Self posts carry their own text; link posts only point elsewhere.
    let snippet = if post.is_self {
        post.selftext.clone()
    } else {
        url.clone()
    };

    NewsRecord {
        kind: SourceKind::Reddit,
        natural_id: post.id.clone(),
        title: post.title.clone(),
        author: Some(
            post.author
                .clone()
                .unwrap_or_else(|| "[deleted]".to_string()),
        ),
        url,
        published_at,
        fetched_at: Utc::now(),
        snippet,
        extra: json!({
            "subreddit": post.subreddit,
            "score": post.score,
            "num_comments": post.num_comments,
            "is_self": post.is_self,
        }),
    }
}

fn timestamp_from_epoch(epoch: f64) -> Option<DateTime<Utc>> {
    if !epoch.is_finite() || epoch <= 0.0 {
        return None;
    }
    DateTime::from_timestamp(epoch as i64, 0)
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    after: Option<String>,
    #[serde(default)]
    children: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
struct Thing {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    id: String,
    title: String,
    permalink: String,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    score: i64,
    #[serde(default)]
    num_comments: i64,
    #[serde(default)]
    created_utc: f64,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    is_self: bool,
    #[serde(default)]
    subreddit: String,
}
