//! TechCrunch article-site adapter.
//!
//! Scrapes the Artificial Intelligence category listing. The listing is
//! WordPress block markup; each post card carries its title link, an author
//! card, an excerpt, and a relative age label ("2 hours ago", "3 days ago")
//! that gets converted to a calendar date. Older pages are reached through
//! the "load more" pagination link until the window is exhausted.

use crate::error::SourceError;
use crate::filter::TimeWindow;
use crate::models::{NewsRecord, SourceKind};
use crate::net::get_text_with_backoff;
use crate::sources::NewsSource;
use crate::utils::{days_ago_from_label, midnight_days_ago};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::json;
use tracing::{info, instrument, warn};
use url::Url;

const LISTING_URL: &str = "https://techcrunch.com/category/artificial-intelligence/";
/// How many listing pages to walk at most; each page holds ~20 posts.
const MAX_PAGES: u32 = 5;

static AUTHOR_SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"/author/([^/]+)/").unwrap());

/// Article-site adapter over the static TechCrunch listing.
pub struct TechcrunchSource {
    client: reqwest::Client,
}

impl TechcrunchSource {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl NewsSource for TechcrunchSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Techcrunch
    }

    #[instrument(level = "info", skip_all)]
    async fn fetch(&self, window: &TimeWindow) -> Result<Vec<NewsRecord>, SourceError> {
        let mut records = Vec::new();
        let mut page_url = LISTING_URL.to_string();

        for _page in 0..MAX_PAGES {
            let html = get_text_with_backoff(&self.client, &page_url).await?;
            let page = parse_listing(&html, Utc::now());

            let page_exhausts_window = page
                .records
                .iter()
                .all(|r| matches!(r.published_at, Some(t) if t < window.start));
            let had_records = !page.records.is_empty();
            records.extend(page.records);

            match page.next_url {
                Some(next) if had_records && !page_exhausts_window => page_url = next,
                _ => break,
            }
        }

        info!(count = records.len(), "Fetched TechCrunch articles");
        Ok(records)
    }
}

/// One parsed listing page.
struct ParsedListing {
    records: Vec<NewsRecord>,
    next_url: Option<String>,
}

/// Parse a listing page into records plus the "load more" URL.
///
/// Cards that are missing a title link are skipped; cards whose title and
/// excerpt do not read as English are dropped at this stage, before the
/// relevance filter ever sees them.
fn parse_listing(html: &str, now: DateTime<Utc>) -> ParsedListing {
    let document = Html::parse_document(html);
    let card_selector = Selector::parse("div.wp-block-tc23-post-picker").unwrap();
    let next_selector = Selector::parse("a.wp-block-query-pagination-next").unwrap();

    let mut records = Vec::new();
    for card in document.select(&card_selector) {
        // Cards without a title link (ad slots, promos) drop out here.
        if let Some(record) = parse_card(&card, now) {
            records.push(record);
        }
    }

    let base = Url::parse(LISTING_URL).expect("listing URL is valid");
    let next_url = document
        .select(&next_selector)
        .next()
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| base.join(href).ok())
        .map(|u| u.to_string());

    ParsedListing { records, next_url }
}

/// Parse one post card. `None` when the card has no title link or fails the
/// language check.
fn parse_card(card: &ElementRef, now: DateTime<Utc>) -> Option<NewsRecord> {
    let title_selector = Selector::parse("h2.wp-block-post-title a").unwrap();
    let author_selector = Selector::parse("div.wp-block-tc23-author-card-name a").unwrap();
    let excerpt_selector = Selector::parse("p.wp-block-post-excerpt__excerpt").unwrap();
    let time_selector = Selector::parse("time.wp-block-tc23-post-time-ago").unwrap();

    let title_link = card.select(&title_selector).next()?;
    let url = title_link.value().attr("href")?.to_string();
    let title = element_text(&title_link);

    let author = card
        .select(&author_selector)
        .next()
        .and_then(|a| a.value().attr("href"))
        .and_then(author_from_link);

    let snippet = card
        .select(&excerpt_selector)
        .next()
        .map(|e| element_text(&e))
        .unwrap_or_default();

    let published_at = card
        .select(&time_selector)
        .next()
        .map(|t| element_text(&t))
        .and_then(|label| days_ago_from_label(&label))
        .map(|days| midnight_days_ago(now, days));

    if !reads_as_english(&format!("{title} {snippet}")) {
        warn!(%url, "Dropping non-English article");
        return None;
    }

    Some(NewsRecord {
        kind: SourceKind::Techcrunch,
        natural_id: url.clone(),
        title,
        author,
        url,
        published_at,
        fetched_at: Utc::now(),
        snippet,
        extra: json!({}),
    })
}

/// `/author/rebecca-bellan/` → `rebecca bellan`.
fn author_from_link(href: &str) -> Option<String> {
    AUTHOR_SLUG
        .captures(href)
        .map(|caps| caps[1].replace('-', " "))
}

fn element_text(element: &ElementRef) -> String {
    element.text().collect::<Vec<_>>().join(" ").trim().to_string()
}

/// Language check shared with the Medium adapter.
pub(crate) fn reads_as_english(text: &str) -> bool {
    matches!(whatlang::detect(text), Some(info) if info.lang() == whatlang::Lang::Eng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const LISTING: &str = r#"
    <html><body>
      <div class="wp-block-tc23-post-picker">
        <h2 class="wp-block-post-title">
          <a href="https://techcrunch.com/2024/07/21/openai-releases-a-new-model/">OpenAI releases a new model for developers</a>
        </h2>
        <div class="wp-block-tc23-author-card-name">
          <a href="https://techcrunch.com/author/rebecca-bellan/">Rebecca Bellan</a>
        </div>
        <p class="wp-block-post-excerpt__excerpt">The company said the new model improves reasoning performance across benchmarks.</p>
        <time class="wp-block-tc23-post-time-ago">2 hours ago</time>
      </div>
      <div class="wp-block-tc23-post-picker">
        <h2 class="wp-block-post-title">
          <a href="https://techcrunch.com/2024/07/18/older-ai-story/">An older artificial intelligence story about startup funding</a>
        </h2>
        <p class="wp-block-post-excerpt__excerpt">Investors keep pouring money into machine learning companies.</p>
        <time class="wp-block-tc23-post-time-ago">3 days ago</time>
      </div>
      <div class="wp-block-tc23-post-picker">
        <p class="wp-block-post-excerpt__excerpt">Broken card with no title link.</p>
      </div>
      <a class="wp-block-query-pagination-next" href="/category/artificial-intelligence/page/2/">Load More</a>
    </body></html>
    "#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 21, 15, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_listing_extracts_cards() {
        let page = parse_listing(LISTING, now());
        assert_eq!(page.records.len(), 2);

        let first = &page.records[0];
        assert_eq!(
            first.natural_id,
            "https://techcrunch.com/2024/07/21/openai-releases-a-new-model/"
        );
        assert_eq!(first.title, "OpenAI releases a new model for developers");
        assert_eq!(first.author.as_deref(), Some("rebecca bellan"));
        assert_eq!(
            first.published_at,
            Some(Utc.with_ymd_and_hms(2024, 7, 21, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_listing_converts_day_ages() {
        let page = parse_listing(LISTING, now());
        assert_eq!(
            page.records[1].published_at,
            Some(Utc.with_ymd_and_hms(2024, 7, 18, 0, 0, 0).unwrap())
        );
        // No author card on the second post.
        assert_eq!(page.records[1].author, None);
    }

    #[test]
    fn test_parse_listing_resolves_next_url() {
        let page = parse_listing(LISTING, now());
        assert_eq!(
            page.next_url.as_deref(),
            Some("https://techcrunch.com/category/artificial-intelligence/page/2/")
        );
    }

    #[test]
    fn test_parse_listing_without_pagination() {
        let page = parse_listing("<html><body></body></html>", now());
        assert!(page.records.is_empty());
        assert!(page.next_url.is_none());
    }

    #[test]
    fn test_author_from_link() {
        assert_eq!(
            author_from_link("https://techcrunch.com/author/rebecca-bellan/"),
            Some("rebecca bellan".to_string())
        );
        assert_eq!(author_from_link("https://techcrunch.com/about/"), None);
    }

    #[test]
    fn test_non_english_card_dropped() {
        let html = r#"
        <div class="wp-block-tc23-post-picker">
          <h2 class="wp-block-post-title">
            <a href="https://techcrunch.com/x/">Les modèles de langage transforment complètement l'industrie du logiciel</a>
          </h2>
          <p class="wp-block-post-excerpt__excerpt">Une analyse détaillée des nouveaux outils d'intelligence artificielle en France.</p>
          <time class="wp-block-tc23-post-time-ago">1 day ago</time>
        </div>
        "#;
        let page = parse_listing(html, now());
        assert!(page.records.is_empty());
    }
}
