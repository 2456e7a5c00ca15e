//! Medium dynamic-page adapter.
//!
//! Medium tag archives render their listing client-side and load more posts
//! as the page scrolls, so a plain GET never sees them. This adapter drives
//! a real browser through a WebDriver session: load the archive, parse the
//! DOM, scroll to the bottom, wait for the new batch, and repeat until
//! three consecutive scrolls surface nothing new. Downstream handling is
//! identical to the static scraper; only the way raw items are obtained
//! differs.

use crate::error::SourceError;
use crate::filter::TimeWindow;
use crate::models::{NewsRecord, SourceKind};
use crate::sources::NewsSource;
use crate::sources::techcrunch::reads_as_english;
use crate::utils::midnight_days_ago;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fantoccini::{Client, ClientBuilder};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::json;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Scrolls in a row that may yield no new articles before a topic is done.
const MAX_IDLE_SCROLLS: u32 = 3;
/// Settle time after each scroll for the next batch to render.
const SCROLL_SETTLE: Duration = Duration::from_secs(2);

/// "12h ago" / "3d ago" / "just now" anywhere in a card's text.
static CARD_AGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(just now|(\d{1,2})([hd])\s+ago)\b").unwrap());

/// Dynamic-page adapter over browser-rendered Medium tag archives.
pub struct MediumSource {
    topics: Vec<String>,
    webdriver_url: String,
}

impl MediumSource {
    pub fn new(topics: Vec<String>, webdriver_url: String) -> Self {
        Self {
            topics,
            webdriver_url,
        }
    }

    /// Scroll-and-parse loop over every configured tag archive.
    async fn scrape_archives(
        &self,
        client: &Client,
        _window: &TimeWindow,
    ) -> Result<Vec<NewsRecord>, SourceError> {
        let mut records = Vec::new();
        let mut seen_links: HashSet<String> = HashSet::new();

        for topic in &self.topics {
            let url = format!("https://medium.com/tag/{topic}/archive");
            client.goto(&url).await?;
            tokio::time::sleep(SCROLL_SETTLE).await;

            let mut idle_scrolls = 0;
            while idle_scrolls < MAX_IDLE_SCROLLS {
                let html = client.source().await?;
                let fresh = parse_archive(&html, topic, Utc::now(), &mut seen_links);

                if fresh.is_empty() {
                    idle_scrolls += 1;
                } else {
                    idle_scrolls = 0;
                    debug!(%topic, new = fresh.len(), "Parsed scroll batch");
                    records.extend(fresh);
                }

                client
                    .execute("window.scrollTo(0, document.body.scrollHeight);", vec![])
                    .await?;
                tokio::time::sleep(SCROLL_SETTLE).await;
            }

            info!(%topic, total = records.len(), "Finished tag archive");
        }

        Ok(records)
    }
}

#[async_trait]
impl NewsSource for MediumSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Medium
    }

    #[instrument(level = "info", skip_all)]
    async fn fetch(&self, window: &TimeWindow) -> Result<Vec<NewsRecord>, SourceError> {
        let client = ClientBuilder::native()
            .connect(&self.webdriver_url)
            .await?;

        // The session must be released whether or not scraping succeeded.
        let result = self.scrape_archives(&client, window).await;
        if let Err(e) = client.close().await {
            warn!(error = %e, "Failed to close webdriver session");
        }

        let records = result?;
        info!(count = records.len(), "Fetched Medium posts");
        Ok(records)
    }
}

/// Parse every `<article>` in the rendered page, skipping links already in
/// `seen_links`. New links are added to the set so later scrolls only
/// return genuinely new posts.
fn parse_archive(
    html: &str,
    topic: &str,
    now: DateTime<Utc>,
    seen_links: &mut HashSet<String>,
) -> Vec<NewsRecord> {
    let document = Html::parse_document(html);
    let article_selector = Selector::parse("article").unwrap();

    let mut records = Vec::new();
    for article in document.select(&article_selector) {
        let Some(record) = parse_article(&article, topic, now) else {
            continue;
        };
        if seen_links.insert(record.url.clone()) {
            records.push(record);
        }
    }
    records
}

/// Parse one article card. `None` when title or link is missing, or the
/// title fails the language check.
fn parse_article(article: &ElementRef, topic: &str, now: DateTime<Utc>) -> Option<NewsRecord> {
    let h2_selector = Selector::parse("h2").unwrap();
    let h3_selector = Selector::parse("h3").unwrap();
    let div_selector = Selector::parse("div").unwrap();
    let img_selector = Selector::parse("img").unwrap();

    let title = article
        .select(&h2_selector)
        .map(|h2| element_text(&h2))
        .find(|t| !t.is_empty())
        .or_else(|| {
            article
                .select(&div_selector)
                .filter_map(|d| d.value().attr("aria-label"))
                .map(|s| s.trim().to_string())
                .find(|t| !t.is_empty())
        })?;

    let link = article
        .select(&div_selector)
        .filter_map(|d| d.value().attr("data-href"))
        .find(|href| href.contains("https"))?
        .to_string();

    let snippet = article
        .select(&h3_selector)
        .map(|h3| element_text(&h3))
        .find(|t| !t.is_empty())
        .unwrap_or_default();

    let image = article
        .select(&img_selector)
        .filter_map(|img| img.value().attr("src"))
        .find(|src| {
            let lower = src.to_lowercase();
            lower.contains(".jpg") || lower.contains(".jpeg") || lower.contains(".png")
        })
        .map(|s| s.to_string());

    let published_at = article
        .select(&div_selector)
        .map(|d| element_text(&d))
        .find_map(|text| age_from_card_text(&text))
        .map(|days| midnight_days_ago(now, days));

    if !reads_as_english(&format!("{title} {snippet}")) {
        warn!(%link, "Dropping non-English post");
        return None;
    }

    Some(NewsRecord {
        kind: SourceKind::Medium,
        natural_id: link.clone(),
        title,
        author: None,
        url: link,
        published_at,
        fetched_at: Utc::now(),
        snippet,
        extra: json!({
            "topic": topic,
            "image": image,
        }),
    })
}

/// Pull a relative age out of a card's running text. Hour-granularity ages
/// and "just now" mean today.
fn age_from_card_text(text: &str) -> Option<i64> {
    let caps = CARD_AGE.captures(text)?;
    if caps.get(2).is_none() {
        return Some(0); // "just now"
    }
    let n: i64 = caps[2].parse().ok()?;
    match &caps[3] {
        "h" | "H" => Some(0),
        _ => Some(n),
    }
}

fn element_text(element: &ElementRef) -> String {
    element.text().collect::<Vec<_>>().join(" ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const ARCHIVE: &str = r#"
    <html><body>
      <article>
        <div aria-label="Fine-tuning open models on a budget"></div>
        <h2>Fine-tuning open models on a budget</h2>
        <h3>What actually worked for a small team shipping with large language models</h3>
        <div data-href="https://medium.com/@writer/fine-tuning-open-models-1a2b3c"></div>
        <img src="https://miro.medium.com/max/1400/cover.jpg" />
        <div>Some Writer · 2d ago · 7 min read</div>
      </article>
      <article>
        <h2>Agentes de lenguaje y el futuro del trabajo en las empresas modernas</h2>
        <h3>Una mirada al impacto de la inteligencia artificial en las organizaciones</h3>
        <div data-href="https://medium.com/@otro/agentes-de-lenguaje-9z8y7x"></div>
        <div>Otro Autor · 1d ago</div>
      </article>
      <article>
        <h2>Card with no link</h2>
      </article>
    </body></html>
    "#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 21, 15, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_archive_extracts_english_posts() {
        let mut seen = HashSet::new();
        let records = parse_archive(ARCHIVE, "llm", now(), &mut seen);
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(
            record.url,
            "https://medium.com/@writer/fine-tuning-open-models-1a2b3c"
        );
        assert_eq!(record.title, "Fine-tuning open models on a budget");
        assert_eq!(record.extra["topic"], "llm");
        assert_eq!(
            record.extra["image"],
            "https://miro.medium.com/max/1400/cover.jpg"
        );
        assert_eq!(
            record.published_at,
            Some(Utc.with_ymd_and_hms(2024, 7, 19, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_parse_archive_skips_already_seen_links() {
        let mut seen = HashSet::new();
        seen.insert("https://medium.com/@writer/fine-tuning-open-models-1a2b3c".to_string());
        let records = parse_archive(ARCHIVE, "llm", now(), &mut seen);
        assert!(records.is_empty());
    }

    #[test]
    fn test_age_from_card_text() {
        assert_eq!(age_from_card_text("Writer · just now · 3 min read"), Some(0));
        assert_eq!(age_from_card_text("Writer · 11h ago · 3 min read"), Some(0));
        assert_eq!(age_from_card_text("Writer · 3d ago"), Some(3));
        assert_eq!(age_from_card_text("Writer · Jul 3 · 3 min read"), None);
    }
}
