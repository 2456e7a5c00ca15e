//! Pipeline orchestration: fetch → filter → dedup → insert, per source.
//!
//! The aggregator drives the configured adapters one after another. Each
//! adapter's whole fetch runs under a hard timeout, and any failure —
//! timeout, transport, credentials, payload shape — is logged and recorded
//! in the run summary without touching the other sources. A run with every
//! source down still completes.
//!
//! Admission of a single record is the sequence: relevance filter, then the
//! dedup lookup, then the insert. The store's natural-key constraint backs
//! the lookup up, so a `DuplicateKey` at insert time is downgraded to a
//! skip rather than treated as a failure.

use crate::config::RunConfig;
use crate::error::StoreError;
use crate::filter::{TimeWindow, is_relevant};
use crate::models::SourceKind;
use crate::sources::NewsSource;
use crate::store::Store;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument, warn};

/// What one run did, per source.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// `(kind, admitted, skipped)` for every source that fetched, where
    /// skipped counts records dropped by the filter or the dedup gate.
    pub per_source: Vec<(SourceKind, usize, usize)>,
    /// Sources that contributed nothing this run, with the reason.
    pub failures: Vec<(SourceKind, String)>,
}

impl RunSummary {
    /// Total records admitted across all sources.
    pub fn admitted(&self) -> usize {
        self.per_source.iter().map(|(_, admitted, _)| admitted).sum()
    }
}

/// Drives the adapters and owns nothing but borrowed collaborators.
pub struct Aggregator<'a> {
    store: &'a Store,
    config: &'a RunConfig,
}

impl<'a> Aggregator<'a> {
    pub fn new(store: &'a Store, config: &'a RunConfig) -> Self {
        Self { store, config }
    }

    /// Run the full pipeline over `sources` for `window`.
    #[instrument(level = "info", skip_all)]
    pub async fn run(
        &self,
        sources: &[Box<dyn NewsSource>],
        window: &TimeWindow,
    ) -> RunSummary {
        let mut summary = RunSummary::default();
        let fetch_budget = Duration::from_secs(self.config.fetch_timeout_secs);

        for source in sources {
            let kind = source.kind();

            let records = match timeout(fetch_budget, source.fetch(window)).await {
                Ok(Ok(records)) => records,
                Ok(Err(e)) => {
                    warn!(source = %kind, error = %e, "Source unavailable; continuing without it");
                    summary.failures.push((kind, e.to_string()));
                    continue;
                }
                Err(_) => {
                    warn!(
                        source = %kind,
                        timeout_secs = self.config.fetch_timeout_secs,
                        "Source fetch timed out; continuing without it"
                    );
                    summary.failures.push((
                        kind,
                        format!("fetch exceeded the {}s timeout", self.config.fetch_timeout_secs),
                    ));
                    continue;
                }
            };

            let (admitted, skipped) = self.admit(kind, records, window);
            info!(source = %kind, admitted, skipped, "Source completed");
            summary.per_source.push((kind, admitted, skipped));
        }

        summary
    }

    /// Filter, dedup, and persist one source's records.
    fn admit(
        &self,
        kind: SourceKind,
        records: Vec<crate::models::NewsRecord>,
        window: &TimeWindow,
    ) -> (usize, usize) {
        let terms = self.config.terms_for(kind);
        let mut admitted = 0usize;
        let mut skipped = 0usize;

        for record in records {
            if !is_relevant(&record, window, &terms) {
                debug!(source = %kind, natural_id = %record.natural_id, "Filtered out");
                skipped += 1;
                continue;
            }

            match self.store.exists(kind, &record.natural_id) {
                Ok(true) => {
                    debug!(source = %kind, natural_id = %record.natural_id, "Already stored");
                    skipped += 1;
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    error!(source = %kind, error = %e, "Dedup lookup failed; skipping record");
                    skipped += 1;
                    continue;
                }
            }

            match self.store.insert(&record) {
                Ok(()) => admitted += 1,
                Err(StoreError::DuplicateKey { .. }) => {
                    // Raced with an earlier insert this run; already stored.
                    debug!(source = %kind, natural_id = %record.natural_id, "Duplicate insert ignored");
                    skipped += 1;
                }
                Err(e) => {
                    error!(source = %kind, error = %e, "Insert failed; skipping record");
                    skipped += 1;
                }
            }
        }

        (admitted, skipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::models::NewsRecord;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};
    use clap::Parser;
    use serde_json::json;

    struct StaticSource {
        kind: SourceKind,
        records: Vec<NewsRecord>,
    }

    #[async_trait]
    impl NewsSource for StaticSource {
        fn kind(&self) -> SourceKind {
            self.kind
        }
        async fn fetch(&self, _window: &TimeWindow) -> Result<Vec<NewsRecord>, SourceError> {
            Ok(self.records.clone())
        }
    }

    struct FailingSource {
        kind: SourceKind,
    }

    #[async_trait]
    impl NewsSource for FailingSource {
        fn kind(&self) -> SourceKind {
            self.kind
        }
        async fn fetch(&self, _window: &TimeWindow) -> Result<Vec<NewsRecord>, SourceError> {
            Err(SourceError::UnexpectedShape("upstream broke".to_string()))
        }
    }

    fn config() -> RunConfig {
        RunConfig::from_cli(&crate::cli::Cli::parse_from(["ai_news_digest"])).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 21, 15, 0, 0).unwrap()
    }

    fn reddit_record(id: &str, published_at: Option<DateTime<Utc>>) -> NewsRecord {
        NewsRecord {
            kind: SourceKind::Reddit,
            natural_id: id.to_string(),
            title: format!("post {id}"),
            author: Some("author".to_string()),
            url: format!("https://www.reddit.com/comments/{id}/"),
            published_at,
            fetched_at: now(),
            snippet: "body".to_string(),
            extra: json!({"subreddit": "LocalLLaMA"}),
        }
    }

    fn youtube_record(id: &str, published_at: Option<DateTime<Utc>>) -> NewsRecord {
        NewsRecord {
            kind: SourceKind::Youtube,
            natural_id: id.to_string(),
            title: "Intro to LLM agents".to_string(),
            author: Some("channel".to_string()),
            url: format!("https://www.youtube.com/watch?v={id}"),
            published_at,
            fetched_at: now(),
            snippet: "tutorial".to_string(),
            extra: json!({"topic": "LLM"}),
        }
    }

    #[tokio::test]
    async fn test_failing_source_is_isolated() {
        let store = Store::open_in_memory().unwrap();
        let config = config();
        let aggregator = Aggregator::new(&store, &config);
        let window = TimeWindow::rolling(now(), 1);

        let sources: Vec<Box<dyn NewsSource>> = vec![
            Box::new(StaticSource {
                kind: SourceKind::Reddit,
                records: vec![reddit_record("a", Some(now()))],
            }),
            Box::new(FailingSource {
                kind: SourceKind::Youtube,
            }),
            Box::new(StaticSource {
                kind: SourceKind::Medium,
                records: vec![],
            }),
        ];

        let summary = aggregator.run(&sources, &window).await;

        assert_eq!(summary.admitted(), 1);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].0, SourceKind::Youtube);
        assert_eq!(store.count(SourceKind::Reddit).unwrap(), 1);
        assert_eq!(store.count(SourceKind::Youtube).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_window_and_terms_enforced() {
        let store = Store::open_in_memory().unwrap();
        let config = config();
        let aggregator = Aggregator::new(&store, &config);
        let window = TimeWindow::rolling(now(), 1);

        let stale = Utc.with_ymd_and_hms(2024, 7, 18, 9, 0, 0).unwrap();
        let mut off_topic = reddit_record("d", Some(now()));
        off_topic.extra = json!({"subreddit": "cooking"});
        off_topic.title = "Sourdough starters".to_string();
        off_topic.snippet = "no overlap with the configured terms".to_string();

        let sources: Vec<Box<dyn NewsSource>> = vec![Box::new(StaticSource {
            kind: SourceKind::Reddit,
            records: vec![
                reddit_record("a", Some(now())),
                reddit_record("b", Some(stale)),
                reddit_record("c", None),
                off_topic,
            ],
        })];

        let summary = aggregator.run(&sources, &window).await;
        assert_eq!(summary.admitted(), 1);
        assert_eq!(store.count(SourceKind::Reddit).unwrap(), 1);
        assert!(store.exists(SourceKind::Reddit, "a").unwrap());
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        let config = config();
        let aggregator = Aggregator::new(&store, &config);
        let window = TimeWindow::rolling(now(), 1);

        let sources: Vec<Box<dyn NewsSource>> = vec![Box::new(StaticSource {
            kind: SourceKind::Youtube,
            records: vec![
                youtube_record("v1", Some(now())),
                youtube_record("v2", Some(now())),
            ],
        })];

        let first = aggregator.run(&sources, &window).await;
        assert_eq!(first.admitted(), 2);

        let second = aggregator.run(&sources, &window).await;
        assert_eq!(second.admitted(), 0);
        assert_eq!(store.count(SourceKind::Youtube).unwrap(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_ids_within_one_batch_first_wins() {
        let store = Store::open_in_memory().unwrap();
        let config = config();
        let aggregator = Aggregator::new(&store, &config);
        let window = TimeWindow::rolling(now(), 1);

        let mut changed = youtube_record("v1", Some(now()));
        changed.title = "Different title, same video".to_string();

        let sources: Vec<Box<dyn NewsSource>> = vec![Box::new(StaticSource {
            kind: SourceKind::Youtube,
            records: vec![youtube_record("v1", Some(now())), changed],
        })];

        let summary = aggregator.run(&sources, &window).await;
        assert_eq!(summary.admitted(), 1);

        let rows = store
            .query_range(SourceKind::Youtube, window.start, window.end)
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "Intro to LLM agents");
    }
}
