//! Relevance filtering: the admission window and the topic predicate.
//!
//! Both checks are pure functions over a [`NewsRecord`]; the aggregator
//! applies them before the dedup gate. A record is admitted only when its
//! publish timestamp falls inside the window AND it matches at least one
//! configured term.
//!
//! Records with a missing or unparseable publish timestamp are rejected
//! rather than defaulted to "now", so stale undated content can never leak
//! into every run.

use crate::config::RunConfig;
use crate::models::NewsRecord;
use chrono::{DateTime, Duration, NaiveDate, Utc};

/// The inclusive time range a record must have been published in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Rolling window ending at `now`, starting at midnight UTC `days_back`
    /// days before it.
    ///
    /// Flooring the start to midnight keeps "one day back" meaning "since
    /// the start of yesterday", which is how the upstream search APIs are
    /// queried too.
    pub fn rolling(now: DateTime<Utc>, days_back: i64) -> Self {
        let start_day = now.date_naive() - Duration::days(days_back);
        Self {
            start: start_day.and_hms_opt(0, 0, 0).unwrap().and_utc(),
            end: now,
        }
    }

    /// Single-day window covering `[00:00, 24:00)` of `date`, UTC.
    pub fn for_day(date: NaiveDate) -> Self {
        let start = date.and_hms_opt(0, 0, 0).unwrap().and_utc();
        Self {
            start,
            end: start + Duration::days(1) - Duration::seconds(1),
        }
    }

    /// Build the window a [`RunConfig`] asks for.
    pub fn from_config(config: &RunConfig, now: DateTime<Utc>) -> Self {
        match config.target_date {
            Some(date) => Self::for_day(date),
            None => Self::rolling(now, config.days_back),
        }
    }

    /// Whether `t` falls inside the window, boundaries included.
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.start && t <= self.end
    }
}

/// Window + topic admission predicate.
///
/// The topic side accepts either an exact (case-insensitive) match between a
/// term and the record's channel/topic, or a case-insensitive substring hit
/// of a term in the title or snippet. Reddit effectively uses the first path
/// (its terms are the channel list) and the scraped sources the second.
pub fn is_relevant(record: &NewsRecord, window: &TimeWindow, terms: &[String]) -> bool {
    in_window(record, window) && matches_terms(record, terms)
}

/// Window predicate alone. Undated records are out-of-window by definition.
pub fn in_window(record: &NewsRecord, window: &TimeWindow) -> bool {
    match record.published_at {
        Some(t) => window.contains(t),
        None => false,
    }
}

/// Topic predicate alone.
pub fn matches_terms(record: &NewsRecord, terms: &[String]) -> bool {
    if let Some(channel) = record.channel_or_topic() {
        if terms.iter().any(|t| t.eq_ignore_ascii_case(channel)) {
            return true;
        }
    }

    let title = record.title.to_lowercase();
    let snippet = record.snippet.to_lowercase();
    terms.iter().any(|t| {
        let t = t.to_lowercase();
        !t.is_empty() && (title.contains(&t) || snippet.contains(&t))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceKind;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 21, 15, 30, 0).unwrap()
    }

    fn record(published_at: Option<DateTime<Utc>>) -> NewsRecord {
        NewsRecord {
            kind: SourceKind::Reddit,
            natural_id: "1abcd".to_string(),
            title: "Running a local LLM on a laptop".to_string(),
            author: Some("u1".to_string()),
            url: "https://www.reddit.com/r/LocalLLaMA/comments/1abcd/".to_string(),
            published_at,
            fetched_at: now(),
            snippet: "notes on quantization".to_string(),
            extra: json!({"subreddit": "LocalLLaMA"}),
        }
    }

    #[test]
    fn test_rolling_window_spans_from_midnight() {
        let w = TimeWindow::rolling(now(), 1);
        assert_eq!(w.start, Utc.with_ymd_and_hms(2024, 7, 20, 0, 0, 0).unwrap());
        assert_eq!(w.end, now());
    }

    #[test]
    fn test_rolling_window_zero_days_is_today() {
        let w = TimeWindow::rolling(now(), 0);
        assert_eq!(w.start, Utc.with_ymd_and_hms(2024, 7, 21, 0, 0, 0).unwrap());
        assert!(w.contains(Utc.with_ymd_and_hms(2024, 7, 21, 1, 0, 0).unwrap()));
        assert!(!w.contains(Utc.with_ymd_and_hms(2024, 7, 20, 23, 59, 59).unwrap()));
    }

    #[test]
    fn test_day_window_boundaries() {
        let w = TimeWindow::for_day(NaiveDate::from_ymd_opt(2024, 7, 20).unwrap());
        assert!(w.contains(Utc.with_ymd_and_hms(2024, 7, 20, 0, 0, 0).unwrap()));
        assert!(w.contains(Utc.with_ymd_and_hms(2024, 7, 20, 23, 59, 59).unwrap()));
        assert!(!w.contains(Utc.with_ymd_and_hms(2024, 7, 21, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_in_window_boundaries_inclusive() {
        let w = TimeWindow::rolling(now(), 1);
        assert!(in_window(&record(Some(w.start)), &w));
        assert!(in_window(&record(Some(w.end)), &w));
        assert!(!in_window(&record(Some(w.start - Duration::seconds(1))), &w));
        assert!(!in_window(&record(Some(w.end + Duration::seconds(1))), &w));
    }

    #[test]
    fn test_undated_record_rejected() {
        let w = TimeWindow::rolling(now(), 1);
        assert!(!in_window(&record(None), &w));
        assert!(!is_relevant(
            &record(None),
            &w,
            &["LocalLLaMA".to_string()]
        ));
    }

    #[test]
    fn test_three_of_five_posts_admitted() {
        // days_back=1: three posts dated today pass, two dated three days
        // ago do not.
        let w = TimeWindow::rolling(now(), 1);
        let today = Utc.with_ymd_and_hms(2024, 7, 21, 9, 0, 0).unwrap();
        let stale = Utc.with_ymd_and_hms(2024, 7, 18, 9, 0, 0).unwrap();
        let terms = vec!["LocalLLaMA".to_string()];

        let posts = [
            record(Some(today)),
            record(Some(today)),
            record(Some(today)),
            record(Some(stale)),
            record(Some(stale)),
        ];
        let admitted = posts.iter().filter(|r| is_relevant(r, &w, &terms)).count();
        assert_eq!(admitted, 3);
    }

    #[test]
    fn test_exact_channel_match_is_case_insensitive() {
        let r = record(Some(now()));
        assert!(matches_terms(&r, &["localllama".to_string()]));
        assert!(!matches_terms(&r, &["MachineLearning".to_string()]));
    }

    #[test]
    fn test_substring_match_over_title_and_snippet() {
        let r = record(Some(now()));
        assert!(matches_terms(&r, &["local llm".to_string()]));
        assert!(matches_terms(&r, &["Quantization".to_string()]));
        assert!(!matches_terms(&r, &["diffusion".to_string()]));
    }

    #[test]
    fn test_empty_term_never_matches() {
        let r = record(Some(now()));
        assert!(!matches_terms(&r, &["".to_string()]));
    }
}
