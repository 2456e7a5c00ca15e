//! Utility functions for age-label parsing, string truncation, and file
//! system checks.
//!
//! The scraped sources do not publish machine-readable dates on their
//! listing pages; they label items with relative ages like "2 hours ago" or
//! "3d ago". The helpers here turn those labels into concrete dates.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::info;

/// "3 days ago" / "1 day ago" style labels (TechCrunch).
static LONG_AGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s*days?\s+ago").unwrap());

/// "3d ago" / "12h ago" style labels (Medium).
static SHORT_AGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d{1,2})([hd])\s+ago").unwrap());

/// Convert a relative age label to a number of days ago.
///
/// Hour-granularity labels ("just now", "5h ago", "2 hours ago") all mean
/// today. Returns `None` for anything that is not recognizably an age
/// label; callers treat that as "no publish date".
pub fn days_ago_from_label(label: &str) -> Option<i64> {
    let label = label.trim().to_lowercase();
    if label == "just now" || label.contains("hour") {
        return Some(0);
    }
    if let Some(caps) = LONG_AGE.captures(&label) {
        return caps[1].parse().ok();
    }
    if let Some(caps) = SHORT_AGE.captures(&label) {
        let n: i64 = caps[1].parse().ok()?;
        return match &caps[2] {
            "h" => Some(0),
            _ => Some(n),
        };
    }
    None
}

/// Midnight UTC `days` days before `now`. The scraped listings only expose
/// day-granularity ages, so their publish timestamps are pinned to the
/// start of the day.
pub fn midnight_days_ago(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    (now.date_naive() - chrono::Duration::days(days))
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` bytes with an ellipsis and byte
/// count indicator appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        let mut cut = max;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if it doesn't exist, then performs a write test by
/// creating and immediately deleting a probe file.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or is not writable
/// (permission denied, read-only filesystem, etc.).
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(path).await {
        return Err(Box::new(e));
    }
    // Try a small sync write using std fs (simpler error surface)
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}
