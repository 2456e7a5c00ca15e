//! Markdown digest rendering.
//!
//! [`render_digest`] is a pure transform from the day's admitted records to
//! the report text: one section per source in fixed order, newest items
//! first inside each section. [`write_digest`] picks the dated file name
//! (suffixing `_01`, `_02`, ... when the name is already taken) and writes
//! the document.

use crate::models::{NewsRecord, SourceKind};
use chrono::NaiveDate;
use std::error::Error;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

/// Render the digest document for `date` from the run's records.
///
/// Records are grouped by source kind; the incoming order does not matter
/// because every section is re-sorted by publish timestamp, newest first,
/// so the output is deterministic regardless of fetch or insert order.
pub fn render_digest(date: NaiveDate, records: &[NewsRecord]) -> String {
    let mut out = String::new();
    writeln!(out, "# AI News Summary - {date}").unwrap();

    for kind in SourceKind::ALL {
        let mut section: Vec<&NewsRecord> = records.iter().filter(|r| r.kind == kind).collect();
        section.sort_by(|a, b| b.published_at.cmp(&a.published_at));

        writeln!(out, "\n## {}", kind.heading()).unwrap();
        if section.is_empty() {
            writeln!(out, "\n_No items today._").unwrap();
            continue;
        }

        for record in section {
            writeln!(out, "\n- [{}]({})", record.title, record.url).unwrap();
            render_details(&mut out, record);
        }
    }

    out
}

/// The per-source detail lines under each bullet.
fn render_details(out: &mut String, record: &NewsRecord) {
    let date = record
        .published_at
        .map(|t| t.date_naive().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    match record.kind {
        SourceKind::Techcrunch => {
            let author = record.author.as_deref().unwrap_or("unknown");
            writeln!(out, "  - Author: {author}").unwrap();
            writeln!(out, "  - Date: {date}").unwrap();
            writeln!(out, "  - Excerpt: {}", record.snippet).unwrap();
        }
        SourceKind::Youtube => {
            let channel = record.author.as_deref().unwrap_or("unknown");
            let topic = record.channel_or_topic().unwrap_or("unknown");
            writeln!(out, "  - Channel: {channel}").unwrap();
            writeln!(out, "  - Topic: {topic}").unwrap();
            writeln!(out, "  - Published: {date}").unwrap();
        }
        SourceKind::Reddit => {
            let subreddit = record.channel_or_topic().unwrap_or("unknown");
            let author = record.author.as_deref().unwrap_or("[deleted]");
            let score = record.extra.get("score").and_then(|v| v.as_i64()).unwrap_or(0);
            let comments = record
                .extra
                .get("num_comments")
                .and_then(|v| v.as_i64())
                .unwrap_or(0);
            writeln!(out, "  - Subreddit: r/{subreddit}").unwrap();
            writeln!(out, "  - Author: u/{author}").unwrap();
            writeln!(out, "  - Score: {score}").unwrap();
            writeln!(out, "  - Comments: {comments}").unwrap();
            writeln!(out, "  - Date: {date}").unwrap();
        }
        SourceKind::Medium => {
            let topic = record.channel_or_topic().unwrap_or("unknown");
            writeln!(out, "  - Topic: {topic}").unwrap();
            writeln!(out, "  - Date: {date}").unwrap();
            writeln!(out, "  - Excerpt: {}", record.snippet).unwrap();
            if let Some(img) = record.extra.get("image").and_then(|v| v.as_str()) {
                writeln!(out, "\n  ![Article Image]({img})").unwrap();
            }
        }
    }
}

/// First free digest path for `date` inside `dir`:
/// `AI_News_Summary_{date}.md`, then `AI_News_Summary_{date}_01.md`, ...
pub fn digest_path(dir: &Path, date: NaiveDate) -> PathBuf {
    let mut path = dir.join(format!("AI_News_Summary_{date}.md"));
    let mut ix = 0u32;
    while path.exists() {
        ix += 1;
        path = dir.join(format!("AI_News_Summary_{date}_{ix:02}.md"));
    }
    path
}

/// Write the rendered digest under `dir` and return the path used.
#[instrument(level = "info", skip_all, fields(dir = %dir.display(), %date))]
pub async fn write_digest(
    dir: &Path,
    date: NaiveDate,
    content: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    fs::create_dir_all(dir).await?;
    let path = digest_path(dir, date);
    fs::write(&path, content).await?;
    info!(path = %path.display(), "Wrote digest");
    Ok(path)
}
