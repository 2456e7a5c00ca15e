//! SQLite persistence, one table per source.
//!
//! The store is append-only: records are inserted exactly once, keyed by
//! their natural id, and never updated or deleted. `natural_id` is the
//! primary key of each table, so even if the aggregator's check-then-insert
//! were ever raced, the constraint turns the second insert into a
//! [`StoreError::DuplicateKey`] instead of a duplicate row.
//!
//! Timestamps are stored as RFC 3339 text with a trailing `Z`
//! (`2024-07-21T09:00:00Z`), which makes lexicographic comparison in SQL
//! identical to chronological comparison.

use crate::error::StoreError;
use crate::models::{NewsRecord, SourceKind};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, params};
use std::path::Path;
use tracing::{debug, info};

/// Handle to the SQLite database holding all four source tables.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) the database at `path` and ensure the schema exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        let store = Self { conn };
        store.ensure_schema()?;
        info!(path = %path.as_ref().display(), "Opened news store");
        Ok(store)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.ensure_schema()?;
        Ok(store)
    }

    /// Create the four per-source tables if they are missing. Idempotent.
    fn ensure_schema(&self) -> Result<(), StoreError> {
        for kind in SourceKind::ALL {
            // Table names come from SourceKind::table(), a closed set of
            // static strings, so formatting them into DDL is safe.
            self.conn.execute(
                &format!(
                    "CREATE TABLE IF NOT EXISTS {} (
                        natural_id   TEXT PRIMARY KEY,
                        title        TEXT NOT NULL,
                        author       TEXT,
                        url          TEXT NOT NULL,
                        published_at TEXT,
                        fetched_at   TEXT NOT NULL,
                        snippet      TEXT NOT NULL,
                        extra        TEXT NOT NULL
                    )",
                    kind.table()
                ),
                [],
            )?;
        }
        Ok(())
    }

    /// Whether a record with this natural id is already persisted.
    pub fn exists(&self, kind: SourceKind, natural_id: &str) -> Result<bool, StoreError> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT 1 FROM {} WHERE natural_id = ?1",
            kind.table()
        ))?;
        Ok(stmt.exists(params![natural_id])?)
    }

    /// Insert a record into its source table.
    ///
    /// # Errors
    ///
    /// [`StoreError::DuplicateKey`] when the natural id is already present;
    /// callers treat that as "already persisted" and move on.
    pub fn insert(&self, record: &NewsRecord) -> Result<(), StoreError> {
        let result = self.conn.execute(
            &format!(
                "INSERT INTO {} (natural_id, title, author, url, published_at, fetched_at, snippet, extra)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                record.kind.table()
            ),
            params![
                record.natural_id,
                record.title,
                record.author,
                record.url,
                record.published_at.map(to_stored),
                to_stored(record.fetched_at),
                record.snippet,
                record.extra.to_string(),
            ],
        );

        match result {
            Ok(_) => {
                debug!(kind = %record.kind, natural_id = %record.natural_id, "Inserted record");
                Ok(())
            }
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::DuplicateKey {
                    kind: record.kind,
                    natural_id: record.natural_id.clone(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// All records of `kind` published inside `[start, end]`, newest first.
    ///
    /// Undated rows (NULL `published_at`) never match a range; the pipeline
    /// never persists them anyway because the filter rejects undated
    /// records.
    pub fn query_range(
        &self,
        kind: SourceKind,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<NewsRecord>, StoreError> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT natural_id, title, author, url, published_at, fetched_at, snippet, extra
             FROM {}
             WHERE published_at IS NOT NULL AND published_at >= ?1 AND published_at <= ?2
             ORDER BY published_at DESC",
            kind.table()
        ))?;

        let rows = stmt.query_map(params![to_stored(start), to_stored(end)], |row| {
            Ok(NewsRecord {
                kind,
                natural_id: row.get(0)?,
                title: row.get(1)?,
                author: row.get(2)?,
                url: row.get(3)?,
                published_at: row.get::<_, Option<String>>(4)?.map(|s| from_stored(&s)),
                fetched_at: from_stored(&row.get::<_, String>(5)?),
                snippet: row.get(6)?,
                extra: serde_json::from_str(&row.get::<_, String>(7)?)
                    .unwrap_or(serde_json::Value::Null),
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Row count of one source table.
    pub fn count(&self, kind: SourceKind) -> Result<u64, StoreError> {
        let count: u64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", kind.table()),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn to_stored(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn from_stored(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn record(id: &str, published_at: DateTime<Utc>) -> NewsRecord {
        NewsRecord {
            kind: SourceKind::Reddit,
            natural_id: id.to_string(),
            title: format!("post {id}"),
            author: Some("author".to_string()),
            url: format!("https://www.reddit.com/comments/{id}/"),
            published_at: Some(published_at),
            fetched_at: Utc.with_ymd_and_hms(2024, 7, 21, 23, 50, 0).unwrap(),
            snippet: "body".to_string(),
            extra: json!({"subreddit": "LocalLLaMA", "score": 42}),
        }
    }

    fn ts(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 21, h, 0, 0).unwrap()
    }

    #[test]
    fn test_schema_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        store.ensure_schema().unwrap();
        store.ensure_schema().unwrap();
        assert_eq!(store.count(SourceKind::Reddit).unwrap(), 0);
    }

    #[test]
    fn test_insert_then_exists() {
        let store = Store::open_in_memory().unwrap();
        assert!(!store.exists(SourceKind::Reddit, "1abcd").unwrap());
        store.insert(&record("1abcd", ts(9))).unwrap();
        assert!(store.exists(SourceKind::Reddit, "1abcd").unwrap());
        // Same id in a different table is a different record.
        assert!(!store.exists(SourceKind::Medium, "1abcd").unwrap());
    }

    #[test]
    fn test_duplicate_insert_is_rejected_first_wins() {
        let store = Store::open_in_memory().unwrap();
        store.insert(&record("1abcd", ts(9))).unwrap();

        // Same natural id, different fields: the first row must survive.
        let mut second = record("1abcd", ts(10));
        second.title = "changed title".to_string();
        let err = store.insert(&second).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { .. }));

        let rows = store
            .query_range(SourceKind::Reddit, ts(0), ts(23))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].title, "post 1abcd");
    }

    #[test]
    fn test_query_range_sorted_and_bounded() {
        let store = Store::open_in_memory().unwrap();
        store.insert(&record("a", ts(8))).unwrap();
        store.insert(&record("b", ts(12))).unwrap();
        store.insert(&record("c", ts(20))).unwrap();

        let rows = store
            .query_range(SourceKind::Reddit, ts(8), ts(12))
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].natural_id, "b"); // newest first
        assert_eq!(rows[1].natural_id, "a");
    }

    #[test]
    fn test_round_trip_preserves_fields() {
        let store = Store::open_in_memory().unwrap();
        let original = record("1abcd", ts(9));
        store.insert(&original).unwrap();

        let rows = store
            .query_range(SourceKind::Reddit, ts(0), ts(23))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0], original);
    }

    #[test]
    fn test_count_per_table() {
        let store = Store::open_in_memory().unwrap();
        store.insert(&record("a", ts(8))).unwrap();
        store.insert(&record("b", ts(9))).unwrap();
        assert_eq!(store.count(SourceKind::Reddit).unwrap(), 2);
        assert_eq!(store.count(SourceKind::Youtube).unwrap(), 0);
    }
}
