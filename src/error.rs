//! Error taxonomy for the pipeline.
//!
//! Three layers, matching the three failure boundaries:
//! - [`ConfigError`]: rejected before any network or database I/O; aborts
//!   the run with a nonzero exit.
//! - [`SourceError`]: raised inside one adapter. Every variant means the
//!   same thing to the aggregator — that source is unavailable this run —
//!   and is caught and logged without touching the other adapters.
//! - [`StoreError`]: database failures. [`StoreError::DuplicateKey`] is the
//!   backstop behind the dedup gate and is treated as a no-op at insert
//!   time.

use crate::models::SourceKind;
use thiserror::Error;

/// Invalid run configuration, detected before any fetch starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("days_back must be zero or greater, got {0}")]
    NegativeDaysBack(i64),

    #[error("{0} must not be empty")]
    EmptyList(&'static str),

    #[error("database path must not be empty")]
    EmptyDbPath,
}

/// A source could not be fetched this run.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webdriver session could not be established: {0}")]
    Session(#[from] fantoccini::error::NewSessionError),

    #[error("webdriver command failed: {0}")]
    Browser(#[from] fantoccini::error::CmdError),

    #[error("missing credentials: {0}")]
    MissingCredentials(&'static str),

    #[error("unexpected payload shape: {0}")]
    UnexpectedShape(String),

    #[error("fetch exceeded the {0}s timeout")]
    TimedOut(u64),
}

/// A database operation failed.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The natural-key constraint rejected an insert. The record is already
    /// present, so callers downgrade this to a no-op.
    #[error("duplicate record {natural_id} in {}", .kind.table())]
    DuplicateKey { kind: SourceKind, natural_id: String },

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}
