//! # AI News Digest
//!
//! An aggregation pipeline that collects AI-related news from four
//! heterogeneous sources, persists the relevant items to a SQLite store
//! without duplicates, and renders a daily Markdown digest.
//!
//! ## Sources
//!
//! - Reddit: paged listing API over a configurable set of subreddits
//! - YouTube: keyword search API over a configurable set of topics
//! - TechCrunch: HTML scraping of the AI category listing
//! - Medium: browser-driven scroll-and-parse over tag archives
//!
//! ## Architecture
//!
//! The application runs one pass per invocation:
//! 1. **Fetch**: each source adapter produces normalized records
//! 2. **Filter**: time window + topic relevance, applied uniformly
//! 3. **Dedup + persist**: check-then-insert against the per-source table
//! 4. **Digest**: re-read the window from the store and write the report
//!
//! A failing source never aborts the run; the exit code is nonzero only
//! when the configuration is invalid or the store cannot be opened.

use chrono::Utc;
use clap::Parser;
use std::error::Error;
use std::path::Path;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod aggregator;
mod cli;
mod config;
mod error;
mod filter;
mod models;
mod net;
mod outputs;
mod sources;
mod store;
mod utils;

use aggregator::Aggregator;
use cli::Cli;
use config::RunConfig;
use filter::TimeWindow;
use models::SourceKind;
use sources::NewsSource;
use sources::medium::MediumSource;
use sources::reddit::RedditSource;
use sources::techcrunch::TechcrunchSource;
use sources::youtube::YoutubeSource;
use store::Store;
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("ai_news_digest starting up");

    // Credentials usually live in a .env file next to the binary.
    dotenvy::dotenv().ok();

    // Parse CLI and validate the run configuration before any I/O.
    let args = Cli::parse();
    let config = match RunConfig::from_cli(&args) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };

    // The store must open; everything else is recoverable.
    let store = match Store::open(&config.db_path) {
        Ok(store) => store,
        Err(e) => {
            error!(db_path = %config.db_path, error = %e, "Cannot open the news store");
            return Err(e.into());
        }
    };

    // Early check: a broken digest directory should show up in the log now,
    // not after twenty minutes of fetching.
    if let Err(e) = ensure_writable_dir(&config.digest_dir).await {
        warn!(
            path = %config.digest_dir,
            error = %e,
            "Digest directory is not writable; the digest write will be skipped"
        );
    }

    let now = Utc::now();
    let window = TimeWindow::from_config(&config, now);
    info!(start = %window.start, end = %window.end, "Admission window");

    // ---- Assemble the source adapters ----
    let http = net::http_client(30);
    let mut sources_list: Vec<Box<dyn NewsSource>> = Vec::new();

    match RedditSource::new(
        config.reddit_channels.clone(),
        args.reddit_client_id.clone(),
        args.reddit_client_secret.clone(),
        args.reddit_user_agent.clone(),
        http.clone(),
    ) {
        Ok(source) => sources_list.push(Box::new(source)),
        Err(e) => warn!(source = "reddit", error = %e, "Source unavailable; continuing without it"),
    }

    match YoutubeSource::new(
        config.youtube_topics.clone(),
        args.youtube_api_key.clone(),
        http.clone(),
    ) {
        Ok(source) => sources_list.push(Box::new(source)),
        Err(e) => warn!(source = "youtube", error = %e, "Source unavailable; continuing without it"),
    }

    sources_list.push(Box::new(TechcrunchSource::new(http.clone())));
    sources_list.push(Box::new(MediumSource::new(
        config.medium_topics.clone(),
        config.webdriver_url.clone(),
    )));

    // ---- Fetch, filter, dedup, persist ----
    let aggregator = Aggregator::new(&store, &config);
    let summary = aggregator.run(&sources_list, &window).await;

    for (kind, admitted, skipped) in &summary.per_source {
        info!(source = %kind, admitted, skipped, "Source summary");
    }
    for (kind, reason) in &summary.failures {
        warn!(source = %kind, %reason, "Source contributed nothing this run");
    }

    // ---- Render the digest from what the store now holds ----
    let digest_date = config.target_date.unwrap_or_else(|| now.date_naive());
    let mut day_records = Vec::new();
    for kind in SourceKind::ALL {
        match store.query_range(kind, window.start, window.end) {
            Ok(records) => day_records.extend(records),
            Err(e) => error!(source = %kind, error = %e, "Query failed; section will be empty"),
        }
    }

    let digest = outputs::markdown::render_digest(digest_date, &day_records);
    match outputs::markdown::write_digest(Path::new(&config.digest_dir), digest_date, &digest).await
    {
        Ok(path) => info!(path = %path.display(), items = day_records.len(), "Digest written"),
        Err(e) => error!(error = %e, "Failed writing the digest; stored records are unaffected"),
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        admitted = summary.admitted(),
        source_failures = summary.failures.len(),
        "Execution complete"
    );

    Ok(())
}
