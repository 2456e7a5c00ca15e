//! Command-line interface definitions.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Nothing is required: a bare invocation runs a one-day window with the
//! default topic lists and writes `ai_news.db` plus a digest under `news/`.
//! Credentials are usually supplied through the environment (or a `.env`
//! file) rather than flags.

use chrono::NaiveDate;
use clap::Parser;

/// Command-line arguments for the AI news digest pipeline.
///
/// # Examples
///
/// ```sh
/// # Default one-day run
/// ai_news_digest
///
/// # Three-day window into a scratch database
/// ai_news_digest --days-back 3 --db-path /tmp/ai_news.db
///
/// # Re-run a single day with custom subreddits
/// ai_news_digest --date 2024-07-21 --reddit-channels LocalLLaMA,OpenAI
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// How many days back the admission window reaches
    #[arg(long, default_value_t = 1, allow_hyphen_values = true)]
    pub days_back: i64,

    /// Run for this single date (YYYY-MM-DD) instead of a rolling window
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Path of the SQLite database file
    #[arg(long, env = "AI_NEWS_DB", default_value = "ai_news.db")]
    pub db_path: String,

    /// Output directory for the digest Markdown file
    #[arg(short = 'o', long, default_value = "news")]
    pub digest_dir: String,

    /// Subreddits to walk (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub reddit_channels: Option<Vec<String>>,

    /// YouTube search terms (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub youtube_topics: Option<Vec<String>>,

    /// Terms a TechCrunch article must mention (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub techcrunch_topics: Option<Vec<String>>,

    /// Medium tag archives to scroll (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub medium_topics: Option<Vec<String>>,

    /// Hard per-source fetch timeout in seconds
    #[arg(long, default_value_t = 300)]
    pub fetch_timeout_secs: u64,

    /// Reddit API client id
    #[arg(long, env = "REDDIT_CLIENT_ID", hide_env_values = true)]
    pub reddit_client_id: Option<String>,

    /// Reddit API client secret
    #[arg(long, env = "REDDIT_CLIENT_SECRET", hide_env_values = true)]
    pub reddit_client_secret: Option<String>,

    /// User agent string for the Reddit API
    #[arg(long, env = "REDDIT_USER_AGENT")]
    pub reddit_user_agent: Option<String>,

    /// YouTube Data API key
    #[arg(long, env = "YOUTUBE_API_KEY", hide_env_values = true)]
    pub youtube_api_key: Option<String>,

    /// WebDriver endpoint used for Medium scraping
    #[arg(long, env = "WEBDRIVER_URL", default_value = "http://localhost:9515")]
    pub webdriver_url: String,
}
