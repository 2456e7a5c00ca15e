//! Run configuration.
//!
//! A [`RunConfig`] is built once from the CLI arguments (plus environment
//! fallbacks), validated before any network or database I/O, and then passed
//! read-only to the aggregator. There is no process-wide configuration
//! state.
//!
//! The default topic and channel lists mirror the ones this pipeline has
//! always tracked; every list can be overridden from the command line.

use crate::cli::Cli;
use crate::error::ConfigError;
use crate::models::SourceKind;
use chrono::NaiveDate;

/// Subreddits the forum adapter walks by default.
pub const DEFAULT_REDDIT_CHANNELS: &[&str] =
    &["LocalLLaMA", "GPT3", "MachineLearning", "MistralAI", "OpenAI"];

/// Search terms the video adapter queries by default.
pub const DEFAULT_YOUTUBE_TOPICS: &[&str] =
    &["large language models", "LLM", "AI tools", "LLM tutorials"];

/// Terms an article from the TechCrunch AI category must mention.
pub const DEFAULT_TECHCRUNCH_TOPICS: &[&str] =
    &["AI", "artificial intelligence", "LLM", "machine learning"];

/// Tag archives the dynamic-page adapter scrolls through by default.
pub const DEFAULT_MEDIUM_TOPICS: &[&str] = &["llm", "large-language-models"];

/// Additional tags that count as a topic match for Medium posts.
pub const DEFAULT_MEDIUM_RELATED_TAGS: &[&str] = &[
    "data-science",
    "prompt-engineering",
    "mathematical-reasoning",
    "nlp",
    "time-series",
    "text-generation",
    "artificial-intelligence",
    "ai",
];

/// Validated parameters for one pipeline run. Read-only once constructed.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Rolling window length in days. Ignored when `target_date` is set.
    pub days_back: i64,
    /// Single-day mode: only admit records published on this date.
    pub target_date: Option<NaiveDate>,
    /// Subreddits for the forum adapter; also the exact-match terms for
    /// Reddit relevance.
    pub reddit_channels: Vec<String>,
    /// Search terms for the video adapter.
    pub youtube_topics: Vec<String>,
    /// Terms a TechCrunch article must match.
    pub techcrunch_topics: Vec<String>,
    /// Tag archives the Medium adapter visits.
    pub medium_topics: Vec<String>,
    /// Tags that also count as a Medium topic match.
    pub medium_related_tags: Vec<String>,
    /// Path of the SQLite database file.
    pub db_path: String,
    /// Directory the digest Markdown file is written to.
    pub digest_dir: String,
    /// Hard ceiling on one adapter's whole fetch, in seconds.
    pub fetch_timeout_secs: u64,
    /// WebDriver endpoint the Medium adapter connects to.
    pub webdriver_url: String,
}

impl RunConfig {
    /// Build and validate a config from parsed CLI arguments.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when `days_back` is negative, a required term
    /// list is empty, or the database path is blank. Validation happens
    /// before any fetch so a bad invocation never touches the network.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        if cli.days_back < 0 {
            return Err(ConfigError::NegativeDaysBack(cli.days_back));
        }
        if cli.db_path.trim().is_empty() {
            return Err(ConfigError::EmptyDbPath);
        }

        let config = Self {
            days_back: cli.days_back,
            target_date: cli.date,
            reddit_channels: list_or_default(&cli.reddit_channels, DEFAULT_REDDIT_CHANNELS),
            youtube_topics: list_or_default(&cli.youtube_topics, DEFAULT_YOUTUBE_TOPICS),
            techcrunch_topics: list_or_default(&cli.techcrunch_topics, DEFAULT_TECHCRUNCH_TOPICS),
            medium_topics: list_or_default(&cli.medium_topics, DEFAULT_MEDIUM_TOPICS),
            medium_related_tags: DEFAULT_MEDIUM_RELATED_TAGS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            db_path: cli.db_path.clone(),
            digest_dir: cli.digest_dir.clone(),
            fetch_timeout_secs: cli.fetch_timeout_secs,
            webdriver_url: cli.webdriver_url.clone(),
        };

        if config.reddit_channels.is_empty() {
            return Err(ConfigError::EmptyList("reddit channels"));
        }
        if config.youtube_topics.is_empty() {
            return Err(ConfigError::EmptyList("youtube topics"));
        }
        if config.techcrunch_topics.is_empty() {
            return Err(ConfigError::EmptyList("techcrunch topics"));
        }
        if config.medium_topics.is_empty() {
            return Err(ConfigError::EmptyList("medium topics"));
        }

        Ok(config)
    }

    /// The terms a record of `kind` must match to be relevant.
    ///
    /// Reddit matches its channel list exactly; the other sources match
    /// their topic vocabulary. Medium's related tags count too, so a post
    /// found under one tag archive but labeled with a sibling tag is still
    /// admitted.
    pub fn terms_for(&self, kind: SourceKind) -> Vec<String> {
        match kind {
            SourceKind::Reddit => self.reddit_channels.clone(),
            SourceKind::Youtube => self.youtube_topics.clone(),
            SourceKind::Techcrunch => self.techcrunch_topics.clone(),
            SourceKind::Medium => {
                let mut terms = self.medium_topics.clone();
                terms.extend(self.medium_related_tags.iter().cloned());
                terms
            }
        }
    }
}

/// An explicit CLI list wins; an absent flag falls back to the default.
/// Blank entries from stray commas are dropped, so `--reddit-channels ""`
/// really does configure an empty list and fails validation.
fn list_or_default(given: &Option<Vec<String>>, default: &[&str]) -> Vec<String> {
    match given {
        Some(list) => list
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        None => default.iter().map(|s| s.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["ai_news_digest"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    #[test]
    fn test_defaults_validate() {
        let config = RunConfig::from_cli(&cli(&[])).unwrap();
        assert_eq!(config.days_back, 1);
        assert_eq!(config.reddit_channels.len(), 5);
        assert_eq!(config.db_path, "ai_news.db");
    }

    #[test]
    fn test_negative_days_back_rejected() {
        let err = RunConfig::from_cli(&cli(&["--days-back", "-1"])).unwrap_err();
        assert!(matches!(err, ConfigError::NegativeDaysBack(-1)));
    }

    #[test]
    fn test_blank_db_path_rejected() {
        let err = RunConfig::from_cli(&cli(&["--db-path", "  "])).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyDbPath));
    }

    #[test]
    fn test_list_override() {
        let config =
            RunConfig::from_cli(&cli(&["--reddit-channels", "rust,programming"])).unwrap();
        assert_eq!(config.reddit_channels, vec!["rust", "programming"]);
    }

    #[test]
    fn test_explicitly_empty_list_rejected() {
        let err = RunConfig::from_cli(&cli(&["--youtube-topics", ""])).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyList("youtube topics")));
    }

    #[test]
    fn test_medium_terms_include_related_tags() {
        let config = RunConfig::from_cli(&cli(&[])).unwrap();
        let terms = config.terms_for(SourceKind::Medium);
        assert!(terms.iter().any(|t| t == "llm"));
        assert!(terms.iter().any(|t| t == "prompt-engineering"));
    }

    #[test]
    fn test_single_day_mode() {
        let config = RunConfig::from_cli(&cli(&["--date", "2024-07-21"])).unwrap();
        assert_eq!(
            config.target_date,
            Some(NaiveDate::from_ymd_opt(2024, 7, 21).unwrap())
        );
    }
}
