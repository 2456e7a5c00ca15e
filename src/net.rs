//! HTTP fetching with exponential backoff retry logic.
//!
//! The REST and static-HTML adapters all fetch text over HTTP; this module
//! gives them one retrying entry point instead of each rolling their own
//! loop.
//!
//! # Architecture
//!
//! The module uses a trait-based design for flexibility:
//! - [`GetText`]: core trait defining an async text fetch
//! - [`ClientFetcher`]: wraps a `reqwest::Client`
//! - [`RetryFetch`]: decorator that adds retry logic to any `GetText`
//!   implementation
//!
//! # Retry Strategy
//!
//! - Maximum 3 retry attempts
//! - Exponential backoff starting at 1 second
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd

use crate::error::SourceError;
use rand::{Rng, rng};
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, instrument, warn};

/// User agent sent with every scraping request. Some listing pages refuse
/// the default reqwest agent outright.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Trait for async text-over-HTTP fetching.
///
/// Implementors take a URL and return the response body as text. The
/// abstraction exists so decorators (like retry logic) compose over any
/// underlying client.
pub trait GetText {
    /// Fetch `url` and return the body text.
    ///
    /// Non-2xx statuses are errors; adapters never want to parse an error
    /// page as a payload.
    async fn get_text(&self, url: &str) -> Result<String, SourceError>;
}

/// Wrapper that adds exponential backoff retry logic to any [`GetText`]
/// implementation.
///
/// # Backoff Strategy
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryFetch<T> {
    inner: T,
    max_retries: usize,
    base_delay: StdDuration,
    max_delay: StdDuration,
}

impl<T> RetryFetch<T>
where
    T: GetText,
{
    /// Wrap `inner` with up to `max_retries` retries starting at
    /// `base_delay`.
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryFetch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryFetch")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> GetText for RetryFetch<T>
where
    T: GetText,
{
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn get_text(&self, url: &str) -> Result<String, SourceError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            match self.inner.get_text(url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_total = total_t0.elapsed().as_millis() as u128,
                            error = %e,
                            "get_text() exhausted retries"
                        );
                        return Err(e);
                    }

                    // backoff calc
                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        ?delay,
                        error = %e,
                        "get_text() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// [`GetText`] over a plain `reqwest::Client`.
#[derive(Debug)]
pub struct ClientFetcher {
    client: reqwest::Client,
}

impl ClientFetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl GetText for ClientFetcher {
    async fn get_text(&self, url: &str) -> Result<String, SourceError> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

/// Build the shared HTTP client the adapters use.
///
/// The per-request timeout here is the transport guard; the aggregator's
/// per-source timeout bounds a whole fetch.
pub fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .user_agent(BROWSER_USER_AGENT)
        .timeout(StdDuration::from_secs(timeout_secs))
        .build()
        .expect("reqwest client construction only fails on invalid builder options")
}

/// Fetch `url` as text with the standard retry policy.
pub async fn get_text_with_backoff(
    client: &reqwest::Client,
    url: &str,
) -> Result<String, SourceError> {
    let fetcher = RetryFetch::new(
        ClientFetcher::new(client.clone()),
        3,
        StdDuration::from_secs(1),
    );
    fetcher.get_text(url).await
}
