//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the HTTP client with a browser-like header set
//! - Rotating the User-Agent per request
//! - Pacing before every attempt
//! - Retry logic for transient failures
//! - Rate-limit (HTTP 429) waits with their own budget
//! - Rejecting pages that lack every record marker
//!
//! # Retry Logic
//!
//! | Condition                                | Action                                  |
//! |------------------------------------------|-----------------------------------------|
//! | HTTP 429                                 | Wait (Retry-After or default), retry    |
//! | HTTP 5xx / 408                           | Retry up to `max_retries`, fixed delay  |
//! | Timeout, connect or body read failure    | Retry up to `max_retries`, fixed delay  |
//! | 2xx without any record marker            | Retry up to `max_retries`, fixed delay  |
//! | Any other non-2xx (401, 403, 404, ...)   | Fail immediately                        |

use crate::config::{Config, FetchConfig};
use crate::crawler::extractor::EntityExtractor;
use crate::crawler::pacing::Pacer;
use crate::model::RawPage;
use crate::state::SkipCause;
use chrono::{DateTime, Utc};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Terminal failure of a single page fetch
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection failed for {url}: {message}")]
    Connect { url: String, message: String },

    #[error("Server error {status} for {url}")]
    ServerError { url: String, status: u16 },

    #[error("Failed to read body of {url}: {message}")]
    Body { url: String, message: String },

    #[error("Incomplete content from {url}: no record marker found")]
    Incomplete { url: String },

    #[error("HTTP {status} for {url}")]
    Permanent { url: String, status: u16 },

    #[error("Rate limited on {url} after {waits} waits totalling {waited:?}")]
    RateLimited {
        url: String,
        waits: u32,
        waited: Duration,
    },

    #[error("Gave up on {url} after {attempts} attempts: {last}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last: Box<FetchError>,
    },

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },
}

impl FetchError {
    /// Returns true if another attempt at the same request might succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::Connect { .. }
                | Self::ServerError { .. }
                | Self::Body { .. }
                | Self::Incomplete { .. }
                | Self::Http { .. }
        )
    }

    /// Maps a terminal error to the reason its page is skipped
    pub fn skip_cause(&self) -> SkipCause {
        match self {
            Self::RateLimited { .. } => SkipCause::RateLimited,
            Self::Permanent { .. } => SkipCause::Permanent,
            _ => SkipCause::RetriesExhausted,
        }
    }
}

/// Bookkeeping for one logical request, discarded once it resolves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryState {
    /// Attempts counted against the transient budget (rate-limited ones excluded)
    pub attempt_count: u32,

    /// Delay before the next transient retry
    pub next_delay: Duration,

    /// Rate-limit waits taken so far
    pub rate_limit_waits: u32,

    /// Sum of rate-limit waits taken so far
    pub rate_limit_waited: Duration,
}

impl RetryState {
    pub fn new(retry_delay: Duration) -> Self {
        Self {
            attempt_count: 0,
            next_delay: retry_delay,
            rate_limit_waits: 0,
            rate_limit_waited: Duration::ZERO,
        }
    }

    /// Returns true if one more wait of `wait` stays within both rate-limit caps
    pub fn can_wait(&self, wait: Duration, config: &FetchConfig) -> bool {
        self.rate_limit_waits < config.rate_limit_max_waits
            && self
                .rate_limit_waited
                .checked_add(wait)
                .map_or(false, |total| total <= config.rate_limit_max_total_wait())
    }

    pub fn record_rate_limit(&mut self, wait: Duration) {
        self.rate_limit_waits += 1;
        self.rate_limit_waited = self.rate_limit_waited.saturating_add(wait);
    }
}

/// Classified result of a single HTTP exchange
#[derive(Debug)]
enum Attempt {
    Success(String),
    RateLimited(Option<Duration>),
    Failed(FetchError),
}

/// Builds the HTTP client shared by every request of a run
///
/// The User-Agent and Referer are set per request; everything else a browser
/// would send is installed here as default headers. Compression is negotiated
/// by reqwest itself so that responses are decoded transparently.
pub fn build_http_client(config: &FetchConfig) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    match HeaderValue::from_str(&config.accept_language) {
        Ok(value) => {
            headers.insert(header::ACCEPT_LANGUAGE, value);
        }
        Err(_) => tracing::warn!(
            "Not sending Accept-Language: {:?} is not a valid header value",
            config.accept_language
        ),
    }
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(header::DNT, HeaderValue::from_static("1"));
    headers.insert(
        header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );
    headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("same-origin"));
    headers.insert("sec-fetch-user", HeaderValue::from_static("?1"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));

    Client::builder()
        .default_headers(headers)
        .timeout(config.timeout())
        .connect_timeout(config.timeout())
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .build()
}

/// Parses a `Retry-After` value given as delta-seconds or an HTTP-date
///
/// Dates in the past yield a zero wait. Returns `None` for anything else.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let at = DateTime::parse_from_rfc2822(value).ok()?;
    let delta = at.with_timezone(&Utc) - now;
    Some(delta.to_std().unwrap_or(Duration::ZERO))
}

/// Paced, retrying HTTP GET for listing pages
#[derive(Debug, Clone)]
pub struct FetchClient {
    client: Client,
    config: FetchConfig,
    referer: String,
    pacer: Pacer,
    validator: EntityExtractor,
}

impl FetchClient {
    /// Creates a fetch client from the run configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &Config, validator: EntityExtractor) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(&config.fetch)?,
            config: config.fetch.clone(),
            referer: config.site.referer.clone(),
            pacer: Pacer::from_config(&config.fetch),
            validator,
        })
    }

    fn pick_user_agent(&self) -> &str {
        let agents = &self.config.user_agents;
        if agents.is_empty() {
            return "";
        }
        &agents[fastrand::usize(..agents.len())]
    }

    /// Fetches one page, retrying until it succeeds or fails terminally
    ///
    /// A pacing delay precedes every attempt, including retries and
    /// rate-limited re-attempts.
    ///
    /// # Errors
    ///
    /// - `FetchError::RetriesExhausted` once every transient attempt failed
    /// - `FetchError::RateLimited` when the next 429 wait would break a cap
    /// - `FetchError::Permanent` for non-retryable HTTP statuses
    pub async fn fetch(&self, url: &Url) -> Result<RawPage, FetchError> {
        let mut state = RetryState::new(self.config.retry_delay());

        loop {
            self.pacer.pause().await;
            tracing::debug!(
                "GET {} (attempt {}/{})",
                url,
                state.attempt_count + 1,
                self.config.max_retries
            );

            match self.attempt(url).await {
                Attempt::Success(content) => {
                    state.attempt_count += 1;
                    return Ok(RawPage {
                        content,
                        fetched_at: Utc::now(),
                        attempts: state.attempt_count,
                        rate_limit_waits: state.rate_limit_waits,
                    });
                }

                Attempt::RateLimited(suggested) => {
                    let wait = suggested.unwrap_or_else(|| self.config.rate_limit_default_wait());
                    if !state.can_wait(wait, &self.config) {
                        return Err(FetchError::RateLimited {
                            url: url.to_string(),
                            waits: state.rate_limit_waits,
                            waited: state.rate_limit_waited,
                        });
                    }

                    tracing::warn!("Rate limited on {}, waiting {:?}", url, wait);
                    state.record_rate_limit(wait);
                    tokio::time::sleep(wait).await;
                }

                Attempt::Failed(error) if !error.is_transient() => {
                    tracing::warn!("{}", error);
                    return Err(error);
                }

                Attempt::Failed(error) => {
                    state.attempt_count += 1;
                    tracing::warn!(
                        "Attempt {}/{} failed: {}",
                        state.attempt_count,
                        self.config.max_retries,
                        error
                    );

                    if state.attempt_count >= self.config.max_retries {
                        return Err(FetchError::RetriesExhausted {
                            url: url.to_string(),
                            attempts: state.attempt_count,
                            last: Box::new(error),
                        });
                    }

                    tokio::time::sleep(state.next_delay).await;
                }
            }
        }
    }

    async fn attempt(&self, url: &Url) -> Attempt {
        let request = self
            .client
            .get(url.clone())
            .header(header::USER_AGENT, self.pick_user_agent())
            .header(header::REFERER, self.referer.as_str());

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return Attempt::Failed(classify_request_error(url, e)),
        };

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let suggested = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| parse_retry_after(value, Utc::now()));
            return Attempt::RateLimited(suggested);
        }

        if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT {
            return Attempt::Failed(FetchError::ServerError {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        if !status.is_success() {
            return Attempt::Failed(FetchError::Permanent {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content = match response.text().await {
            Ok(content) => content,
            Err(e) if e.is_timeout() => {
                return Attempt::Failed(FetchError::Timeout {
                    url: url.to_string(),
                })
            }
            Err(e) => {
                return Attempt::Failed(FetchError::Body {
                    url: url.to_string(),
                    message: e.to_string(),
                })
            }
        };

        if !self.validator.has_structural_marker(&content) {
            return Attempt::Failed(FetchError::Incomplete {
                url: url.to_string(),
            });
        }

        Attempt::Success(content)
    }
}

fn classify_request_error(url: &Url, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        FetchError::Connect {
            url: url.to_string(),
            message: error.to_string(),
        }
    } else {
        FetchError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}
