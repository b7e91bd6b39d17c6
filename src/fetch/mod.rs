//! Category fetching: one request per tracked category, classified into a
//! closed outcome type.
//!
//! The upstream catalog is known to answer scraping clients with an HTML or
//! CAPTCHA page under a 200 status, so status-code checks alone cannot detect
//! blocking. Block detection is content-type sniffing: anything that does not
//! declare JSON is treated as [`FetchOutcome::Blocked`].
//!
//! # Architecture
//!
//! - [`FetchOutcome`] - Tagged result of one category fetch
//! - [`CategoryFetcher`] - Async trait the orchestrator depends on, so runs
//!   are testable with fake transports
//! - [`HttpFetcher`] - The real implementation over [`HttpSession`] with
//!   bounded retries from [`RetryPolicy`]
//!
//! Expected failure modes (network faults, blocking, malformed payloads)
//! never surface as `Err` or panics; they are values the orchestrator
//! handles exhaustively.

mod client;
mod retry;

pub use client::{BROWSER_USER_AGENT, DEFAULT_TIMEOUT_SECS, HttpSession};
pub use retry::{DEFAULT_MAX_ATTEMPTS, RetryDecision, RetryPolicy};

use async_trait::async_trait;
use reqwest::Response;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::{debug, warn};

/// How many characters of a blocked response body to keep as a diagnostic.
const BLOCK_PREVIEW_CHARS: usize = 300;

/// Result of fetching one category listing.
///
/// Consumed immediately by the pipeline; never persisted.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Upstream returned a JSON array of raw, un-validated items.
    Ok(Vec<Value>),

    /// Upstream returned a non-JSON body (HTML/CAPTCHA anti-scraping page).
    Blocked {
        /// First ~300 characters of the body, for diagnostics.
        preview: String,
    },

    /// Network-level failure (DNS, connection reset, timeout), after the
    /// retry budget was spent.
    TransportError {
        /// Description of the underlying fault.
        cause: String,
    },

    /// Body claimed to be JSON but failed to decode as an item array.
    DecodeError {
        /// Description of the decode failure.
        cause: String,
    },
}

impl FetchOutcome {
    /// Creates a `Blocked` outcome, truncating the body to the preview size.
    #[must_use]
    pub fn blocked(body: &str) -> Self {
        Self::Blocked {
            preview: body.chars().take(BLOCK_PREVIEW_CHARS).collect(),
        }
    }

    /// Creates a `TransportError` outcome.
    #[must_use]
    pub fn transport_error(cause: impl Into<String>) -> Self {
        Self::TransportError {
            cause: cause.into(),
        }
    }

    /// Creates a `DecodeError` outcome.
    #[must_use]
    pub fn decode_error(cause: impl Into<String>) -> Self {
        Self::DecodeError {
            cause: cause.into(),
        }
    }
}

/// Fetches one category's raw item listing.
///
/// # Object Safety
///
/// This trait uses `async_trait` to support dynamic dispatch via
/// `Box<dyn CategoryFetcher>`. Rust 2024 native async traits are not
/// object-safe, so `async_trait` is required for the pipeline seam.
#[async_trait]
pub trait CategoryFetcher: Send + Sync {
    /// Fetches the listing for `category` from `url` and classifies the
    /// response. Must not return transport/blocking/decoding failures as
    /// panics or `Err`; they are [`FetchOutcome`] variants.
    async fn fetch(&self, category: &str, url: &str) -> FetchOutcome;
}

/// HTTP-backed [`CategoryFetcher`] with bounded retries.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    session: HttpSession,
    policy: RetryPolicy,
}

impl HttpFetcher {
    /// Creates a fetcher over an existing session.
    #[must_use]
    pub fn new(session: HttpSession, policy: RetryPolicy) -> Self {
        Self { session, policy }
    }

    /// Issues the GET, retrying transient statuses and transport faults
    /// within the policy budget. Returns the final response, or the reason
    /// the budget was exhausted.
    async fn get_with_retries(&self, category: &str, target: &str) -> Result<Response, String> {
        let mut attempt: u32 = 1;
        loop {
            let failure = match self.session.get(target).await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    if !RetryPolicy::is_retryable_status(status) {
                        return Ok(response);
                    }
                    format!("HTTP {status}")
                }
                Err(error) => error.to_string(),
            };

            match self.policy.should_retry(attempt) {
                RetryDecision::Retry { delay, attempt: next } => {
                    warn!(category, attempt, %failure, ?delay, "transient failure, retrying");
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt = next;
                }
                RetryDecision::DoNotRetry { reason } => {
                    return Err(format!("{failure} ({reason})"));
                }
            }
        }
    }
}

#[async_trait]
impl CategoryFetcher for HttpFetcher {
    async fn fetch(&self, category: &str, url: &str) -> FetchOutcome {
        let target = self.session.target_url(url);
        debug!(category, url = %target, "fetching category listing");

        let response = match self.get_with_retries(category, &target).await {
            Ok(response) => response,
            Err(cause) => return FetchOutcome::transport_error(cause),
        };

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let body = match response.text().await {
            Ok(body) => body,
            Err(error) => return FetchOutcome::transport_error(error.to_string()),
        };

        // The upstream serves block pages with a 200 status; the declared
        // content type is the actual blocking signal.
        if !content_type.contains("application/json") {
            debug!(category, %content_type, "non-JSON response, treating as blocked");
            return FetchOutcome::blocked(&body);
        }

        match serde_json::from_str::<Vec<Value>>(&body) {
            Ok(items) => FetchOutcome::Ok(items),
            Err(error) => FetchOutcome::decode_error(error.to_string()),
        }
    }
}
