//! Retry logic with exponential backoff for transient upstream failures.
//!
//! The catalog API intermittently answers with 429/5xx under load. The
//! [`RetryPolicy`] bounds how often a request is re-issued and how long to
//! wait between attempts; callers only ever see the final outcome.
//!
//! # Example
//!
//! ```
//! use pricewatch_core::fetch::{RetryPolicy, RetryDecision};
//!
//! let policy = RetryPolicy::default();
//! assert!(RetryPolicy::is_retryable_status(503));
//!
//! match policy.should_retry(1) {
//!     RetryDecision::Retry { delay, attempt } => {
//!         println!("retrying in {:?} (attempt {})", delay, attempt);
//!     }
//!     RetryDecision::DoNotRetry { reason } => {
//!         println!("giving up: {}", reason);
//!     }
//! }
//! ```

use std::time::Duration;

use rand::Rng;
use tracing::{debug, instrument};

/// Default maximum attempts per request, including the initial one.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Base delay unit for exponential backoff (backoff factor 1).
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Delay cap; backoff never sleeps longer than this.
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(32);

/// Maximum jitter added to non-zero delays (250ms).
const MAX_JITTER_MS: u64 = 250;

/// HTTP statuses treated as transient and worth retrying.
const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Decision on whether to re-issue a failed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the request after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Do not retry the request.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Configuration for retry behavior with exponential backoff.
///
/// # Delay Calculation
///
/// The first retry happens immediately; subsequent retries double the base
/// delay:
///
/// ```text
/// delay(retry n) = 0            for n = 1
///                = base * 2^(n-2)  for n >= 2, capped at max_delay
/// ```
///
/// With defaults (3 attempts, 1s base) the sleeps are ≈ 0s then 1s.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,

    /// Base delay unit for backoff.
    base_delay: Duration,

    /// Maximum delay cap.
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with a custom attempt budget, using defaults otherwise.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns true if the HTTP status is considered transient.
    #[must_use]
    pub fn is_retryable_status(status: u16) -> bool {
        RETRYABLE_STATUSES.contains(&status)
    }

    /// Decides whether to retry after a transient failure.
    ///
    /// `attempt` is the attempt number that just failed (1-indexed).
    #[instrument(skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, attempt: u32) -> RetryDecision {
        if attempt >= self.max_attempts {
            debug!(attempt, "retry budget exhausted");
            return RetryDecision::DoNotRetry {
                reason: format!("retry budget exhausted after {attempt} attempts"),
            };
        }

        let delay = self.delay_before_retry(attempt);
        debug!(attempt, ?delay, "scheduling retry");
        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }

    /// Backoff before retry number `failed_attempt` (first retry is free).
    fn delay_before_retry(&self, failed_attempt: u32) -> Duration {
        if failed_attempt <= 1 {
            return Duration::ZERO;
        }

        let exponent = failed_attempt - 2;
        let backoff = self
            .base_delay
            .checked_mul(2_u32.saturating_pow(exponent))
            .unwrap_or(self.max_delay)
            .min(self.max_delay);

        let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..=MAX_JITTER_MS));
        backoff + jitter
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses_match_transient_set() {
        for status in [429, 500, 502, 503, 504] {
            assert!(
                RetryPolicy::is_retryable_status(status),
                "{status} should be retryable"
            );
        }
        for status in [200, 301, 400, 403, 404, 418] {
            assert!(
                !RetryPolicy::is_retryable_status(status),
                "{status} should not be retryable"
            );
        }
    }

    #[test]
    fn test_should_retry_within_budget() {
        let policy = RetryPolicy::default();

        match policy.should_retry(1) {
            RetryDecision::Retry { delay, attempt } => {
                assert_eq!(attempt, 2);
                assert_eq!(delay, Duration::ZERO, "first retry is immediate");
            }
            RetryDecision::DoNotRetry { reason } => panic!("expected retry, got: {reason}"),
        }

        match policy.should_retry(2) {
            RetryDecision::Retry { delay, attempt } => {
                assert_eq!(attempt, 3);
                assert!(delay >= Duration::from_secs(1), "second retry waits ≈1s");
                assert!(delay < Duration::from_secs(2), "jitter stays small");
            }
            RetryDecision::DoNotRetry { reason } => panic!("expected retry, got: {reason}"),
        }
    }

    #[test]
    fn test_should_retry_exhausted_budget() {
        let policy = RetryPolicy::default();
        match policy.should_retry(3) {
            RetryDecision::DoNotRetry { reason } => {
                assert!(reason.contains("exhausted"), "unexpected reason: {reason}");
            }
            RetryDecision::Retry { .. } => panic!("budget of 3 must stop after attempt 3"),
        }
    }

    #[test]
    fn test_with_max_attempts_floors_at_one() {
        let policy = RetryPolicy::with_max_attempts(0);
        assert_eq!(policy.max_attempts(), 1);
        assert!(matches!(
            policy.should_retry(1),
            RetryDecision::DoNotRetry { .. }
        ));
    }

    #[test]
    fn test_backoff_delay_doubles_and_caps() {
        let policy = RetryPolicy::with_max_attempts(10);
        let jitter = Duration::from_millis(MAX_JITTER_MS);

        let d3 = policy.delay_before_retry(3);
        assert!(d3 >= Duration::from_secs(2) && d3 <= Duration::from_secs(2) + jitter);

        let d4 = policy.delay_before_retry(4);
        assert!(d4 >= Duration::from_secs(4) && d4 <= Duration::from_secs(4) + jitter);

        // Far beyond the cap the delay stays bounded.
        let d9 = policy.delay_before_retry(9);
        assert!(d9 <= DEFAULT_MAX_DELAY + jitter);
    }
}
