//! Retry with exponential backoff for blocking calls.
//!
//! Used by the command runner for failures the identity service reports as
//! temporary. The reconciler itself never retries.
//!
//! # Example
//!
//! ```rust
//! use keystone_assign::retry::{with_retry_if, RetryConfig};
//!
//! let mut calls = 0;
//! let result: Result<u32, &str> = with_retry_if(
//!     &RetryConfig::no_retry(),
//!     || {
//!         calls += 1;
//!         Ok(7)
//!     },
//!     |_| true,
//! );
//! assert_eq!(result, Ok(7));
//! assert_eq!(calls, 1);
//! ```

use std::thread::sleep;
use std::time::Duration;

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, counting the first one
    pub max_attempts: u32,

    /// Delay before the first retry
    pub initial_delay: Duration,

    /// Maximum delay between retries
    pub max_delay: Duration,

    /// Base for exponential backoff (typically 2.0)
    pub exponential_base: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            exponential_base: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create a configuration that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::from_millis(0),
            max_delay: Duration::from_millis(0),
            exponential_base: 1.0,
        }
    }

    /// Delay to wait after `delay`, capped at `max_delay`.
    fn next_delay(&self, delay: Duration) -> Duration {
        Duration::from_secs_f64(
            (delay.as_secs_f64() * self.exponential_base).min(self.max_delay.as_secs_f64()),
        )
    }
}

/// Call `f` until it succeeds, fails with a non-retryable error, or runs out
/// of attempts.
///
/// Blocks the current thread between attempts.
pub fn with_retry_if<F, T, E, P>(config: &RetryConfig, mut f: F, mut is_retryable: P) -> Result<T, E>
where
    F: FnMut() -> Result<T, E>,
    E: std::fmt::Debug,
    P: FnMut(&E) -> bool,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        attempt += 1;

        match f() {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(attempts = attempt, "Command succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if !is_retryable(&e) => {
                tracing::debug!(error = ?e, "Error is not retryable, returning immediately");
                return Err(e);
            }
            Err(e) if attempt >= config.max_attempts => {
                tracing::error!(attempts = attempt, error = ?e, "All retry attempts exhausted");
                return Err(e);
            }
            Err(e) => {
                tracing::warn!(
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = ?e,
                    "Attempt failed, retrying"
                );

                sleep(delay);
                delay = config.next_delay(delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick(max_attempts: u32) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
            exponential_base: 2.0,
        }
    }

    #[test]
    fn test_next_delay_is_capped() {
        let config = quick(5);
        assert_eq!(config.next_delay(Duration::from_millis(1)), Duration::from_millis(2));
        assert_eq!(config.next_delay(Duration::from_millis(3)), Duration::from_millis(4));
    }

    #[test]
    fn test_succeeds_after_retries() {
        let mut calls = 0;
        let result = with_retry_if(
            &quick(3),
            || {
                calls += 1;
                if calls < 3 {
                    Err("unavailable")
                } else {
                    Ok(42)
                }
            },
            |_| true,
        );
        assert_eq!(result, Ok(42));
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_exhausts_attempts() {
        let mut calls = 0;
        let result: Result<(), _> = with_retry_if(
            &quick(2),
            || {
                calls += 1;
                Err("always fails")
            },
            |_| true,
        );
        assert_eq!(result, Err("always fails"));
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_non_retryable_error_returns_immediately() {
        let mut calls = 0;
        let result: Result<(), _> = with_retry_if(
            &quick(5),
            || {
                calls += 1;
                Err("permanent failure")
            },
            |_| false,
        );
        assert_eq!(result, Err("permanent failure"));
        assert_eq!(calls, 1);
    }
}
