//! Retry logic.
//!
//! # Responsibilities
//! - Re-invoke a failing operation factory up to a bounded number of attempts
//! - Wait with capped exponential backoff between attempts
//! - Surface the last attempt's error once attempts are exhausted
//!
//! # Design Decisions
//! - Every attempt calls the factory again; nothing is shared between attempts
//! - No delay follows the final failing attempt
//! - Jitter is opt-in so the default delay schedule is exact

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::observability::metrics;
use crate::resilience::backoff::{apply_jitter, calculate_backoff};

/// Bounded retry schedule.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one (at least 1).
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Growth factor applied per failed attempt.
    pub backoff_multiplier: f64,
    /// Random jitter as a fraction of the delay (0.0 disables it).
    pub jitter_ratio: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(2000),
            backoff_multiplier: 2.0,
            jitter_ratio: 0.0,
        }
    }
}

impl RetryPolicy {
    /// Default schedule with a custom attempt count (clamped to at least 1).
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
            backoff_multiplier: config.backoff_multiplier,
            jitter_ratio: config.jitter_ratio,
        }
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub fn with_jitter(mut self, ratio: f64) -> Self {
        self.jitter_ratio = ratio;
        self
    }

    /// Delay inserted after failed attempt `attempt` before the next one.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let delay = calculate_backoff(
            attempt,
            self.base_delay,
            self.max_delay,
            self.backoff_multiplier,
        );
        apply_jitter(delay, self.jitter_ratio, self.max_delay)
    }
}

/// Run `operation` until it succeeds or `policy.max_attempts` attempts have failed.
///
/// Returns the error of the final attempt when every attempt fails.
pub async fn with_retry<F, Fut, T, E>(mut operation: F, policy: &RetryPolicy) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => {
                metrics::record_attempt("success");
                if attempt > 1 {
                    tracing::info!(attempt, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) => {
                metrics::record_attempt("failure");

                if attempt >= max_attempts {
                    metrics::record_retries_exhausted();
                    tracing::warn!(attempts = attempt, error = %error, "Retry attempts exhausted");
                    return Err(error);
                }

                let delay = policy.delay_after(attempt);
                tracing::info!(
                    attempt,
                    max_attempts,
                    delay = ?delay,
                    error = %error,
                    "Retrying operation"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
