//! Timeout enforcement.
//!
//! # Responsibilities
//! - Race an operation against a cancellable deadline
//! - Report an elapsed deadline as a structured outcome or as an error
//! - Release the deadline timer on every exit path
//!
//! # Design Decisions
//! - The timer is a [`Deadline`] value owned by the call; dropping it releases the timer
//! - The operation is polled before the deadline, so a tie resolves to the result
//! - The deadline never cancels the operation; once it fires the operation is
//!   moved onto its own task to finish, and its late result is discarded
//! - Operation errors pass through untouched and are never reported as timeouts

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;
use tokio::time::{Instant, Sleep};

use crate::config::TimeoutConfig;
use crate::observability::metrics;

/// The deadline elapsed before the wrapped operation settled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TimeoutError {
    /// The deadline that was exceeded.
    pub timeout: Duration,
    /// Configured message, or the default one embedding the deadline.
    pub message: String,
}

impl TimeoutError {
    /// Build a timeout error, falling back to the default message when none is given.
    pub fn new(timeout: Duration, message: Option<&str>) -> Self {
        let message = match message {
            Some(message) if !message.trim().is_empty() => message.to_string(),
            _ => format!("Operation timed out after {}ms", timeout.as_millis()),
        };
        Self { timeout, message }
    }
}

/// Per-call timeout settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutOptions {
    /// Hard deadline for the operation.
    pub timeout: Duration,
    /// Fail with the caller's error type instead of returning [`TimeoutOutcome::TimedOut`].
    pub throw_on_timeout: bool,
    /// Message carried by the [`TimeoutError`].
    pub timeout_message: Option<String>,
}

impl TimeoutOptions {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            throw_on_timeout: false,
            timeout_message: None,
        }
    }

    pub fn from_millis(timeout_ms: u64) -> Self {
        Self::new(Duration::from_millis(timeout_ms))
    }

    pub fn from_config(config: &TimeoutConfig) -> Self {
        let options = Self::from_millis(config.timeout_ms).throw_on_timeout(config.throw_on_timeout);
        if config.timeout_message.trim().is_empty() {
            options
        } else {
            options.with_message(config.timeout_message.clone())
        }
    }

    pub fn throw_on_timeout(mut self, throw: bool) -> Self {
        self.throw_on_timeout = throw;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.timeout_message = Some(message.into());
        self
    }

    fn error(&self) -> TimeoutError {
        TimeoutError::new(self.timeout, self.timeout_message.as_deref())
    }
}

/// Result of [`with_timeout`]: exactly one of a value or a timeout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeoutOutcome<T> {
    /// The operation settled successfully before the deadline.
    Completed(T),
    /// The deadline elapsed first.
    TimedOut(TimeoutError),
}

impl<T> TimeoutOutcome<T> {
    pub fn timed_out(&self) -> bool {
        matches!(self, TimeoutOutcome::TimedOut(_))
    }

    pub fn result(self) -> Option<T> {
        match self {
            TimeoutOutcome::Completed(value) => Some(value),
            TimeoutOutcome::TimedOut(_) => None,
        }
    }

    pub fn into_result(self) -> Result<T, TimeoutError> {
        match self {
            TimeoutOutcome::Completed(value) => Ok(value),
            TimeoutOutcome::TimedOut(err) => Err(err),
        }
    }
}

/// A cancellable deadline timer.
///
/// The underlying timer entry is released when the value is cancelled or
/// dropped, whichever comes first.
#[derive(Debug)]
pub struct Deadline {
    sleep: Pin<Box<Sleep>>,
    timeout: Duration,
    armed: bool,
}

impl Deadline {
    /// Start a timer that expires after `timeout`.
    pub fn arm(timeout: Duration) -> Self {
        Self {
            sleep: Box::pin(tokio::time::sleep(timeout)),
            timeout,
            armed: true,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Instant at which the deadline fires.
    pub fn deadline(&self) -> Instant {
        self.sleep.deadline()
    }

    /// True until the deadline fires or is cancelled.
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Wait for the deadline to fire.
    pub async fn expired(&mut self) {
        self.sleep.as_mut().await;
        self.armed = false;
    }

    /// Cancel the deadline and release its timer.
    pub fn cancel(self) {
        drop(self);
    }

    fn release(&mut self) {
        if self.armed {
            self.armed = false;
            tracing::trace!(timeout_ms = self.timeout.as_millis() as u64, "Deadline released");
        }
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.release();
    }
}

/// Race `operation` against the deadline in `options`.
///
/// - Settles first with `Ok`: returns [`TimeoutOutcome::Completed`].
/// - Settles first with `Err`: returns the operation's error unchanged.
/// - Deadline first: returns [`TimeoutOutcome::TimedOut`], or `Err(E::from(TimeoutError))`
///   when `throw_on_timeout` is set. The operation keeps running in the
///   background until it settles.
pub async fn with_timeout<F, T, E>(
    operation: F,
    options: &TimeoutOptions,
) -> Result<TimeoutOutcome<T>, E>
where
    F: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: From<TimeoutError> + Send + 'static,
{
    let mut deadline = Deadline::arm(options.timeout);
    let mut operation = Box::pin(operation);

    let settled = tokio::select! {
        biased;
        result = &mut operation => Some(result),
        () = deadline.expired() => None,
    };
    deadline.cancel();

    match settled {
        Some(result) => result.map(TimeoutOutcome::Completed),
        None => {
            tokio::spawn(async move {
                let late = operation.await;
                tracing::debug!(
                    succeeded = late.is_ok(),
                    "Operation settled after its deadline; result discarded"
                );
            });

            let err = options.error();
            metrics::record_timeout();
            tracing::warn!(
                timeout_ms = options.timeout.as_millis() as u64,
                throw = options.throw_on_timeout,
                "Operation deadline elapsed"
            );
            if options.throw_on_timeout {
                Err(E::from(err))
            } else {
                Ok(TimeoutOutcome::TimedOut(err))
            }
        }
    }
}
