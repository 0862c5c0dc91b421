//! Configuration schema definitions.
//!
//! This module defines the configuration consumed by the client layer and the
//! binary. All types derive Serde traits for (de)serialization from TOML.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::query::EmptyCondition;

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    /// Remote backend location and credentials.
    pub backend: BackendConfig,

    /// Hard deadline around each fetch.
    pub timeouts: TimeoutConfig,

    /// Retry schedule.
    pub retries: RetryConfig,

    /// Presentation settings.
    pub query: QueryConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Remote REST backend configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL that resource paths are appended to.
    pub base_url: String,

    /// Optional API key, sent as `apikey` and as a bearer token.
    pub api_key: Option<String>,

    /// Transport timeout for a single HTTP request in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:54321/rest/v1".to_string(),
            api_key: None,
            request_timeout_ms: 10_000,
        }
    }
}

/// Hard timeout configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for the whole retried sequence in milliseconds.
    pub timeout_ms: u64,

    /// Report an elapsed deadline as an error instead of a timed-out outcome.
    pub throw_on_timeout: bool,

    /// Message for the timeout error; empty selects the default.
    pub timeout_message: String,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 15_000,
            throw_on_timeout: true,
            timeout_message: String::new(),
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Factor by which the delay grows per failed attempt.
    pub backoff_multiplier: f64,

    /// Random jitter as a fraction of each delay (0.0 = none).
    pub jitter_ratio: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 2000,
            backoff_multiplier: 2.0,
            jitter_ratio: 0.0,
        }
    }
}

/// Query presentation configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Which payloads count as empty.
    pub empty_condition: EmptyCondition,

    /// Seconds of loading before the slow hint is shown (0 = never).
    pub soft_timeout_secs: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            empty_condition: EmptyCondition::Array,
            soft_timeout_secs: 10,
        }
    }
}

impl QueryConfig {
    pub fn soft_timeout(&self) -> Option<Duration> {
        (self.soft_timeout_secs > 0).then(|| Duration::from_secs(self.soft_timeout_secs))
    }
}

/// Observability configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
