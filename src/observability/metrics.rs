//! Metrics collection and exposition.
//!
//! # Metrics
//! - `campus_fetch_attempts_total` (counter): operation attempts by outcome
//! - `campus_fetch_retries_exhausted_total` (counter): retried sequences that gave up
//! - `campus_fetch_timeouts_total` (counter): hard deadlines that fired
//! - `campus_fetch_single_flight_total` (counter): dispatched vs joined requests
//! - `campus_fetch_in_flight` (gauge): keys with an operation in flight
//! - `campus_fetch_request_duration_seconds` (histogram): end-to-end fetch latency
//! - `campus_fetch_presentation_total` (counter): presentation state changes
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - The Prometheus exporter is only installed by the binary

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::query::PresentationState;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_attempt(outcome: &'static str) {
    counter!("campus_fetch_attempts_total", "outcome" => outcome).increment(1);
}

pub fn record_retries_exhausted() {
    counter!("campus_fetch_retries_exhausted_total").increment(1);
}

pub fn record_timeout() {
    counter!("campus_fetch_timeouts_total").increment(1);
}

pub fn record_single_flight(result: &'static str) {
    counter!("campus_fetch_single_flight_total", "result" => result).increment(1);
}

pub fn record_in_flight(count: usize) {
    gauge!("campus_fetch_in_flight").set(count as f64);
}

pub fn record_fetch_duration(outcome: &'static str, start: Instant) {
    histogram!("campus_fetch_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_presentation(state: PresentationState) {
    counter!("campus_fetch_presentation_total", "state" => state.as_str()).increment(1);
}
