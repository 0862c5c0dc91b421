//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request for a resource:
//!     → single_flight.rs (join an identical request already in flight)
//!     → timeouts.rs (hard deadline around the whole retried sequence)
//!     → retries.rs (re-invoke the operation with backoff.rs delays)
//!     → remote operation
//! ```
//!
//! # Design Decisions
//! - Each layer is a plain async function or value; they compose by wrapping
//! - Errors from the operation pass through every layer unchanged
//! - The single-flight table is the only shared mutable state

pub mod backoff;
pub mod retries;
pub mod single_flight;
pub mod timeouts;

pub use retries::{with_retry, RetryPolicy};
pub use single_flight::SingleFlight;
pub use timeouts::{with_timeout, Deadline, TimeoutError, TimeoutOptions, TimeoutOutcome};
