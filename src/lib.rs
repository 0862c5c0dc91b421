//! Reliable read access to a remote school-records backend.
//!
//! Every fetch goes through request de-duplication, a hard deadline and
//! bounded retries with exponential backoff. Results are classified into a
//! presentation state (`loading`, `error`, `empty`, `success`) with an
//! optional "slow" hint driven by a soft timeout.

pub mod client;
pub mod config;
pub mod observability;
pub mod query;
pub mod remote;
pub mod resilience;
pub mod security;

pub use client::ResourceClient;
pub use config::ClientConfig;
pub use query::{PresentationState, QuerySnapshot, QueryTracker};
pub use remote::{HttpResource, RemoteError, RemoteResource, ResourceRequest};
