//! Remote data access.
//!
//! # Data Flow
//! ```text
//! caller input
//!     → resource.rs (sanitized ResourceRequest, flight key)
//!     → http.rs (GET base_url/segments?query, JSON decode)
//!     → Result<serde_json::Value, RemoteError>
//! ```
//!
//! # Design Decisions
//! - Backends sit behind the `RemoteResource` trait; the resilience core never sees HTTP
//! - Errors are `Clone` so single-flight waiters can share them

pub mod error;
pub mod http;
pub mod resource;

pub use error::RemoteError;
pub use http::HttpResource;
pub use resource::{RemoteResource, ResourceRequest};
