//! Input hygiene.
//!
//! # Data Flow
//! ```text
//! caller-supplied path / filter values
//!     → sanitize.rs (strip markup and control characters, bound length)
//!     → ResourceRequest
//! ```
//!
//! # Design Decisions
//! - Sanitization never fails; it only removes characters
//! - Path segments are restricted to URL-unreserved characters

pub mod sanitize;

pub use sanitize::{sanitize_input, sanitize_path_segment};
