//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated, immutable)
//!     → RetryPolicy / TimeoutOptions / HttpResource / QueryTracker
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - The resilience core never reads config itself; callers convert it into descriptors

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::ClientConfig;
pub use schema::BackendConfig;
pub use schema::ObservabilityConfig;
pub use schema::QueryConfig;
pub use schema::RetryConfig;
pub use schema::TimeoutConfig;
