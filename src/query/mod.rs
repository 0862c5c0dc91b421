//! Query presentation subsystem.
//!
//! # Data Flow
//! ```text
//! fetch result / pending status
//!     → QuerySnapshot (raw flags + data/error)
//!     → state.rs classify (error > empty/success > loading)
//!     → tracker.rs (soft-timeout flag, re-evaluated per tick)
//!     → QueryView rendered by the caller
//! ```
//!
//! # Design Decisions
//! - Classification is a pure function and never fails
//! - The soft timeout is a flag next to the state, not a state of its own
//! - Emptiness is pluggable: built-in predicates or any closure

pub mod empty;
pub mod state;
pub mod tracker;

pub use empty::{EmptyCondition, EmptyPredicate};
pub use state::{classify, PresentationState, QuerySnapshot};
pub use tracker::{QueryTracker, QueryView};
