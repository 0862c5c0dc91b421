//! Three-state query classification.
//!
//! Maps the raw status of an asynchronous query onto the single state a
//! screen renders. Priority when raw signals overlap:
//!
//! ```text
//! is_error            → Error
//! is_success + empty  → Empty
//! is_success          → Success
//! otherwise           → Loading
//! ```
//!
//! A soft timeout never changes the state; see [`crate::query::tracker`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::query::empty::EmptyPredicate;

/// What the caller should render for a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresentationState {
    #[default]
    Loading,
    Error,
    Empty,
    Success,
}

impl PresentationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresentationState::Loading => "loading",
            PresentationState::Error => "error",
            PresentationState::Empty => "empty",
            PresentationState::Success => "success",
        }
    }
}

impl fmt::Display for PresentationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw status of an underlying query at one observation point.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySnapshot<T, E> {
    pub is_error: bool,
    pub is_success: bool,
    pub data: Option<T>,
    pub error: Option<E>,
}

impl<T, E> Default for QuerySnapshot<T, E> {
    fn default() -> Self {
        Self::pending()
    }
}

impl<T, E> QuerySnapshot<T, E> {
    pub fn pending() -> Self {
        Self {
            is_error: false,
            is_success: false,
            data: None,
            error: None,
        }
    }

    pub fn failed(error: E) -> Self {
        Self {
            is_error: true,
            is_success: false,
            data: None,
            error: Some(error),
        }
    }

    pub fn succeeded(data: T) -> Self {
        Self {
            is_error: false,
            is_success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Neither failed nor succeeded yet.
    pub fn is_pending(&self) -> bool {
        !self.is_error && !self.is_success
    }
}

impl<T, E> From<Result<T, E>> for QuerySnapshot<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => Self::succeeded(data),
            Err(error) => Self::failed(error),
        }
    }
}

/// Classify a snapshot. Never fails.
pub fn classify<T, E, P>(snapshot: &QuerySnapshot<T, E>, empty: &P) -> PresentationState
where
    P: EmptyPredicate<T> + ?Sized,
{
    if snapshot.is_error {
        PresentationState::Error
    } else if snapshot.is_success {
        if empty.is_empty(snapshot.data.as_ref()) {
            PresentationState::Empty
        } else {
            PresentationState::Success
        }
    } else {
        PresentationState::Loading
    }
}
