//! Soft-timeout tracking for loading queries.
//!
//! The caller re-evaluates the tracker on every poll tick with the current
//! snapshot and time. Once a query has been pending longer than the soft
//! timeout, [`QueryView::soft_timeout_elapsed`] flips so the caller can show
//! a "taking longer than expected" hint. The classified state stays
//! [`PresentationState::Loading`].

use std::time::{Duration, Instant};

use crate::observability::metrics;
use crate::query::empty::EmptyPredicate;
use crate::query::state::{classify, PresentationState, QuerySnapshot};

/// One re-evaluation of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryView {
    pub state: PresentationState,
    pub soft_timeout_elapsed: bool,
}

impl QueryView {
    /// Still loading past the soft timeout.
    pub fn show_slow_hint(&self) -> bool {
        self.state == PresentationState::Loading && self.soft_timeout_elapsed
    }
}

/// Per-query state carried between re-evaluations.
#[derive(Debug, Clone, Default)]
pub struct QueryTracker {
    soft_timeout: Option<Duration>,
    loading_since: Option<Instant>,
    soft_timed_out: bool,
    last_state: Option<PresentationState>,
}

impl QueryTracker {
    /// `None` disables the soft timeout.
    pub fn new(soft_timeout: Option<Duration>) -> Self {
        Self {
            soft_timeout,
            ..Self::default()
        }
    }

    /// Soft timeout in whole seconds; 0 disables it.
    pub fn from_secs(secs: u64) -> Self {
        Self::new((secs > 0).then(|| Duration::from_secs(secs)))
    }

    pub fn soft_timeout(&self) -> Option<Duration> {
        self.soft_timeout
    }

    pub fn soft_timeout_elapsed(&self) -> bool {
        self.soft_timed_out
    }

    /// Classify `snapshot` observed at `now` and update the soft-timeout flag.
    pub fn observe<T, E, P>(
        &mut self,
        snapshot: &QuerySnapshot<T, E>,
        empty: &P,
        now: Instant,
    ) -> QueryView
    where
        P: EmptyPredicate<T> + ?Sized,
    {
        if snapshot.is_pending() {
            let since = *self.loading_since.get_or_insert(now);
            if let Some(limit) = self.soft_timeout {
                if !self.soft_timed_out && now.saturating_duration_since(since) >= limit {
                    self.soft_timed_out = true;
                    tracing::info!(
                        soft_timeout_secs = limit.as_secs_f64(),
                        "Query still loading after soft timeout"
                    );
                }
            }
        } else {
            self.reset();
        }

        let state = classify(snapshot, empty);
        if self.last_state != Some(state) {
            metrics::record_presentation(state);
            tracing::debug!(state = %state, "Query presentation changed");
            self.last_state = Some(state);
        }

        QueryView {
            state,
            soft_timeout_elapsed: self.soft_timed_out,
        }
    }

    /// Clear the loading clock and the soft-timeout flag.
    pub fn reset(&mut self) {
        self.loading_since = None;
        self.soft_timed_out = false;
    }
}
