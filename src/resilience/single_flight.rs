//! Single-flight request de-duplication.
//!
//! # Responsibilities
//! - Collapse concurrent requests sharing a key into one underlying operation
//! - Hand every caller for that key the same settlement
//! - Drop the key's entry as soon as its operation settles
//!
//! # Design Decisions
//! - Explicit instances, cloned to share a de-duplication scope; no global table
//! - The operation runs on its own task, so it finishes even if every caller goes away
//! - Entries carry a flight id; cleanup only removes the entry it created, which
//!   keeps a flight dispatched after `clear()` from being evicted by an older one

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::task::JoinError;

use crate::observability::metrics;

type SharedFlight<T, E> = Shared<BoxFuture<'static, Result<Result<T, E>, FlightAborted>>>;

/// The flight's task ended without producing a result.
///
/// Carried to waiters as a value so that every one of them re-raises the
/// same payload, instead of polling a poisoned shared future.
#[derive(Debug, Clone)]
enum FlightAborted {
    Panicked(Arc<str>),
    Cancelled,
}

impl FlightAborted {
    fn from_join_error(err: JoinError) -> Self {
        if !err.is_panic() {
            return FlightAborted::Cancelled;
        }
        let payload = err.into_panic();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "single-flight operation panicked".to_string());
        FlightAborted::Panicked(message.into())
    }

    fn resume(self) -> ! {
        let message = match self {
            FlightAborted::Panicked(message) => message.to_string(),
            FlightAborted::Cancelled => "single-flight task was cancelled".to_string(),
        };
        std::panic::resume_unwind(Box::new(message))
    }
}

struct Flight<T, E> {
    id: u64,
    future: SharedFlight<T, E>,
}

/// Removes a flight's entry when its task finishes, whatever the outcome.
struct FlightCleanup<T, E> {
    flights: Arc<DashMap<String, Flight<T, E>>>,
    key: String,
    id: u64,
}

impl<T, E> Drop for FlightCleanup<T, E> {
    fn drop(&mut self) {
        let id = self.id;
        if self.flights.remove_if(&self.key, |_, flight| flight.id == id).is_some() {
            tracing::debug!(key = %self.key, flight = id, "Single-flight settled");
            metrics::record_in_flight(self.flights.len());
        }
    }
}

/// Table of in-flight operations keyed by logical request identity.
pub struct SingleFlight<T, E> {
    flights: Arc<DashMap<String, Flight<T, E>>>,
    next_id: Arc<AtomicU64>,
}

impl<T, E> Clone for SingleFlight<T, E> {
    fn clone(&self) -> Self {
        Self {
            flights: Arc::clone(&self.flights),
            next_id: Arc::clone(&self.next_id),
        }
    }
}

impl<T, E> Default for SingleFlight<T, E> {
    fn default() -> Self {
        Self {
            flights: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl<T, E> std::fmt::Debug for SingleFlight<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SingleFlight")
            .field("in_flight", &self.flights.len())
            .finish()
    }
}

impl<T, E> SingleFlight<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `operation` for `key`, or join the flight already running for it.
    ///
    /// `operation` is only invoked when no flight exists for `key`. It is called
    /// while the key's slot is locked, so it must only build the future and must
    /// not call back into this cache.
    ///
    /// # Panics
    ///
    /// A panic inside the operation is resumed in every caller waiting on it,
    /// each with the original message as a `String` payload. A task cancelled
    /// by runtime shutdown is reported the same way.
    pub async fn execute<F, Fut>(&self, key: &str, operation: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let flight = match self.flights.entry(key.to_string()) {
            Entry::Occupied(entry) => {
                metrics::record_single_flight("joined");
                tracing::debug!(key, flight = entry.get().id, "Joining in-flight request");
                entry.get().future.clone()
            }
            Entry::Vacant(entry) => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                let future = self.dispatch(key, id, operation());
                entry.insert(Flight {
                    id,
                    future: future.clone(),
                });
                metrics::record_single_flight("dispatched");
                tracing::debug!(key, flight = id, "Dispatched single-flight request");
                future
            }
        };
        metrics::record_in_flight(self.flights.len());

        match flight.await {
            Ok(result) => result,
            Err(aborted) => aborted.resume(),
        }
    }

    fn dispatch<Fut>(&self, key: &str, id: u64, operation: Fut) -> SharedFlight<T, E>
    where
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let cleanup = FlightCleanup {
            flights: Arc::clone(&self.flights),
            key: key.to_string(),
            id,
        };
        let handle = tokio::spawn(async move {
            let _cleanup = cleanup;
            operation.await
        });

        handle
            .map(|joined| joined.map_err(FlightAborted::from_join_error))
            .boxed()
            .shared()
    }
}

impl<T, E> SingleFlight<T, E> {
    /// Forget every in-flight entry.
    ///
    /// Callers already waiting keep their flight's outcome; only new requests
    /// dispatch fresh operations.
    pub fn clear(&self) {
        let dropped = self.flights.len();
        self.flights.clear();
        metrics::record_in_flight(0);
        tracing::debug!(dropped, "Cleared single-flight table");
    }

    /// Number of keys with an operation in flight.
    pub fn in_flight(&self) -> usize {
        self.flights.len()
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.flights.contains_key(key)
    }
}
