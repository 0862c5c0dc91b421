//! Resource access client.
//!
//! Composes the resilience layers around a caller-supplied operation:
//!
//! ```text
//! fetch(key, operation)
//!     → SingleFlight::execute(key)          one underlying run per key
//!         → with_timeout(.., TimeoutOptions) bounds every attempt and backoff sleep
//!             → with_retry(operation, RetryPolicy)
//! ```
//!
//! The hard timeout wraps the outer retry call, so it bounds the total
//! wall-clock time of the retried sequence rather than each attempt. A
//! sequence that outlives its deadline keeps going in the background; only
//! its caller stops waiting.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::observability::metrics;
use crate::query::{classify, EmptyPredicate, PresentationState, QuerySnapshot};
use crate::remote::{RemoteError, RemoteResource, ResourceRequest};
use crate::resilience::{
    with_retry, with_timeout, RetryPolicy, SingleFlight, TimeoutError, TimeoutOptions,
    TimeoutOutcome,
};

/// Shared, de-duplicating, retrying, deadline-bound fetcher.
pub struct ResourceClient<T, E> {
    flights: SingleFlight<TimeoutOutcome<T>, E>,
    retry: RetryPolicy,
    timeout: TimeoutOptions,
}

impl<T, E> Clone for ResourceClient<T, E> {
    fn clone(&self) -> Self {
        Self {
            flights: self.flights.clone(),
            retry: self.retry.clone(),
            timeout: self.timeout.clone(),
        }
    }
}

impl<T, E> std::fmt::Debug for ResourceClient<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceClient")
            .field("flights", &self.flights)
            .field("retry", &self.retry)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl<T, E> ResourceClient<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + Display + From<TimeoutError> + 'static,
{
    /// Client with its own de-duplication scope.
    pub fn new(retry: RetryPolicy, timeout: TimeoutOptions) -> Self {
        Self::with_flights(SingleFlight::new(), retry, timeout)
    }

    /// Client sharing an existing de-duplication scope.
    pub fn with_flights(
        flights: SingleFlight<TimeoutOutcome<T>, E>,
        retry: RetryPolicy,
        timeout: TimeoutOptions,
    ) -> Self {
        Self {
            flights,
            retry,
            timeout,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(
            RetryPolicy::from_config(&config.retries),
            TimeoutOptions::from_config(&config.timeouts),
        )
    }

    pub fn flights(&self) -> &SingleFlight<TimeoutOutcome<T>, E> {
        &self.flights
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn timeout_options(&self) -> &TimeoutOptions {
        &self.timeout
    }

    /// Fetch through single-flight, hard timeout and retry.
    ///
    /// Concurrent calls with the same `key` share one run of `operation`.
    pub async fn fetch<F, Fut>(&self, key: &str, operation: F) -> Result<TimeoutOutcome<T>, E>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let retry = self.retry.clone();
        let timeout = self.timeout.clone();
        let span = tracing::info_span!("fetch", key = %key, request_id = %Uuid::new_v4());

        self.flights
            .execute(key, move || {
                async move {
                    let start = Instant::now();
                    let retried = async move { with_retry(operation, &retry).await }
                        .in_current_span();
                    let result = with_timeout(retried, &timeout).await;
                    let outcome = match &result {
                        Ok(TimeoutOutcome::Completed(_)) => "success",
                        Ok(TimeoutOutcome::TimedOut(_)) => "timeout",
                        Err(_) => "error",
                    };
                    metrics::record_fetch_duration(outcome, start);
                    result
                }
                .instrument(span)
            })
            .await
    }

    /// Fetch, then classify the result for presentation.
    pub async fn fetch_classified<F, Fut, P>(
        &self,
        key: &str,
        operation: F,
        empty: &P,
    ) -> (PresentationState, QuerySnapshot<T, E>)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        P: EmptyPredicate<T> + ?Sized,
    {
        let snapshot = snapshot_from_outcome(self.fetch(key, operation).await);
        (classify(&snapshot, empty), snapshot)
    }
}

impl ResourceClient<Value, RemoteError> {
    /// Fetch `request` from `resource`, keyed by the request's flight key.
    pub async fn fetch_resource(
        &self,
        resource: Arc<dyn RemoteResource>,
        request: ResourceRequest,
    ) -> Result<TimeoutOutcome<Value>, RemoteError> {
        let key = request.flight_key();
        self.fetch(&key, move || resource.fetch(&request)).await
    }
}

/// Fold a fetch result into a snapshot; a timed-out outcome becomes a failure.
pub fn snapshot_from_outcome<T, E>(result: Result<TimeoutOutcome<T>, E>) -> QuerySnapshot<T, E>
where
    E: From<TimeoutError>,
{
    match result {
        Ok(TimeoutOutcome::Completed(data)) => QuerySnapshot::succeeded(data),
        Ok(TimeoutOutcome::TimedOut(err)) => QuerySnapshot::failed(E::from(err)),
        Err(err) => QuerySnapshot::failed(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::empty;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts)
            .with_base_delay(Duration::from_millis(10))
            .with_max_delay(Duration::from_millis(40))
    }

    #[tokio::test(start_paused = true)]
    async fn test_fails_twice_then_succeeds() {
        let client: ResourceClient<Vec<String>, RemoteError> =
            ResourceClient::new(RetryPolicy::new(3), TimeoutOptions::from_millis(10_000));
        let calls = Arc::new(AtomicU32::new(0));

        let counter = calls.clone();
        let (state, snapshot) = client
            .fetch_classified(
                "notices",
                move || {
                    let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    async move {
                        if attempt <= 2 {
                            Err(RemoteError::Transport(format!("attempt {attempt} reset")))
                        } else {
                            Ok(vec!["a".to_string(), "b".to_string()])
                        }
                    }
                },
                &empty::array::<String>,
            )
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(state, PresentationState::Success);
        assert_eq!(snapshot.data, Some(vec!["a".to_string(), "b".to_string()]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_bounds_whole_retry_sequence() {
        let client: ResourceClient<u32, RemoteError> = ResourceClient::new(
            RetryPolicy::new(10).with_base_delay(Duration::from_millis(100)),
            TimeoutOptions::from_millis(250).throw_on_timeout(true),
        );
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = client
            .fetch("grades", move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(RemoteError::Status { status: 503, body: String::new() }) }
            })
            .await;

        assert!(matches!(result, Err(RemoteError::Timeout(_))));
        // 0ms, 100ms, 300ms would be the third attempt; the deadline fires at 250ms.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_continue_after_deadline() {
        let client: ResourceClient<u32, RemoteError> = ResourceClient::new(
            RetryPolicy::new(3).with_base_delay(Duration::from_millis(100)),
            TimeoutOptions::from_millis(150).throw_on_timeout(true),
        );
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = client
            .fetch("timetable", move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(RemoteError::Transport("reset".into())) }
            })
            .await;
        assert!(matches!(result, Err(RemoteError::Timeout(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // Remaining attempt at 300ms still runs.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_outcome_when_not_throwing() {
        let client: ResourceClient<u32, RemoteError> =
            ResourceClient::new(fast_retry(1), TimeoutOptions::from_millis(50));

        let result = client
            .fetch("slow", || async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(1)
            })
            .await
            .unwrap();
        assert!(result.timed_out());

        let snapshot = snapshot_from_outcome::<u32, RemoteError>(Ok(result));
        assert!(matches!(snapshot.error, Some(RemoteError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_concurrent_fetches_share_retries() {
        let client: ResourceClient<u32, RemoteError> =
            ResourceClient::new(fast_retry(3), TimeoutOptions::from_millis(5_000));
        let calls = Arc::new(AtomicU32::new(0));

        let fetches = (0..5).map(|_| {
            let client = client.clone();
            let calls = calls.clone();
            async move {
                client
                    .fetch("attendance?day=mon", move || {
                        let attempt = calls.fetch_add(1, Ordering::SeqCst) + 1;
                        async move {
                            tokio::time::sleep(Duration::from_millis(5)).await;
                            if attempt == 1 {
                                Err(RemoteError::Transport("reset".into()))
                            } else {
                                Ok(31)
                            }
                        }
                    })
                    .await
            }
        });
        let results = futures_util::future::join_all(fetches).await;

        // One flight, two attempts inside it.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        for result in results {
            assert_eq!(result.unwrap(), TimeoutOutcome::Completed(31));
        }
        assert_eq!(client.flights().in_flight(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_classify_as_error() {
        let client: ResourceClient<Vec<u32>, RemoteError> =
            ResourceClient::new(fast_retry(2), TimeoutOptions::from_millis(5_000));

        let (state, snapshot) = client
            .fetch_classified(
                "fees",
                || async { Err(RemoteError::Status { status: 500, body: "down".into() }) },
                &empty::array::<u32>,
            )
            .await;

        assert_eq!(state, PresentationState::Error);
        assert_eq!(
            snapshot.error,
            Some(RemoteError::Status { status: 500, body: "down".into() })
        );
    }

    #[test]
    fn test_from_config() {
        let mut config = ClientConfig::default();
        config.retries.max_attempts = 4;
        config.timeouts.timeout_ms = 1234;

        let client: ResourceClient<Value, RemoteError> = ResourceClient::from_config(&config);
        assert_eq!(client.retry_policy().max_attempts, 4);
        assert_eq!(client.timeout_options().timeout, Duration::from_millis(1234));
        assert!(client.timeout_options().throw_on_timeout);
    }
}
