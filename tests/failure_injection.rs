//! Failure injection tests against a mock HTTP backend.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use campus_fetch::client::snapshot_from_outcome;
use campus_fetch::config::BackendConfig;
use campus_fetch::query::{classify, EmptyCondition, PresentationState};
use campus_fetch::remote::{HttpResource, RemoteError, RemoteResource, ResourceRequest};
use campus_fetch::resilience::{RetryPolicy, TimeoutOptions, TimeoutOutcome};
use campus_fetch::ResourceClient;
use serde_json::{json, Value};

mod common;

fn resource(addr: SocketAddr) -> Arc<dyn RemoteResource> {
    let config = BackendConfig {
        base_url: format!("http://{addr}/rest/v1"),
        ..Default::default()
    };
    Arc::new(HttpResource::new(&config).unwrap())
}

fn client(max_attempts: u32, timeout: TimeoutOptions) -> ResourceClient<Value, RemoteError> {
    let retry = RetryPolicy::new(max_attempts)
        .with_base_delay(Duration::from_millis(20))
        .with_max_delay(Duration::from_millis(80));
    ResourceClient::new(retry, timeout)
}

#[tokio::test]
async fn test_retry_then_success() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let addr = common::start_programmable_backend(move |_| {
        let count = counter.fetch_add(1, Ordering::SeqCst);
        async move {
            if count < 2 {
                (503, r#"{"message":"Service Unavailable"}"#.to_string())
            } else {
                (200, r#"["a","b"]"#.to_string())
            }
        }
    })
    .await;

    let client = client(3, TimeoutOptions::from_millis(5_000).throw_on_timeout(true));
    let request = ResourceRequest::new("notices").unwrap();
    let snapshot = snapshot_from_outcome(client.fetch_resource(resource(addr), request).await);

    assert_eq!(calls.load(Ordering::SeqCst), 3, "Two failures then one success");
    assert_eq!(classify(&snapshot, &EmptyCondition::Array), PresentationState::Success);
    assert_eq!(snapshot.data, Some(json!(["a", "b"])));
}

#[tokio::test]
async fn test_retries_exhausted_surface_last_error() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let addr = common::start_programmable_backend(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        async { (503, "maintenance".to_string()) }
    })
    .await;

    let client = client(2, TimeoutOptions::from_millis(5_000).throw_on_timeout(true));
    let request = ResourceRequest::new("fees").unwrap();
    let result = client.fetch_resource(resource(addr), request).await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let err = result.unwrap_err();
    assert_eq!(
        err,
        RemoteError::Status {
            status: 503,
            body: "maintenance".to_string()
        }
    );
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_hard_timeout_fails_the_query() {
    let addr = common::start_programmable_backend(|_| async {
        tokio::time::sleep(Duration::from_secs(2)).await;
        (200, "[1]".to_string())
    })
    .await;

    let client = client(
        3,
        TimeoutOptions::from_millis(200)
            .throw_on_timeout(true)
            .with_message("The server took too long to respond"),
    );
    let request = ResourceRequest::new("timetable").unwrap();
    let started = std::time::Instant::now();
    let result = client.fetch_resource(resource(addr), request).await;

    assert!(started.elapsed() < Duration::from_secs(1));
    match result {
        Err(RemoteError::Timeout(err)) => {
            assert_eq!(err.to_string(), "The server took too long to respond");
            assert_eq!(err.timeout, Duration::from_millis(200));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn test_hard_timeout_without_throwing() {
    let addr = common::start_programmable_backend(|_| async {
        tokio::time::sleep(Duration::from_secs(2)).await;
        (200, "[1]".to_string())
    })
    .await;

    let client = client(1, TimeoutOptions::from_millis(150));
    let request = ResourceRequest::new("timetable").unwrap();
    let outcome = client.fetch_resource(resource(addr), request).await.unwrap();

    assert!(outcome.timed_out());
    let snapshot = snapshot_from_outcome(Ok::<_, RemoteError>(outcome));
    assert_eq!(classify(&snapshot, &EmptyCondition::Array), PresentationState::Error);
}

#[tokio::test]
async fn test_concurrent_callers_share_one_request() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let addr = common::start_programmable_backend(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            (200, r#"[{"id":1,"name":"Ada"}]"#.to_string())
        }
    })
    .await;

    let client = client(3, TimeoutOptions::from_millis(5_000));
    let resource = resource(addr);
    let request = ResourceRequest::new("students")
        .unwrap()
        .with_param("class_id", "eq.7");

    let fetches = (0..5).map(|_| client.fetch_resource(resource.clone(), request.clone()));
    let results = futures_util::future::join_all(fetches).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1, "Backend should be hit once");
    for result in results {
        assert_eq!(
            result.unwrap(),
            TimeoutOutcome::Completed(json!([{"id": 1, "name": "Ada"}]))
        );
    }
    assert_eq!(client.flights().in_flight(), 0);
}

#[tokio::test]
async fn test_empty_payload_classifies_as_empty() {
    let addr = common::start_mock_backend("[]").await;

    let client = client(1, TimeoutOptions::from_millis(5_000));
    let request = ResourceRequest::new("assignments").unwrap();
    let snapshot = snapshot_from_outcome(client.fetch_resource(resource(addr), request).await);

    assert_eq!(classify(&snapshot, &EmptyCondition::Array), PresentationState::Empty);
    assert_eq!(classify(&snapshot, &EmptyCondition::Object), PresentationState::Success);
}

#[tokio::test]
async fn test_request_path_and_query_reach_backend() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    let addr = common::start_programmable_backend(move |target| {
        log.lock().unwrap().push(target);
        async { (200, r#"{"present":28}"#.to_string()) }
    })
    .await;

    let client = client(1, TimeoutOptions::from_millis(5_000));
    let request = ResourceRequest::new("attendance/summary")
        .unwrap()
        .with_param("day", "eq.2024-06-03");
    let outcome = client.fetch_resource(resource(addr), request).await.unwrap();

    assert_eq!(outcome, TimeoutOutcome::Completed(json!({"present": 28})));
    assert_eq!(
        seen.lock().unwrap().as_slice(),
        ["/rest/v1/attendance/summary?day=eq.2024-06-03"]
    );
}

#[tokio::test]
async fn test_malformed_json_is_a_decode_error() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = calls.clone();
    let addr = common::start_programmable_backend(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        async { (200, "not json".to_string()) }
    })
    .await;

    let client = client(2, TimeoutOptions::from_millis(5_000));
    let request = ResourceRequest::new("notices").unwrap();
    let err = client
        .fetch_resource(resource(addr), request)
        .await
        .unwrap_err();

    assert!(matches!(err, RemoteError::Decode(_)));
    assert!(!err.is_transient());
    // Every failure is retried, transient or not.
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_unlisted_statuses_reach_the_client() {
    for status in [403u16, 408, 418] {
        let addr = common::start_programmable_backend(move |_| async move {
            (status, r#"{"message":"nope"}"#.to_string())
        })
        .await;

        let client = client(1, TimeoutOptions::from_millis(5_000));
        let request = ResourceRequest::new("fees").unwrap();
        let err = client
            .fetch_resource(resource(addr), request)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            RemoteError::Status {
                status,
                body: r#"{"message":"nope"}"#.to_string()
            }
        );
        assert_eq!(err.is_transient(), status == 408);
    }
}
