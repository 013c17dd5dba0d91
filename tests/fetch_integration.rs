use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use axum::{
    extract::State,
    http::{HeaderMap, Method, StatusCode},
    response::IntoResponse,
    routing::any,
    Json, Router,
};
use resilient_fetch::{
    FetchError, Fetcher, HttpResponse, LogLevel, Logger, MemorySink, RequestConfig, RetryPolicy,
};
use serde_json::{json, Value as JsonValue};

#[derive(Clone)]
struct MockState {
    statuses: Arc<Mutex<VecDeque<u16>>>,
    hits: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<String>>>,
}

async fn resource_handler(
    State(state): State<MockState>,
    method: Method,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);

    let content_type = headers
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-")
        .to_owned();
    state
        .seen
        .lock()
        .expect("seen mutex must not be poisoned")
        .push(format!("{method} {content_type} {body}"));

    // An empty queue keeps answering 500, like a backend that stays down.
    let status = state
        .statuses
        .lock()
        .expect("status queue mutex must not be poisoned")
        .pop_front()
        .unwrap_or(500);
    let status = StatusCode::from_u16(status).expect("mock status must be valid");

    (status, Json(json!({ "status": status.as_u16() })))
}

struct TestServer {
    base_url: String,
    hits: Arc<AtomicUsize>,
    seen: Arc<Mutex<Vec<String>>>,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl TestServer {
    fn url(&self) -> String {
        format!("{}/events", self.base_url)
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

async fn spawn_server(statuses: Vec<u16>) -> TestServer {
    let state = MockState {
        statuses: Arc::new(Mutex::new(statuses.into())),
        hits: Arc::new(AtomicUsize::new(0)),
        seen: Arc::new(Mutex::new(Vec::new())),
    };

    let app = Router::new()
        .route("/events", any(resource_handler))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("must bind test listener");
    let address = listener.local_addr().expect("must have local addr");
    let task = tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("mock server must run");
    });

    TestServer {
        base_url: format!("http://{address}"),
        hits: state.hits,
        seen: state.seen,
        task,
    }
}

fn retrying_fetcher(max_retries: u32, base_delay_ms: u64) -> (Fetcher, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let fetcher = Fetcher::new()
        .with_policy(
            RetryPolicy::default()
                .with_max_retries(max_retries)
                .with_base_delay_ms(base_delay_ms),
        )
        .with_logger(Logger::new("fetch_with_retry").with_sink(sink.clone()));
    (fetcher, sink)
}

#[tokio::test]
async fn first_attempt_success_is_returned_after_one_call() {
    let server = spawn_server(vec![200]).await;
    let (fetcher, sink) = retrying_fetcher(3, 10);

    let response = fetcher.get(&server.url()).await.expect("fetch must succeed");

    assert_eq!(response.status(), StatusCode::OK);
    let body: JsonValue = response.json().await.expect("body must be json");
    assert_eq!(body["status"], 200);
    assert_eq!(server.hits(), 1);
    assert!(sink.records().is_empty());
}

#[tokio::test]
async fn retries_server_error_then_returns_success() {
    let server = spawn_server(vec![500, 200]).await;
    let (fetcher, sink) = retrying_fetcher(3, 10);

    let response = fetcher.get(&server.url()).await.expect("fetch must succeed");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(server.hits(), 2);

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].level, LogLevel::Warn);
    assert!(records[0].line.contains("[fetch_with_retry:retry]"));
    assert!(records[0].line.contains("HTTP 500"));
}

#[tokio::test]
async fn client_errors_are_returned_without_retry() {
    for status in [400, 404] {
        let server = spawn_server(vec![status, 200]).await;
        let (fetcher, sink) = retrying_fetcher(5, 10);

        let response = fetcher.get(&server.url()).await.expect("fetch must resolve");

        assert_eq!(response.status().as_u16(), status);
        assert!(!HttpResponse::ok(&response));
        assert_eq!(server.hits(), 1);
        assert!(sink.records().is_empty());
    }
}

#[tokio::test]
async fn persistent_server_error_returns_last_response() {
    let server = spawn_server(vec![500, 500, 500]).await;
    let (fetcher, sink) = retrying_fetcher(2, 5);

    let response = fetcher
        .get(&server.url())
        .await
        .expect("exhausted status retries must resolve, not fail");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(server.hits(), 3);
    assert_eq!(sink.count(LogLevel::Warn), 2);
}

#[tokio::test]
async fn every_configured_status_is_retried() {
    let server = spawn_server(vec![502, 503, 200]).await;
    let (fetcher, sink) = retrying_fetcher(3, 5);

    let response = fetcher.get(&server.url()).await.expect("fetch must succeed");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(server.hits(), 3);
    let lines: Vec<String> = sink.records().into_iter().map(|record| record.line).collect();
    assert!(lines[0].contains("HTTP 502"));
    assert!(lines[1].contains("HTTP 503"));
}

#[tokio::test]
async fn per_call_policy_overrides_retryable_set() {
    let server = spawn_server(vec![429, 200]).await;
    let (fetcher, _sink) = retrying_fetcher(3, 5);
    let policy = fetcher.policy().clone().with_retryable_statuses([429]);

    let response = fetcher
        .fetch_with_policy(&server.url(), None, &policy)
        .await
        .expect("fetch must succeed");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn request_config_is_passed_through_on_every_attempt() {
    let server = spawn_server(vec![503, 201]).await;
    let (fetcher, _sink) = retrying_fetcher(1, 5);

    let response = fetcher
        .post_json(&server.url(), &json!({ "name": "Jazz in July" }))
        .await
        .expect("post must succeed");

    assert_eq!(response.status(), StatusCode::CREATED);
    let seen = server.seen.lock().expect("seen mutex").clone();
    let expected = r#"POST application/json {"name":"Jazz in July"}"#;
    assert_eq!(seen, vec![expected.to_owned(), expected.to_owned()]);
}

#[tokio::test]
async fn unreachable_host_fails_after_budget() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("must bind a throwaway listener");
    let address = listener.local_addr().expect("must have local addr");
    drop(listener);

    let (fetcher, sink) = retrying_fetcher(2, 1);
    let config = RequestConfig::default().with_timeout_ms(1_000);

    let err = fetcher
        .fetch(&format!("http://{address}/events"), Some(&config))
        .await
        .expect_err("closed port must fail");

    match err {
        FetchError::Transport(inner) => assert!(inner.is_connect() || inner.is_request()),
        other => panic!("expected transport error, got {other:?}"),
    }
    assert_eq!(sink.count(LogLevel::Warn), 2);
    assert!(sink.records()[0].line.contains("Network error"));
}
