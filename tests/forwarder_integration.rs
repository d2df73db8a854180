//! Integration tests for the forwarder against an in-process mock store

use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode, Uri},
    routing::{get, post},
    Json, Router,
};
use chrono::Local;

use nats_es_forwarder::forwarder;
use nats_es_forwarder::{dated_index, EndpointClient, ForwardError, MessageHandler, RawMessage};

/// One POST as seen by the mock store
#[derive(Debug, Clone)]
struct RecordedPost {
    path: String,
    content_type: Option<String>,
    body: serde_json::Value,
}

#[derive(Clone)]
struct MockStore {
    posts: Arc<Mutex<Vec<RecordedPost>>>,
    root_status: StatusCode,
    post_status: StatusCode,
}

impl MockStore {
    fn posts(&self) -> Vec<RecordedPost> {
        self.posts.lock().unwrap().clone()
    }
}

async fn root(State(store): State<MockStore>) -> (StatusCode, Json<serde_json::Value>) {
    (
        store.root_status,
        Json(serde_json::json!({
            "name": "node-1",
            "cluster_name": "logs",
            "version": {"number": "6.8.23"}
        })),
    )
}

async fn record(
    State(store): State<MockStore>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    let body = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    store.posts.lock().unwrap().push(RecordedPost {
        path: uri.path().to_string(),
        content_type: headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from),
        body,
    });

    if store.post_status.is_success() {
        (store.post_status, r#"{"result":"created"}"#.to_string())
    } else {
        (store.post_status, r#"{"error":"mapper_parsing_exception"}"#.to_string())
    }
}

/// Start a mock store and return its base URL
async fn spawn_store(root_status: StatusCode, post_status: StatusCode) -> (String, MockStore) {
    let store = MockStore {
        posts: Arc::new(Mutex::new(Vec::new())),
        root_status,
        post_status,
    };

    let app = Router::new()
        .route("/", get(root))
        .route("/*path", post(record))
        .with_state(store.clone());

    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), store)
}

fn handler_for(base_url: &str) -> MessageHandler {
    MessageHandler::new(EndpointClient::new(base_url, "log").unwrap())
}

/// Paths valid for `index_base` today (two candidates when the test straddles midnight)
fn today_paths(index_base: &str, before: chrono::NaiveDate) -> HashSet<String> {
    [before, Local::now().date_naive()]
        .into_iter()
        .map(|d| format!("/{}/log", dated_index(index_base, d)))
        .collect()
}

#[tokio::test]
async fn test_valid_message_posted_to_dated_index() {
    let (url, store) = spawn_store(StatusCode::OK, StatusCode::CREATED).await;
    let handler = handler_for(&url);

    let before = Local::now();
    let day = before.date_naive();
    let message = RawMessage::new("app.auth.login", r#"{"level":"info","msg":"hello"}"#);
    handler.process(&message).await.unwrap();
    let after = Local::now();

    let posts = store.posts();
    assert_eq!(posts.len(), 1);

    let post = &posts[0];
    assert!(today_paths("app-auth-login", day).contains(&post.path), "{}", post.path);
    assert_eq!(post.content_type.as_deref(), Some("application/json"));
    assert_eq!(post.body["level"], "info");
    assert_eq!(post.body["msg"], "hello");

    let time = post.body["time"].as_str().unwrap();
    let stamped = chrono::DateTime::parse_from_rfc3339(time).unwrap().timestamp();
    // The stamp has seconds precision, so compare whole seconds
    assert!(
        before.timestamp() <= stamped && stamped <= after.timestamp(),
        "{} outside [{}, {}]",
        time,
        before,
        after
    );
    assert_eq!(post.body.as_object().unwrap().len(), 3);
}

#[tokio::test]
async fn test_time_and_index_date_agree_across_midnight() {
    use chrono::{Duration, TimeZone};

    let (url, store) = spawn_store(StatusCode::OK, StatusCode::CREATED).await;
    let handler = handler_for(&url);
    let message = RawMessage::new("app.auth.login", r#"{"msg":"late"}"#);

    let before = Local.with_ymd_and_hms(2024, 6, 1, 23, 59, 59).earliest().unwrap();
    let after = before + Duration::seconds(2);
    handler.process_at(&message, before).await.unwrap();
    handler.process_at(&message, after).await.unwrap();

    let posts = store.posts();
    assert_eq!(posts.len(), 2);

    assert_eq!(posts[0].path, "/app-auth-login-2024-06-01/log");
    assert!(posts[0].body["time"].as_str().unwrap().starts_with("2024-06-01T23:59:59"));

    assert_eq!(posts[1].path, "/app-auth-login-2024-06-02/log");
    assert!(posts[1].body["time"].as_str().unwrap().starts_with("2024-06-02T00:00:01"));
}

#[tokio::test]
async fn test_malformed_payload_not_delivered() {
    let (url, store) = spawn_store(StatusCode::OK, StatusCode::CREATED).await;
    let handler = handler_for(&url);

    let message = RawMessage::new("app.auth.login", "not-json");
    let err = handler.process(&message).await.unwrap_err();
    assert!(matches!(err, ForwardError::Decode(_)));

    // handle() reports and drops
    handler.handle(&message).await;
    handler.handle(&RawMessage::new("app.auth.login", "[1,2]")).await;

    assert!(store.posts().is_empty());
}

#[tokio::test]
async fn test_unhealthy_endpoint_does_not_block_delivery() {
    let (url, store) = spawn_store(StatusCode::SERVICE_UNAVAILABLE, StatusCode::CREATED).await;
    let handler = handler_for(&url);

    let err = handler.endpoint().check_reachable().await.unwrap_err();
    assert!(matches!(err, ForwardError::Reachability { status: Some(503), .. }));

    handler
        .process(&RawMessage::new("svc.events", r#"{"n":1}"#))
        .await
        .unwrap();
    assert_eq!(store.posts().len(), 1);
}

#[tokio::test]
async fn test_healthy_endpoint() {
    let (url, _store) = spawn_store(StatusCode::OK, StatusCode::CREATED).await;
    let endpoint = EndpointClient::new(&url, "log").unwrap();
    endpoint.check_reachable().await.unwrap();
}

#[tokio::test]
async fn test_reachability_requires_exactly_200() {
    let (url, _store) = spawn_store(StatusCode::NO_CONTENT, StatusCode::CREATED).await;
    let endpoint = EndpointClient::new(&url, "log").unwrap();
    let err = endpoint.check_reachable().await.unwrap_err();
    assert_eq!(err.status(), Some(204));
}

#[tokio::test]
async fn test_rejected_post_is_delivery_error() {
    let (url, store) = spawn_store(StatusCode::OK, StatusCode::BAD_REQUEST).await;
    let handler = handler_for(&url);

    let err = handler
        .process(&RawMessage::new("app.auth.login", r#"{"msg":"hello"}"#))
        .await
        .unwrap_err();

    match err {
        ForwardError::Delivery { status, body, .. } => {
            assert_eq!(status, Some(400));
            assert!(body.unwrap().contains("mapper_parsing_exception"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    // One attempt, no retry
    assert_eq!(store.posts().len(), 1);
}

#[tokio::test]
async fn test_unreachable_store_is_delivery_error() {
    // Bind then drop a listener to get a local port with nothing behind it
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let handler = handler_for(&format!("http://{}", addr));
    let err = handler
        .process(&RawMessage::new("a.b", r#"{"x":1}"#))
        .await
        .unwrap_err();

    match &err {
        ForwardError::Delivery { status, source, .. } => {
            assert_eq!(*status, None);
            assert!(source.is_some());
        }
        other => panic!("unexpected error: {:?}", other),
    }

    let err = handler.endpoint().check_reachable().await.unwrap_err();
    assert!(matches!(err, ForwardError::Reachability { status: None, .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_messages_each_delivered_once() {
    let (url, store) = spawn_store(StatusCode::OK, StatusCode::CREATED).await;
    let handler = Arc::new(handler_for(&url));

    let day = Local::now().date_naive();
    let messages: Vec<RawMessage> = (0..100)
        .map(|i| RawMessage::new(format!("load.s{}", i), format!(r#"{{"seq":{}}}"#, i)))
        .collect();

    let summary = forwarder::run(
        Arc::clone(&handler),
        futures::stream::iter(messages),
        std::future::pending(),
        16,
    )
    .await;

    assert_eq!(summary.received, 100);
    assert_eq!(summary.completed, 100);

    let posts = store.posts();
    assert_eq!(posts.len(), 100);

    let mut seen = HashSet::new();
    for post in &posts {
        let seq = post.body["seq"].as_u64().unwrap();
        assert!(
            today_paths(&format!("load-s{}", seq), day).contains(&post.path),
            "document {} landed in {}",
            seq,
            post.path
        );
        assert!(post.body.get("time").is_some());
        assert!(seen.insert(seq), "document {} delivered twice", seq);
    }
    assert_eq!(seen.len(), 100);
}

#[tokio::test]
async fn test_same_subject_same_day_same_index() {
    let (url, store) = spawn_store(StatusCode::OK, StatusCode::CREATED).await;
    let handler = handler_for(&url);

    let day = Local::now().date_naive();
    for i in 0..3 {
        handler
            .process(&RawMessage::new("app.auth.login", format!(r#"{{"i":{}}}"#, i)))
            .await
            .unwrap();
    }

    let posts = store.posts();
    assert_eq!(posts.len(), 3);
    let paths: HashSet<_> = posts.iter().map(|p| p.path.clone()).collect();
    // Only differs if the test ran across midnight
    assert!(paths.len() <= 2);
    assert!(paths.is_subset(&today_paths("app-auth-login", day)));
}
