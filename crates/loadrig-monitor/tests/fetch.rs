//! LogMonitor against a stub generator.

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use loadrig_monitor::{LogMonitor, MonitorError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct Stub {
    body: Mutex<String>,
    fail: AtomicBool,
    names_seen: Mutex<Vec<String>>,
}

async fn log(
    State(stub): State<Arc<Stub>>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<String, StatusCode> {
    if let Some(name) = query.get("name") {
        stub.names_seen.lock().unwrap().push(name.clone());
    }
    if stub.fail.load(Ordering::SeqCst) {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    Ok(stub.body.lock().unwrap().clone())
}

async fn spawn_stub() -> (String, Arc<Stub>) {
    let stub = Arc::new(Stub::default());
    let router = Router::new()
        .route("/log", get(log))
        .with_state(stub.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (addr.to_string(), stub)
}

#[tokio::test]
async fn test_sample_parses_and_mirrors() {
    let (addr, stub) = spawn_stub().await;
    *stub.body.lock().unwrap() = "[Test]\n[Current rps=12.5]\n[Current rps=30.0]\n".to_string();

    let dir = tempfile::tempdir().unwrap();
    let monitor = LogMonitor::new(reqwest::Client::new(), &addr, "1755866400", dir.path());

    let sample = monitor.sample().await.unwrap();
    assert_eq!(sample.throughput, 30.0);
    assert!(!sample.completed);

    assert_eq!(
        stub.names_seen.lock().unwrap().as_slice(),
        ["test.1755866400.log"]
    );
    let mirrored = std::fs::read_to_string(monitor.snapshot_path()).unwrap();
    assert!(mirrored.contains("[Current rps=30.0]"));
}

#[tokio::test]
async fn test_completion_marker_is_surfaced() {
    let (addr, stub) = spawn_stub().await;
    *stub.body.lock().unwrap() = "[Current rps=48.0]\n[Test finished]\n".to_string();

    let dir = tempfile::tempdir().unwrap();
    let monitor = LogMonitor::new(reqwest::Client::new(), &addr, "7", dir.path());

    let sample = monitor.sample().await.unwrap();
    assert!(sample.completed);
    assert_eq!(sample.throughput, 48.0);
}

#[tokio::test]
async fn test_non_success_status_is_reported() {
    let (addr, stub) = spawn_stub().await;
    stub.fail.store(true, Ordering::SeqCst);

    let dir = tempfile::tempdir().unwrap();
    let monitor = LogMonitor::new(reqwest::Client::new(), &addr, "7", dir.path());

    let err = monitor.sample().await.unwrap_err();
    assert!(matches!(err, MonitorError::Status { status: 500, .. }));
}

#[tokio::test]
async fn test_unreachable_generator_is_a_fetch_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let dir = tempfile::tempdir().unwrap();
    let monitor = LogMonitor::new(reqwest::Client::new(), addr.to_string(), "7", dir.path());

    let err = monitor.sample().await.unwrap_err();
    assert!(matches!(err, MonitorError::Fetch(_)));
}

#[tokio::test]
async fn test_snapshot_tracks_latest_fetch() {
    let (addr, stub) = spawn_stub().await;
    let dir = tempfile::tempdir().unwrap();
    let monitor = LogMonitor::new(reqwest::Client::new(), &addr, "7", dir.path());

    *stub.body.lock().unwrap() = "[Current rps=10.0]\n".to_string();
    monitor.sample().await.unwrap();
    *stub.body.lock().unwrap() = "[Current rps=10.0]\n[Current rps=25.0]\n".to_string();
    let sample = monitor.sample().await.unwrap();

    assert_eq!(sample.throughput, 25.0);
    let mirrored = std::fs::read_to_string(monitor.snapshot_path()).unwrap();
    assert!(mirrored.contains("25.0"));
}
