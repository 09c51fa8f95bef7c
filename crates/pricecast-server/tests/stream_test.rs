//! End-to-end streaming tests.
//!
//! Runs the full service against a mock upstream:
//! - Live SSE delivery to connected clients
//! - History replay via `since`
//! - Graceful shutdown with open streams

mod integration;
use integration::common::mock_upstream::MockUpstream;

use std::net::SocketAddr;
use std::time::Duration;

use pricecast_server::{AppConfig, Application};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

struct Service {
    addr: SocketAddr,
    cancel: CancellationToken,
    join: JoinHandle<pricecast_server::AppResult<()>>,
}

async fn start_service(upstream: &MockUpstream) -> Service {
    let mut config = AppConfig::default();
    config.upstream.url = upstream.url();
    config.upstream.retry.initial_wait_ms = 10;
    config.poller.interval_ms = 50;
    config.hub.cleanup_interval_ms = 50;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Application::new(config).unwrap();
    let cancel = app.cancel_token();
    let join = tokio::spawn(app.serve(listener, std::future::pending()));

    Service { addr, cancel, join }
}

/// Read from `response` until at least `frames` SSE frames have arrived.
async fn read_frames(response: &mut reqwest::Response, frames: usize) -> String {
    let mut text = String::new();
    timeout(Duration::from_secs(5), async {
        while text.matches("data: ").count() < frames {
            match response.chunk().await.unwrap() {
                Some(chunk) => text.push_str(&String::from_utf8_lossy(&chunk)),
                None => break,
            }
        }
    })
    .await
    .expect("frames not received in time");
    text
}

#[tokio::test]
async fn test_health_endpoint() {
    let upstream = MockUpstream::start().await;
    let service = start_service(&upstream).await;

    let body: serde_json::Value = reqwest::get(format!("http://{}/health", service.addr))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, serde_json::json!({"status": "ok"}));

    service.cancel.cancel();
    timeout(Duration::from_secs(5), service.join)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_live_stream_delivers_frames() {
    let upstream = MockUpstream::start().await;
    let service = start_service(&upstream).await;

    let mut response = reqwest::get(format!("http://{}/stream", service.addr))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/event-stream"
    );

    let text = read_frames(&mut response, 2).await;
    let first = text
        .split("\n\n")
        .find(|frame| frame.starts_with("data: "))
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&first["data: ".len()..]).unwrap();
    assert_eq!(json["pair"], "BTCUSD");
    assert!(json["price"].as_str().unwrap().starts_with("500"));
    assert!(json["received_at"].as_str().unwrap().ends_with('Z'));
    assert!(upstream.calls() >= 2);

    drop(response);
    service.cancel.cancel();
    timeout(Duration::from_secs(5), service.join)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_since_replays_history() {
    let upstream = MockUpstream::start().await;
    let service = start_service(&upstream).await;

    // Let a few updates accumulate.
    timeout(Duration::from_secs(5), async {
        while upstream.calls() < 3 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let mut response = reqwest::get(format!("http://{}/stream/BTCUSD?since=0", service.addr))
        .await
        .unwrap();
    let text = read_frames(&mut response, 2).await;

    // History is replayed oldest first, ahead of live updates.
    let first = text
        .split("\n\n")
        .find(|frame| frame.starts_with("data: "))
        .unwrap();
    assert!(first.contains("\"price\":\"50000\""), "{first}");

    drop(response);
    service.cancel.cancel();
    timeout(Duration::from_secs(5), service.join)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_bad_pair_is_rejected() {
    let upstream = MockUpstream::start().await;
    let service = start_service(&upstream).await;

    let response = reqwest::get(format!("http://{}/stream/NOPE", service.addr))
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    service.cancel.cancel();
    timeout(Duration::from_secs(5), service.join)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_shutdown_with_open_stream() {
    let upstream = MockUpstream::start().await;
    let service = start_service(&upstream).await;

    let mut response = reqwest::get(format!("http://{}/stream", service.addr))
        .await
        .unwrap();
    read_frames(&mut response, 1).await;

    service.cancel.cancel();
    timeout(Duration::from_secs(5), service.join)
        .await
        .expect("service did not stop with an open stream")
        .unwrap()
        .unwrap();

    // The stream ends once the hub closes its subscriber.
    let rest = timeout(Duration::from_secs(5), async {
        while let Ok(Some(_)) = response.chunk().await {}
    })
    .await;
    assert!(rest.is_ok());
}
