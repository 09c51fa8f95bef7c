//! Mock upstream price provider for integration tests.
//!
//! Answers `GET /data/price?fsym=..&tsyms=..` with a price that increases by
//! one on every call, starting at 50000.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

pub struct MockUpstream {
    addr: SocketAddr,
    calls: Arc<AtomicU64>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

async fn price(
    State(calls): State<Arc<AtomicU64>>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    let n = calls.fetch_add(1, Ordering::SeqCst);
    let currency = query.get("tsyms").cloned().unwrap_or_default();
    let mut body = serde_json::Map::new();
    body.insert(currency, json!(50_000 + n));
    Json(Value::Object(body))
}

impl MockUpstream {
    /// Start on an available port.
    pub async fn start() -> Self {
        let calls = Arc::new(AtomicU64::new(0));
        let app = Router::new()
            .route("/data/price", get(price))
            .with_state(calls.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            calls,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}/data/price", self.addr)
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockUpstream {
    fn drop(&mut self) {
        self.shutdown();
    }
}
