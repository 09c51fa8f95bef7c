//! HTTP routes using axum.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use pricecast_core::Pair;
use pricecast_hub::{HubHandle, Subscriber};
use pricecast_telemetry::Metrics;
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::sse::ChannelSink;

/// Shared state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    hub: HubHandle,
    default_pair: Pair,
    queue_size: usize,
    metrics_enabled: bool,
}

impl AppState {
    pub fn new(hub: HubHandle, default_pair: Pair, queue_size: usize, metrics_enabled: bool) -> Self {
        Self {
            hub,
            default_pair,
            queue_size,
            metrics_enabled,
        }
    }
}

/// Build the router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/stream", get(default_stream_handler))
        .route("/stream/{pair}", get(pair_stream_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    if !state.metrics_enabled {
        return StatusCode::NOT_FOUND.into_response();
    }
    match Metrics::encode_text() {
        Ok(text) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct StreamQuery {
    /// Unix seconds; replay history at or after this instant.
    since: Option<i64>,
}

async fn default_stream_handler(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> Response {
    let pair = state.default_pair;
    open_stream(state, pair, query).await
}

async fn pair_stream_handler(
    State(state): State<AppState>,
    Path(pair): Path<String>,
    Query(query): Query<StreamQuery>,
) -> Response {
    match pair.parse::<Pair>() {
        Ok(pair) => open_stream(state, pair, query).await,
        Err(e) => (StatusCode::BAD_REQUEST, format!("Invalid pair: {e}")).into_response(),
    }
}

async fn open_stream(state: AppState, pair: Pair, query: StreamQuery) -> Response {
    let since = match query.since.map(|secs| DateTime::<Utc>::from_timestamp(secs, 0)) {
        None => None,
        Some(Some(since)) => Some(since),
        Some(None) => {
            return (StatusCode::BAD_REQUEST, "Invalid since timestamp").into_response();
        }
    };

    let client_id = Uuid::new_v4().to_string();
    let (sink, body) = ChannelSink::new();
    let subscriber = match Subscriber::new(client_id.clone(), pair, Arc::new(sink), state.queue_size)
    {
        Ok(subscriber) => subscriber,
        Err(e) => {
            warn!(client_id = %client_id, error = %e, "Failed to create subscriber");
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    if let Err(e) = state.hub.register_client(&subscriber).await {
        warn!(client_id = %client_id, error = %e, "Failed to register subscriber");
        return (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response();
    }

    // Snapshot after registering: every update is either in the snapshot or
    // queued live, and replay marks the snapshot's entries so the live loop
    // skips them.
    let history = match since {
        Some(since) => state.hub.get_history(pair, Some(since)),
        None => Vec::new(),
    };
    info!(client_id = %client_id, pair = %pair, replay = history.len(), "Client connected");

    let hub = state.hub.clone();
    tokio::spawn(async move {
        match subscriber.replay(&history).await {
            Ok(()) => {
                let exit = subscriber.listen().await;
                info!(client_id = %subscriber.id(), ?exit, "Client stream ended");
            }
            Err(e) => {
                debug!(client_id = %subscriber.id(), error = %e, "Replay failed");
            }
        }
        if let Err(e) = hub.unregister_client(&subscriber).await {
            debug!(client_id = %subscriber.id(), error = %e, "Unregister after stream end");
        }
    });

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        body,
    )
        .into_response()
}
