//! Prometheus metrics for pricecast.
//!
//! Covers the distribution pipeline end to end:
//! - Upstream fetch attempts and latency
//! - Poller output and skipped ticks
//! - Updates dropped under backpressure, by stage
//! - History writes per pair
//! - Connected subscribers
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. A registration failure
//! means duplicate metric names, which must crash at startup rather than
//! silently lose observability. These panics only occur during static
//! initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_counter, register_int_gauge,
    CounterVec, Encoder, HistogramVec, IntCounter, IntGauge, TextEncoder,
};

use crate::error::TelemetryResult;

/// Upstream fetch attempts by outcome.
pub static FETCH_ATTEMPTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "pricecast_fetch_attempts_total",
        "Upstream fetch attempts by outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Latency of a single upstream request in milliseconds.
pub static FETCH_LATENCY_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "pricecast_fetch_latency_ms",
        "Upstream request latency in milliseconds",
        &["pair"],
        vec![5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0]
    )
    .unwrap()
});

/// Price updates emitted by the poller.
pub static POLL_UPDATES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "pricecast_poll_updates_total",
        "Price updates emitted by the poller",
        &["pair"]
    )
    .unwrap()
});

/// Poll ticks skipped because the fetch failed.
pub static POLL_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "pricecast_poll_failures_total",
        "Poll ticks skipped after a failed fetch",
        &["pair"]
    )
    .unwrap()
});

/// Updates dropped under backpressure.
/// Labels: stage (relay/hub_ingress/subscriber_queue)
pub static DROPPED_UPDATES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "pricecast_dropped_updates_total",
        "Price updates dropped under backpressure",
        &["stage"]
    )
    .unwrap()
});

/// Updates accepted by the hub and fanned out.
pub static BROADCASTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "pricecast_broadcasts_total",
        "Price updates fanned out by the hub"
    )
    .unwrap()
});

/// Updates persisted to the history store.
pub static HISTORY_STORES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "pricecast_history_stores_total",
        "Price updates persisted to history",
        &["pair"]
    )
    .unwrap()
});

/// Subscribers currently registered in the hub.
pub static CONNECTED_SUBSCRIBERS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "pricecast_connected_subscribers",
        "Subscribers currently registered in the hub"
    )
    .unwrap()
});

/// Outcome label for a single fetch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Success,
    Retryable,
    Fatal,
}

impl FetchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Retryable => "retryable",
            Self::Fatal => "fatal",
        }
    }
}

/// Pipeline stage at which an update was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropStage {
    Relay,
    HubIngress,
    SubscriberQueue,
}

impl DropStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Relay => "relay",
            Self::HubIngress => "hub_ingress",
            Self::SubscriberQueue => "subscriber_queue",
        }
    }
}

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Record one upstream fetch attempt.
    pub fn fetch_attempt(outcome: FetchOutcome) {
        FETCH_ATTEMPTS_TOTAL
            .with_label_values(&[outcome.as_str()])
            .inc();
    }

    /// Record upstream request latency.
    pub fn fetch_latency(pair: &str, latency_ms: f64) {
        FETCH_LATENCY_MS
            .with_label_values(&[pair])
            .observe(latency_ms);
    }

    /// Record an update emitted by the poller.
    pub fn poll_update(pair: &str) {
        POLL_UPDATES_TOTAL.with_label_values(&[pair]).inc();
    }

    /// Record a skipped poll tick.
    pub fn poll_failure(pair: &str) {
        POLL_FAILURES_TOTAL.with_label_values(&[pair]).inc();
    }

    /// Record a dropped update.
    pub fn update_dropped(stage: DropStage) {
        DROPPED_UPDATES_TOTAL
            .with_label_values(&[stage.as_str()])
            .inc();
    }

    /// Record an accepted broadcast.
    pub fn broadcast() {
        BROADCASTS_TOTAL.inc();
    }

    /// Record an update persisted to history.
    pub fn history_stored(pair: &str) {
        HISTORY_STORES_TOTAL.with_label_values(&[pair]).inc();
    }

    /// Set the number of registered subscribers.
    pub fn subscribers_set(count: usize) {
        CONNECTED_SUBSCRIBERS.set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn encode_text() -> TelemetryResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
