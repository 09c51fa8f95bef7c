//! Broadcast hub actor.
//!
//! `HubTask` is the only owner of the subscriber set. Its loop selects
//! fairly over five sources:
//! - register requests
//! - unregister requests
//! - broadcast ingress
//! - the cleanup tick
//! - the shutdown token
//!
//! Accepted broadcasts are fanned out to every subscriber first and then
//! persisted to history.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use pricecast_core::{Pair, PriceUpdate, PublishError, UpdateSink};
use pricecast_history::HistoryStore;
use pricecast_telemetry::{DropStage, Metrics};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::config::HubConfig;
use crate::error::{HubError, HubResult, SendError};
use crate::subscriber::Subscriber;

// ============================================================================
// Membership requests
// ============================================================================

/// Register or unregister request, acknowledged once applied.
struct Membership {
    subscriber: Arc<Subscriber>,
    ack: oneshot::Sender<()>,
}

// ============================================================================
// HubTask
// ============================================================================

/// Hub actor task.
pub struct HubTask {
    register_rx: mpsc::Receiver<Membership>,
    unregister_rx: mpsc::Receiver<Membership>,
    ingress_rx: mpsc::Receiver<PriceUpdate>,
    shutdown: CancellationToken,
    cleanup_interval: std::time::Duration,

    /// Registered subscribers by serial.
    subscribers: HashMap<u64, Arc<Subscriber>>,
    history: Arc<dyn HistoryStore>,

    /// Published subscriber count (shared with handles).
    client_count: Arc<AtomicUsize>,
}

impl HubTask {
    /// Run the hub until shutdown or until every handle is dropped.
    pub async fn run(mut self) {
        info!("Hub started");

        let mut cleanup =
            tokio::time::interval_at(Instant::now() + self.cleanup_interval, self.cleanup_interval);
        cleanup.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => break,
                Some(req) = self.register_rx.recv() => self.on_register(req),
                Some(req) = self.unregister_rx.recv() => self.on_unregister(req),
                update = self.ingress_rx.recv() => match update {
                    Some(update) => self.on_broadcast(update),
                    None => {
                        debug!("All hub handles dropped");
                        break;
                    }
                },
                _ = cleanup.tick() => self.on_cleanup(),
            }
        }

        self.close_all();
        info!("Hub stopped");
    }

    fn on_register(&mut self, req: Membership) {
        let Membership { subscriber, ack } = req;
        debug!(
            client_id = %subscriber.id(),
            pair = %subscriber.pair(),
            "Registering subscriber"
        );
        self.subscribers.insert(subscriber.serial(), subscriber);
        self.publish_count();
        let _ = ack.send(());
    }

    fn on_unregister(&mut self, req: Membership) {
        let Membership { subscriber, ack } = req;
        if self.subscribers.remove(&subscriber.serial()).is_some() {
            debug!(client_id = %subscriber.id(), "Unregistered subscriber");
            self.publish_count();
        }
        subscriber.close();
        let _ = ack.send(());
    }

    fn on_broadcast(&mut self, update: PriceUpdate) {
        let mut skipped = 0usize;
        for subscriber in self.subscribers.values() {
            match subscriber.send(update.clone()) {
                Ok(()) => {}
                Err(SendError::QueueFull) => {
                    skipped += 1;
                    trace!(client_id = %subscriber.id(), "Subscriber queue full, skipping");
                }
                Err(SendError::Closed) => {}
            }
        }
        if skipped > 0 {
            warn!(skipped, pair = %update.pair(), "Skipped subscribers with full queues");
        }

        let pair = update.pair().to_string();
        self.history.store(update);
        Metrics::history_stored(&pair);
        Metrics::broadcast();
    }

    fn on_cleanup(&mut self) {
        let before = self.subscribers.len();
        self.subscribers.retain(|_, s| !s.is_closed());
        let removed = before - self.subscribers.len();
        if removed > 0 {
            debug!(removed, remaining = self.subscribers.len(), "Removed closed subscribers");
            self.publish_count();
        }
    }

    fn close_all(&mut self) {
        for subscriber in self.subscribers.values() {
            subscriber.close();
        }
        self.subscribers.clear();
        self.publish_count();
    }

    fn publish_count(&self) {
        let count = self.subscribers.len();
        self.client_count.store(count, Ordering::Release);
        Metrics::subscribers_set(count);
    }
}

// ============================================================================
// HubHandle
// ============================================================================

/// Cloneable handle to the hub actor.
#[derive(Clone)]
pub struct HubHandle {
    register_tx: mpsc::Sender<Membership>,
    unregister_tx: mpsc::Sender<Membership>,
    ingress_tx: mpsc::Sender<PriceUpdate>,
    shutdown: CancellationToken,
    history: Arc<dyn HistoryStore>,
    client_count: Arc<AtomicUsize>,
}

impl HubHandle {
    /// Add `subscriber`; returns once the hub has applied it.
    pub async fn register_client(&self, subscriber: &Arc<Subscriber>) -> HubResult<()> {
        if self.shutdown.is_cancelled() {
            return Err(HubError::Stopped);
        }
        let (ack, done) = oneshot::channel();
        self.register_tx
            .send(Membership {
                subscriber: subscriber.clone(),
                ack,
            })
            .await
            .map_err(|_| HubError::Stopped)?;
        done.await.map_err(|_| HubError::Stopped)
    }

    /// Remove and close `subscriber`; returns once the hub has applied it.
    ///
    /// The subscriber is closed even if the hub has stopped.
    pub async fn unregister_client(&self, subscriber: &Arc<Subscriber>) -> HubResult<()> {
        let (ack, done) = oneshot::channel();
        let sent = self
            .unregister_tx
            .send(Membership {
                subscriber: subscriber.clone(),
                ack,
            })
            .await;
        if sent.is_err() || done.await.is_err() {
            subscriber.close();
            return Err(HubError::Stopped);
        }
        Ok(())
    }

    /// Offer `update` for fan-out without waiting.
    pub fn broadcast(&self, update: PriceUpdate) -> Result<(), PublishError> {
        if self.shutdown.is_cancelled() {
            return Err(PublishError::Closed);
        }
        match self.ingress_tx.try_send(update) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(update)) => {
                Metrics::update_dropped(DropStage::HubIngress);
                warn!(pair = %update.pair(), "Hub ingress full, dropping update");
                Err(PublishError::Full)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(PublishError::Closed),
        }
    }

    /// Stored history for `pair`, optionally limited to entries at or after
    /// `since`.
    pub fn get_history(&self, pair: Pair, since: Option<DateTime<Utc>>) -> Vec<PriceUpdate> {
        match since {
            Some(since) => self.history.since(pair, since),
            None => self.history.all(pair),
        }
    }

    /// Number of registered subscribers.
    pub fn client_count(&self) -> usize {
        self.client_count.load(Ordering::Acquire)
    }

    /// Stop the hub and close every subscriber. Idempotent.
    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            info!("Hub shutdown requested");
            self.shutdown.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        !self.shutdown.is_cancelled() && !self.ingress_tx.is_closed()
    }
}

impl UpdateSink for HubHandle {
    fn try_publish(&self, update: PriceUpdate) -> Result<(), PublishError> {
        self.broadcast(update)
    }
}

// ============================================================================
// Spawn function
// ============================================================================

/// Spawn the hub actor.
///
/// Returns a handle for interaction and a join handle for the task.
pub fn spawn_hub(
    config: &HubConfig,
    history: Arc<dyn HistoryStore>,
) -> HubResult<(HubHandle, JoinHandle<()>)> {
    config.validate()?;

    let (register_tx, register_rx) = mpsc::channel(config.control_capacity);
    let (unregister_tx, unregister_rx) = mpsc::channel(config.control_capacity);
    let (ingress_tx, ingress_rx) = mpsc::channel(config.ingress_capacity);
    let shutdown = CancellationToken::new();
    let client_count = Arc::new(AtomicUsize::new(0));

    let task = HubTask {
        register_rx,
        unregister_rx,
        ingress_rx,
        shutdown: shutdown.clone(),
        cleanup_interval: config.cleanup_interval(),
        subscribers: HashMap::new(),
        history: history.clone(),
        client_count: client_count.clone(),
    };

    let handle = HubHandle {
        register_tx,
        unregister_tx,
        ingress_tx,
        shutdown,
        history,
        client_count,
    };

    let join_handle = tokio::spawn(task.run());

    Ok((handle, join_handle))
}

// ============================================================================
// Tests
// ============================================================================
