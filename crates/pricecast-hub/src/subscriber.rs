//! Streaming subscriber with a bounded delivery queue.
//!
//! The hub enqueues with [`Subscriber::send`], which never blocks. A single
//! [`Subscriber::listen`] loop drains the queue, drops updates for other
//! pairs and writes the rest to the sink.
//!
//! Close state is one atomic tri-state (`OPEN -> CLOSING -> CLOSED`). The
//! caller that wins `OPEN -> CLOSING` wakes the delivery loop.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use pricecast_core::{Pair, PriceUpdate};
use pricecast_telemetry::{DropStage, Metrics};
use tokio::sync::{mpsc, Mutex, Notify};
use tracing::{debug, trace, warn};

use crate::error::{HubError, HubResult, SendError, SinkError};
use crate::sink::EventSink;
use crate::wire::encode_frame;

const OPEN: u8 = 0;
const CLOSING: u8 = 1;
const CLOSED: u8 = 2;

static NEXT_SERIAL: AtomicU64 = AtomicU64::new(1);

/// Why [`Subscriber::listen`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenExit {
    /// The subscriber was closed.
    Closed,
    /// A write or flush failed; the subscriber closed itself.
    Disconnected,
    /// Another delivery loop is already running.
    AlreadyListening,
}

/// One streaming client bound to a pair and a sink.
pub struct Subscriber {
    serial: u64,
    id: String,
    pair: Pair,
    sink: Arc<dyn EventSink>,
    tx: mpsc::Sender<PriceUpdate>,
    rx: Mutex<mpsc::Receiver<PriceUpdate>>,
    state: AtomicU8,
    closed: Notify,
    /// Capture time of the newest replayed update; live updates at or before
    /// it were already written.
    replayed_through: parking_lot::Mutex<Option<DateTime<Utc>>>,
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("serial", &self.serial)
            .field("id", &self.id)
            .field("pair", &self.pair)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Subscriber {
    /// Create a subscriber.
    ///
    /// Fails with `StreamingUnsupported` if `sink` cannot flush incrementally
    /// and with `InvalidQueueSize` for a zero queue.
    pub fn new(
        id: impl Into<String>,
        pair: Pair,
        sink: Arc<dyn EventSink>,
        queue_size: usize,
    ) -> HubResult<Arc<Self>> {
        if !sink.supports_flush() {
            return Err(HubError::StreamingUnsupported);
        }
        if queue_size == 0 {
            return Err(HubError::InvalidQueueSize);
        }

        let (tx, rx) = mpsc::channel(queue_size);
        Ok(Arc::new(Self {
            serial: NEXT_SERIAL.fetch_add(1, Ordering::Relaxed),
            id: id.into(),
            pair,
            sink,
            tx,
            rx: Mutex::new(rx),
            state: AtomicU8::new(OPEN),
            closed: Notify::new(),
            replayed_through: parking_lot::Mutex::new(None),
        }))
    }

    /// Process-unique identity used by the hub.
    pub(crate) fn serial(&self) -> u64 {
        self.serial
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn pair(&self) -> Pair {
        self.pair
    }

    pub fn is_closed(&self) -> bool {
        self.state.load(Ordering::Acquire) != OPEN
    }

    /// Enqueue without waiting.
    ///
    /// A full queue rejects the update and leaves queued entries untouched.
    pub fn send(&self, update: PriceUpdate) -> Result<(), SendError> {
        if self.is_closed() {
            return Err(SendError::Closed);
        }
        match self.tx.try_send(update) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                Metrics::update_dropped(DropStage::SubscriberQueue);
                Err(SendError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(SendError::Closed),
        }
    }

    /// Close the subscriber. Safe to call any number of times from any task.
    pub fn close(&self) {
        if self
            .state
            .compare_exchange(OPEN, CLOSING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            // Stores a permit if the delivery loop is not currently waiting.
            self.closed.notify_one();
            self.state.store(CLOSED, Ordering::Release);
            debug!(client_id = %self.id, pair = %self.pair, "Subscriber closed");
        }
    }

    /// Write the entries of `history` for this pair, then flush once.
    ///
    /// Queued live updates captured at or before the newest replayed entry
    /// are skipped by [`Subscriber::listen`], so a subscriber may be
    /// registered before its history snapshot is taken.
    pub async fn replay(&self, history: &[PriceUpdate]) -> Result<(), SinkError> {
        let mut written = 0usize;
        let mut newest: Option<DateTime<Utc>> = None;
        for update in history.iter().filter(|u| u.pair() == self.pair) {
            let frame = encode_frame(update)?;
            self.sink.write(&frame).await?;
            newest = newest.max(Some(update.received_at()));
            written += 1;
        }
        if newest.is_some() {
            let mut through = self.replayed_through.lock();
            *through = (*through).max(newest);
        }
        if written > 0 {
            self.sink.flush().await?;
            debug!(client_id = %self.id, count = written, "Replayed history");
        }
        Ok(())
    }

    /// Deliver queued updates until closed or the client goes away.
    ///
    /// A disconnect is noticed through [`EventSink::closed`] even when no
    /// update for this pair ever arrives. Only one loop may run per
    /// subscriber.
    pub async fn listen(&self) -> ListenExit {
        let Ok(mut rx) = self.rx.try_lock() else {
            return ListenExit::AlreadyListening;
        };

        loop {
            if self.is_closed() {
                return ListenExit::Closed;
            }

            let update = tokio::select! {
                () = self.closed.notified() => return ListenExit::Closed,
                () = self.sink.closed() => {
                    debug!(client_id = %self.id, "Client went away");
                    self.close();
                    return ListenExit::Disconnected;
                }
                update = rx.recv() => match update {
                    Some(update) => update,
                    None => return ListenExit::Closed,
                },
            };

            if update.pair() != self.pair {
                trace!(client_id = %self.id, pair = %update.pair(), "Skipping update for other pair");
                continue;
            }

            if self.already_replayed(&update) {
                trace!(client_id = %self.id, "Skipping update already replayed");
                continue;
            }

            if let Err(e) = self.deliver(&update).await {
                warn!(client_id = %self.id, error = %e, "Subscriber disconnected");
                self.close();
                return ListenExit::Disconnected;
            }
        }
    }

    fn already_replayed(&self, update: &PriceUpdate) -> bool {
        matches!(*self.replayed_through.lock(), Some(through) if update.received_at() <= through)
    }

    async fn deliver(&self, update: &PriceUpdate) -> Result<(), SinkError> {
        let frame = encode_frame(update)?;
        self.sink.write(&frame).await?;
        self.sink.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MockEventSink;
    use pricecast_core::Price;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn update(pair: Pair, price: Price) -> PriceUpdate {
        PriceUpdate::now(pair, price)
    }

    fn subscriber(queue_size: usize) -> (Arc<Subscriber>, Arc<MockEventSink>) {
        let sink = Arc::new(MockEventSink::new());
        let sub = Subscriber::new("client-1", Pair::BTC_USD, sink.clone(), queue_size).unwrap();
        (sub, sink)
    }

    #[test]
    fn test_new_requires_flush_support() {
        let sink = Arc::new(MockEventSink::without_flush());
        let err = Subscriber::new("c", Pair::BTC_USD, sink, 4).unwrap_err();
        assert_eq!(err, HubError::StreamingUnsupported);
    }

    #[test]
    fn test_new_rejects_zero_queue() {
        let sink = Arc::new(MockEventSink::new());
        let err = Subscriber::new("c", Pair::BTC_USD, sink, 0).unwrap_err();
        assert_eq!(err, HubError::InvalidQueueSize);
    }

    #[test]
    fn test_serials_are_unique() {
        let (a, _) = subscriber(1);
        let (b, _) = subscriber(1);
        assert_ne!(a.serial(), b.serial());
        assert_eq!(a.id(), b.id());
    }

    #[tokio::test]
    async fn test_send_full_queue_keeps_contents() {
        let (sub, sink) = subscriber(2);
        sub.send(update(Pair::BTC_USD, Price::new(dec!(1)))).unwrap();
        sub.send(update(Pair::BTC_USD, Price::new(dec!(2)))).unwrap();
        assert_eq!(
            sub.send(update(Pair::BTC_USD, Price::new(dec!(3)))),
            Err(SendError::QueueFull)
        );

        let listener = {
            let sub = sub.clone();
            tokio::spawn(async move { sub.listen().await })
        };
        tokio::time::timeout(Duration::from_secs(1), async {
            while sink.frame_count() < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        let text = sink.flushed_text();
        assert!(text.contains("\"price\":\"1\""));
        assert!(text.contains("\"price\":\"2\""));
        assert!(!text.contains("\"price\":\"3\""));

        sub.close();
        assert_eq!(listener.await.unwrap(), ListenExit::Closed);
    }

    #[test]
    fn test_send_after_close() {
        let (sub, _) = subscriber(2);
        sub.close();
        assert_eq!(
            sub.send(update(Pair::BTC_USD, Price::ZERO)),
            Err(SendError::Closed)
        );
    }

    #[tokio::test]
    async fn test_close_is_idempotent_under_concurrency() {
        let (sub, _) = subscriber(2);
        let closers: Vec<_> = (0..8)
            .map(|_| {
                let sub = sub.clone();
                tokio::spawn(async move {
                    sub.close();
                    sub.is_closed()
                })
            })
            .collect();
        for closer in closers {
            assert!(closer.await.unwrap());
        }
        sub.close();
        assert!(sub.is_closed());
    }

    #[tokio::test]
    async fn test_listen_after_close_returns_immediately() {
        let (sub, _) = subscriber(2);
        sub.close();
        let exit = tokio::time::timeout(Duration::from_secs(1), sub.listen())
            .await
            .unwrap();
        assert_eq!(exit, ListenExit::Closed);
    }

    #[tokio::test]
    async fn test_second_listen_rejected() {
        let (sub, _) = subscriber(2);
        let first = {
            let sub = sub.clone();
            tokio::spawn(async move { sub.listen().await })
        };
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(sub.listen().await, ListenExit::AlreadyListening);

        sub.close();
        assert_eq!(first.await.unwrap(), ListenExit::Closed);
    }

    #[tokio::test]
    async fn test_write_failure_disconnects() {
        let (sub, sink) = subscriber(2);
        sink.set_disconnected(true);
        sub.send(update(Pair::BTC_USD, Price::ZERO)).unwrap();

        let exit = tokio::time::timeout(Duration::from_secs(1), sub.listen())
            .await
            .unwrap();
        assert_eq!(exit, ListenExit::Disconnected);
        assert!(sub.is_closed());
    }

    #[tokio::test]
    async fn test_client_gone_detected_without_matching_update() {
        let sink = Arc::new(MockEventSink::new());
        let eth_usd: Pair = "ETHUSD".parse().unwrap();
        let sub = Subscriber::new("eth-client", eth_usd, sink.clone(), 4).unwrap();
        let listener = {
            let sub = sub.clone();
            tokio::spawn(async move { sub.listen().await })
        };

        // Only other-pair traffic: nothing is ever written to this sink.
        sub.send(update(Pair::BTC_USD, Price::new(dec!(1)))).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!listener.is_finished());

        sink.set_disconnected(true);
        let exit = tokio::time::timeout(Duration::from_secs(1), listener)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(exit, ListenExit::Disconnected);
        assert!(sub.is_closed());
        assert_eq!(sink.frame_count(), 0);
    }

    #[tokio::test]
    async fn test_live_updates_already_replayed_are_skipped() {
        let (sub, sink) = subscriber(4);
        let base = chrono::Utc::now();
        let first = PriceUpdate::new(Pair::BTC_USD, Price::new(dec!(1)), base);
        let second = PriceUpdate::new(
            Pair::BTC_USD,
            Price::new(dec!(2)),
            base + chrono::Duration::seconds(1),
        );

        // Registered before the snapshot: the first update is both queued
        // live and part of the replayed history.
        sub.send(first.clone()).unwrap();
        sub.send(second).unwrap();
        sub.replay(&[first]).await.unwrap();

        let listener = {
            let sub = sub.clone();
            tokio::spawn(async move { sub.listen().await })
        };
        tokio::time::timeout(Duration::from_secs(1), async {
            while sink.frame_count() < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let text = sink.flushed_text();
        assert_eq!(sink.frame_count(), 2);
        assert_eq!(text.matches("\"price\":\"1\"").count(), 1);
        assert!(text.find("\"price\":\"1\"") < text.find("\"price\":\"2\""));

        sub.close();
        assert_eq!(listener.await.unwrap(), ListenExit::Closed);
    }

    #[tokio::test]
    async fn test_replay_filters_pair_and_flushes_once() {
        let (sub, sink) = subscriber(2);
        let eth_usd: Pair = "ETHUSD".parse().unwrap();
        let history = vec![
            update(Pair::BTC_USD, Price::new(dec!(1))),
            update(eth_usd, Price::new(dec!(2))),
            update(Pair::BTC_USD, Price::new(dec!(3))),
        ];

        sub.replay(&history).await.unwrap();

        assert_eq!(sink.flushes().len(), 1);
        assert_eq!(sink.frame_count(), 2);
        assert!(!sink.flushed_text().contains("ETHUSD"));
    }
}
