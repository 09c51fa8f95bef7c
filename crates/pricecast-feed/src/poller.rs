//! Interval-driven price poller.

use std::sync::Arc;
use std::time::Duration;

use pricecast_core::{Pair, PriceUpdate};
use pricecast_quotes::{FetchError, PriceSource};
use pricecast_telemetry::Metrics;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::PollerConfig;
use crate::error::{FeedError, FeedResult};

/// Fetches one pair on a fixed interval and emits the results.
pub struct Poller {
    source: Arc<dyn PriceSource>,
    config: PollerConfig,
}

impl Poller {
    /// Create a poller. Zero interval or buffer size is rejected.
    pub fn new(source: Arc<dyn PriceSource>, config: PollerConfig) -> FeedResult<Self> {
        if config.interval_ms == 0 {
            return Err(FeedError::InvalidConfig(
                "interval_ms must be positive".to_string(),
            ));
        }
        if config.buffer_size == 0 {
            return Err(FeedError::InvalidConfig(
                "buffer_size must be positive".to_string(),
            ));
        }
        Ok(Self { source, config })
    }

    /// Start polling `pair`.
    ///
    /// The first fetch happens one interval after the call. A failed fetch
    /// skips its tick. When the queue is full the poller waits for the
    /// consumer. The receiver closes once `cancel` fires.
    pub fn start(
        &self,
        cancel: CancellationToken,
        pair: Pair,
    ) -> (mpsc::Receiver<PriceUpdate>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(self.config.buffer_size);
        let task = PollTask {
            source: self.source.clone(),
            pair,
            interval: self.config.interval(),
            tx,
            cancel,
        };
        (rx, tokio::spawn(task.run()))
    }
}

struct PollTask {
    source: Arc<dyn PriceSource>,
    pair: Pair,
    interval: Duration,
    tx: mpsc::Sender<PriceUpdate>,
    cancel: CancellationToken,
}

impl PollTask {
    async fn run(self) {
        let pair = self.pair;
        let label = pair.to_string();
        info!(
            pair = %pair,
            interval_ms = pricecast_telemetry::millis(self.interval),
            "Poller started"
        );

        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let price = match self.source.get_price(pair, &self.cancel).await {
                Ok(price) => price,
                Err(FetchError::Cancelled) => break,
                Err(e) => {
                    error!(pair = %pair, error = %e, "Failed to fetch price, skipping tick");
                    Metrics::poll_failure(&label);
                    continue;
                }
            };

            let update = PriceUpdate::now(pair, price);
            tokio::select! {
                result = self.tx.send(update) => {
                    if result.is_err() {
                        debug!(pair = %pair, "Update receiver dropped");
                        break;
                    }
                    Metrics::poll_update(&label);
                    debug!(pair = %pair, price = %price, "Emitted price update");
                }
                () = self.cancel.cancelled() => break,
            }
        }

        info!(pair = %pair, "Poller stopped");
    }
}
