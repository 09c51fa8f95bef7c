//! Poller-to-sink relay.

use std::sync::Arc;

use pricecast_core::{PriceUpdate, PublishError, UpdateSink};
use pricecast_telemetry::{DropStage, Metrics};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Counts reported when the relay exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    pub forwarded: u64,
    pub dropped: u64,
}

/// Forward every update from `updates` to `sink` until the stream closes.
///
/// Rejected updates are dropped and counted; the relay never waits on the
/// sink. Runs once and is not restarted.
pub fn spawn_relay(
    mut updates: mpsc::Receiver<PriceUpdate>,
    sink: Arc<dyn UpdateSink>,
) -> JoinHandle<RelayStats> {
    tokio::spawn(async move {
        let mut stats = RelayStats::default();

        while let Some(update) = updates.recv().await {
            let pair = update.pair();
            match sink.try_publish(update) {
                Ok(()) => stats.forwarded += 1,
                Err(e) => {
                    stats.dropped += 1;
                    // Full is counted by the sink at its ingress.
                    if e == PublishError::Closed {
                        Metrics::update_dropped(DropStage::Relay);
                    }
                    warn!(pair = %pair, error = %e, "Dropped price update");
                }
            }
        }

        info!(
            forwarded = stats.forwarded,
            dropped = stats.dropped,
            "Relay stopped"
        );
        stats
    })
}
