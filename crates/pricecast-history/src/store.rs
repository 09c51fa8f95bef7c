//! History store trait and backend selection.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use pricecast_core::{Pair, PriceUpdate};

use crate::config::{HistoryBackend, HistoryConfig};
use crate::error::HistoryResult;
use crate::ring::RingHistory;
use crate::vec::VecHistory;

/// Bounded, per-pair, insertion-ordered price history.
///
/// Writers take an exclusive lock, readers a shared one. Every returned
/// vector is an owned copy.
pub trait HistoryStore: Send + Sync {
    /// Append `update` to its pair's history, evicting the oldest entry past
    /// capacity.
    fn store(&self, update: PriceUpdate);

    /// Most recent update for `pair`.
    fn latest(&self, pair: Pair) -> Option<PriceUpdate>;

    /// Full history for `pair`, oldest first.
    fn all(&self, pair: Pair) -> Vec<PriceUpdate>;

    /// Longest suffix of [`all`](Self::all) whose timestamps are all at or
    /// after `since`.
    fn since(&self, pair: Pair, since: DateTime<Utc>) -> Vec<PriceUpdate>;

    /// Drop every pair's history.
    fn clear(&self);

    /// Per-pair capacity.
    fn capacity(&self) -> usize;
}

/// Build the configured backend.
pub fn build_history(config: &HistoryConfig) -> HistoryResult<Arc<dyn HistoryStore>> {
    let store: Arc<dyn HistoryStore> = match config.backend {
        HistoryBackend::Ring => Arc::new(RingHistory::new(config.capacity)?),
        HistoryBackend::Vec => Arc::new(VecHistory::new(config.capacity)?),
    };
    Ok(store)
}

/// Collect the trailing run of `entries` stamped at or after `since`.
pub(crate) fn suffix_since<'a, I>(entries: I, since: DateTime<Utc>) -> Vec<PriceUpdate>
where
    I: DoubleEndedIterator<Item = &'a PriceUpdate>,
{
    let mut suffix: Vec<PriceUpdate> = entries
        .rev()
        .take_while(|u| u.received_at() >= since)
        .cloned()
        .collect();
    suffix.reverse();
    suffix
}
