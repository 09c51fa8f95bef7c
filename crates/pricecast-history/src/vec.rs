//! Append-and-trim history over a growable vector.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use pricecast_core::{Pair, PriceUpdate};

use crate::error::{HistoryError, HistoryResult};
use crate::store::{suffix_since, HistoryStore};

/// Per-pair vector with a logical head.
///
/// Evicted entries stay in place until the dead prefix reaches `capacity`,
/// then the prefix is drained in one step.
#[derive(Debug, Default)]
struct Buffer {
    entries: Vec<PriceUpdate>,
    head: usize,
}

impl Buffer {
    fn push(&mut self, update: PriceUpdate, capacity: usize) {
        self.entries.push(update);
        if self.entries.len() - self.head > capacity {
            self.head += 1;
        }
        if self.head >= capacity {
            self.entries.drain(..self.head);
            self.head = 0;
        }
    }

    fn live(&self) -> &[PriceUpdate] {
        &self.entries[self.head..]
    }
}

/// History backed by one vector per pair.
#[derive(Debug)]
pub struct VecHistory {
    capacity: usize,
    buffers: RwLock<HashMap<Pair, Buffer>>,
}

impl VecHistory {
    pub fn new(capacity: usize) -> HistoryResult<Self> {
        if capacity == 0 {
            return Err(HistoryError::InvalidCapacity(capacity));
        }
        Ok(Self {
            capacity,
            buffers: RwLock::new(HashMap::new()),
        })
    }
}

impl HistoryStore for VecHistory {
    fn store(&self, update: PriceUpdate) {
        let mut buffers = self.buffers.write();
        buffers
            .entry(update.pair())
            .or_default()
            .push(update, self.capacity);
    }

    fn latest(&self, pair: Pair) -> Option<PriceUpdate> {
        self.buffers
            .read()
            .get(&pair)
            .and_then(|b| b.live().last().cloned())
    }

    fn all(&self, pair: Pair) -> Vec<PriceUpdate> {
        self.buffers
            .read()
            .get(&pair)
            .map(|b| b.live().to_vec())
            .unwrap_or_default()
    }

    fn since(&self, pair: Pair, since: DateTime<Utc>) -> Vec<PriceUpdate> {
        self.buffers
            .read()
            .get(&pair)
            .map(|b| suffix_since(b.live().iter(), since))
            .unwrap_or_default()
    }

    fn clear(&self) {
        self.buffers.write().clear();
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
