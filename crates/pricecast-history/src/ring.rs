//! Fixed-capacity circular history.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use pricecast_core::{Pair, PriceUpdate};

use crate::error::{HistoryError, HistoryResult};
use crate::store::{suffix_since, HistoryStore};

/// Circular buffer. Grows to `capacity`, then overwrites the oldest slot.
#[derive(Debug)]
struct Ring {
    slots: Vec<PriceUpdate>,
    /// Index of the oldest entry once the ring is full, 0 before.
    start: usize,
}

impl Ring {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            start: 0,
        }
    }

    fn push(&mut self, update: PriceUpdate, capacity: usize) {
        if self.slots.len() < capacity {
            self.slots.push(update);
        } else {
            self.slots[self.start] = update;
            self.start = (self.start + 1) % capacity;
        }
    }

    fn iter(&self) -> impl DoubleEndedIterator<Item = &PriceUpdate> {
        let (newer, older) = self.slots.split_at(self.start);
        older.iter().chain(newer.iter())
    }

    fn last(&self) -> Option<&PriceUpdate> {
        if self.slots.is_empty() {
            return None;
        }
        let idx = (self.start + self.slots.len() - 1) % self.slots.len();
        self.slots.get(idx)
    }
}

/// History backed by one ring per pair.
#[derive(Debug)]
pub struct RingHistory {
    capacity: usize,
    rings: RwLock<HashMap<Pair, Ring>>,
}

impl RingHistory {
    pub fn new(capacity: usize) -> HistoryResult<Self> {
        if capacity == 0 {
            return Err(HistoryError::InvalidCapacity(capacity));
        }
        Ok(Self {
            capacity,
            rings: RwLock::new(HashMap::new()),
        })
    }
}

impl HistoryStore for RingHistory {
    fn store(&self, update: PriceUpdate) {
        let capacity = self.capacity;
        let mut rings = self.rings.write();
        rings
            .entry(update.pair())
            .or_insert_with(|| Ring::with_capacity(capacity))
            .push(update, capacity);
    }

    fn latest(&self, pair: Pair) -> Option<PriceUpdate> {
        self.rings.read().get(&pair).and_then(|r| r.last().cloned())
    }

    fn all(&self, pair: Pair) -> Vec<PriceUpdate> {
        self.rings
            .read()
            .get(&pair)
            .map(|r| r.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn since(&self, pair: Pair, since: DateTime<Utc>) -> Vec<PriceUpdate> {
        self.rings
            .read()
            .get(&pair)
            .map(|r| suffix_since(r.iter(), since))
            .unwrap_or_default()
    }

    fn clear(&self) {
        self.rings.write().clear();
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
