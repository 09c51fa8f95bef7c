//! Price update record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Pair, Price};

/// Immutable record of a pair's price at the moment it was captured.
///
/// Created once by the poller and passed unmodified through relay, hub,
/// subscriber queues and the history store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceUpdate {
    pair: Pair,
    price: Price,
    received_at: DateTime<Utc>,
}

impl PriceUpdate {
    pub fn new(pair: Pair, price: Price, received_at: DateTime<Utc>) -> Self {
        Self {
            pair,
            price,
            received_at,
        }
    }

    /// Create an update stamped with the current time.
    pub fn now(pair: Pair, price: Price) -> Self {
        Self::new(pair, price, Utc::now())
    }

    pub fn pair(&self) -> Pair {
        self.pair
    }

    pub fn price(&self) -> Price {
        self.price
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }
}
