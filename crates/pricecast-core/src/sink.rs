//! Non-blocking publication seam.
//!
//! Producers (the relay) hand updates to an `UpdateSink` without ever waiting.
//! The hub implements it; tests substitute recording sinks.

use thiserror::Error;

use crate::PriceUpdate;

/// Why an update was not accepted.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PublishError {
    /// Ingress is momentarily saturated; the update was dropped.
    #[error("ingress full, update dropped")]
    Full,

    /// The receiving side has shut down.
    #[error("sink closed")]
    Closed,
}

/// Destination that accepts price updates without blocking the caller.
pub trait UpdateSink: Send + Sync {
    /// Offer one update. Must return immediately.
    fn try_publish(&self, update: PriceUpdate) -> Result<(), PublishError>;
}
