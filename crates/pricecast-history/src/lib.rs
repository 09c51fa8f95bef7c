//! Bounded per-pair price history.
//!
//! Two interchangeable backends sit behind [`HistoryStore`]:
//! - [`RingHistory`]: fixed-capacity circular buffer (default)
//! - [`VecHistory`]: append-and-trim over a growable vector
//!
//! Both keep arrival order per pair and evict the oldest entry once a pair
//! holds `capacity` updates.

pub mod config;
pub mod error;
pub mod ring;
pub mod store;
pub mod vec;

pub use config::{HistoryBackend, HistoryConfig};
pub use error::{HistoryError, HistoryResult};
pub use ring::RingHistory;
pub use store::{build_history, HistoryStore};
pub use vec::VecHistory;
