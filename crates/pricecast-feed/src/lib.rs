//! Price feed for pricecast.
//!
//! The [`Poller`] turns a [`PriceSource`](pricecast_quotes::PriceSource) into
//! a bounded stream of [`PriceUpdate`](pricecast_core::PriceUpdate)s; the
//! relay forwards that stream to an [`UpdateSink`](pricecast_core::UpdateSink)
//! without ever blocking on it.

pub mod config;
pub mod error;
pub mod poller;
pub mod relay;

pub use config::PollerConfig;
pub use error::{FeedError, FeedResult};
pub use poller::Poller;
pub use relay::{spawn_relay, RelayStats};
