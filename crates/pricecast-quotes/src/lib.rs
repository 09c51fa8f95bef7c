//! Upstream quote fetching for pricecast.
//!
//! Retrieves one pair's price from the upstream provider with:
//! - Bounded retry with capped exponential backoff
//! - Cancellation-aware waits (a cancelled token aborts immediately)
//! - Fatal vs retryable failure classification

pub mod client;
pub mod config;
pub mod error;
pub mod source;

pub use client::HttpPriceSource;
pub use config::{RetryConfig, UpstreamConfig};
pub use error::{FetchError, FetchResult};
pub use source::{BoxFuture, PriceSource};
