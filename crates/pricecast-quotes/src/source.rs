//! Price source trait.
//!
//! Abstracts the upstream so the poller can be driven by the HTTP client in
//! production and by scripted sources in tests.

use std::future::Future;
use std::pin::Pin;

use pricecast_core::{Pair, Price};
use tokio_util::sync::CancellationToken;

use crate::error::FetchResult;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Something that can quote a pair's current price.
pub trait PriceSource: Send + Sync {
    /// Fetch the current price of `pair`.
    ///
    /// Implementations must return `FetchError::Cancelled` promptly once
    /// `cancel` fires.
    fn get_price<'a>(
        &'a self,
        pair: Pair,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, FetchResult<Price>>;
}
