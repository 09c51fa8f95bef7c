//! Core domain types for pricecast.
//!
//! This crate provides the value types shared by every stage of the pipeline:
//! - `Currency`, `Pair`: quote identification with a strict 6-character text form
//! - `Price`: exact decimal price
//! - `PriceUpdate`: immutable (pair, price, capture time) record
//! - `UpdateSink`: non-blocking publication seam between producers and the hub

pub mod decimal;
pub mod error;
pub mod pair;
pub mod sink;
pub mod update;

pub use decimal::Price;
pub use error::{CoreError, Result};
pub use pair::{Currency, Pair};
pub use sink::{PublishError, UpdateSink};
pub use update::PriceUpdate;
