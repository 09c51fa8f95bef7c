//! Prometheus metrics and structured logging for pricecast.
//!
//! - Structured logging with tracing (JSON in production, pretty otherwise)
//! - Prometheus counters for fetches, drops and connected subscribers
//! - Text exposition for the `/metrics` endpoint

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, millis};
pub use metrics::{DropStage, FetchOutcome, Metrics};
