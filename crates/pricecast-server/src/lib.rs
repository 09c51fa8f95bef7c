//! pricecast service shell.
//!
//! Wires the feed, hub and history into an axum server that streams live
//! prices to clients as server-sent events.

pub mod app;
pub mod config;
pub mod error;
pub mod server;
pub mod sse;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
