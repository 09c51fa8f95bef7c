//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Fetch error: {0}")]
    Fetch(#[from] pricecast_quotes::FetchError),

    #[error("Feed error: {0}")]
    Feed(#[from] pricecast_feed::FeedError),

    #[error("History error: {0}")]
    History(#[from] pricecast_history::HistoryError),

    #[error("Hub error: {0}")]
    Hub(#[from] pricecast_hub::HubError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] pricecast_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
