//! Hub error types.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HubError {
    #[error("Streaming unsupported: sink cannot flush incrementally")]
    StreamingUnsupported,

    #[error("Subscriber queue size must be at least 1")]
    InvalidQueueSize,

    #[error("Invalid hub configuration: {0}")]
    InvalidConfig(String),

    #[error("Hub stopped")]
    Stopped,
}

pub type HubResult<T> = Result<T, HubError>;

/// Why [`Subscriber::send`](crate::Subscriber::send) rejected an update.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SendError {
    #[error("Subscriber queue full")]
    QueueFull,

    #[error("Subscriber closed")]
    Closed,
}

/// Failure writing to a subscriber's transport.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("Sink disconnected")]
    Disconnected,

    #[error("Failed to encode frame: {0}")]
    Encode(String),
}
