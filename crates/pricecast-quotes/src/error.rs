//! Fetch error types.

use pricecast_core::Currency;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    /// The request could not be built. Never retried.
    #[error("Failed to create request: {0}")]
    Request(String),

    #[error("Failed to execute request: {0}")]
    Transport(String),

    #[error("Unexpected status code: {0}")]
    Status(u16),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Price for {0} not found in response")]
    MissingCurrency(Currency),

    #[error("Failed to fetch price after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: Box<FetchError>,
    },

    #[error("Fetch cancelled")]
    Cancelled,

    #[error("Invalid upstream configuration: {0}")]
    InvalidConfig(String),
}

impl FetchError {
    /// Whether another attempt may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Status(_) | Self::Decode(_) | Self::MissingCurrency(_)
        )
    }
}

pub type FetchResult<T> = Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(FetchError::Transport("reset".into()).is_retryable());
        assert!(FetchError::Status(503).is_retryable());
        assert!(FetchError::Decode("eof".into()).is_retryable());
        assert!(FetchError::MissingCurrency(Currency::USD).is_retryable());

        assert!(!FetchError::Request("bad url".into()).is_retryable());
        assert!(!FetchError::Cancelled.is_retryable());
        assert!(!FetchError::Exhausted {
            attempts: 3,
            source: Box::new(FetchError::Status(500)),
        }
        .is_retryable());
    }

    #[test]
    fn test_exhausted_message_wraps_cause() {
        let err = FetchError::Exhausted {
            attempts: 2,
            source: Box::new(FetchError::Status(502)),
        };
        assert_eq!(
            err.to_string(),
            "Failed to fetch price after 2 attempts: Unexpected status code: 502"
        );
    }
}
