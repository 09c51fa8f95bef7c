//! Error types for pricecast-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("Invalid pair length: expected 6 characters, got {0}")]
    InvalidPairLength(usize),

    #[error("Invalid pair character {found:?} in {input:?}")]
    InvalidPairCharacter { input: String, found: char },

    #[error("Invalid currency code: {0:?}")]
    InvalidCurrency(String),

    #[error("Invalid price: {0}")]
    InvalidPrice(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
