//! History error types.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("History capacity must be at least 1, got {0}")]
    InvalidCapacity(usize),
}

pub type HistoryResult<T> = Result<T, HistoryError>;
