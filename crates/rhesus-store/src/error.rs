//! Storage error types.

use rhesus_common::RhesusError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),
}

impl From<StoreError> for RhesusError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(msg) => RhesusError::NotFound(msg),
            StoreError::InvalidInput(msg) => RhesusError::InvalidInput(msg),
            other => RhesusError::Storage(other.to_string()),
        }
    }
}
