//! Storage-layer error type and its mapping into the abstract taxonomy.

use forge_core::{ErrorKind, ForgeError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::InvalidInput(_) => ErrorKind::InvalidInput,
            StorageError::NotFound(_) => ErrorKind::NotFound,
            StorageError::LimitExceeded(_) => ErrorKind::LimitExceeded,
            StorageError::Sqlite(_) | StorageError::Io(_) | StorageError::Serde(_) => {
                ErrorKind::Internal
            }
        }
    }
}

impl From<StorageError> for ForgeError {
    fn from(err: StorageError) -> Self {
        ForgeError::new(err.kind(), err.to_string())
    }
}
