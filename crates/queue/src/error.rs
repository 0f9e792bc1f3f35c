//! Queue engine error taxonomy (spec §4.4).

use forge_core::{ErrorKind, ForgeError};

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("message body exceeds the 128 KiB per-message limit")]
    MessageTooLarge,

    #[error("batch exceeds the 100-message or 256 KiB limit")]
    BatchTooLarge,

    #[error("delaySeconds must be within [0, 43200]")]
    InvalidDelay,

    #[error("queue {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] forge_storage::StorageError),
}

impl QueueError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueueError::MessageTooLarge | QueueError::BatchTooLarge | QueueError::InvalidDelay => {
                ErrorKind::LimitExceeded
            }
            QueueError::NotFound(_) => ErrorKind::NotFound,
            QueueError::Sqlite(_) | QueueError::Serde(_) => ErrorKind::Internal,
            QueueError::Storage(e) => e.kind(),
        }
    }
}

impl From<QueueError> for ForgeError {
    fn from(err: QueueError) -> Self {
        let kind = err.kind();
        ForgeError::new(kind, err.to_string())
    }
}
