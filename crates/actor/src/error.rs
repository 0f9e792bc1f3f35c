//! Durable-actor error taxonomy (spec §4.5).

use forge_core::{ErrorKind, ForgeError};

#[derive(Debug, thiserror::Error)]
pub enum ActorError {
    #[error("invalid actor id: {0}")]
    InvalidId(String),

    #[error("actor is disposed")]
    Disposed,

    #[error("expected exactly one row, got {0}")]
    WrongRowCount(usize),

    #[error("too many {what} ({count} > {limit})")]
    LimitExceeded { what: &'static str, count: usize, limit: usize },

    #[error("handler error: {0}")]
    Handler(String),

    #[error("method not found or hidden from rpc: {0}")]
    MethodNotFound(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] forge_storage::StorageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ActorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ActorError::InvalidId(_) => ErrorKind::InvalidInput,
            ActorError::Disposed => ErrorKind::Aborted,
            ActorError::WrongRowCount(_) => ErrorKind::InvalidInput,
            ActorError::LimitExceeded { .. } => ErrorKind::LimitExceeded,
            ActorError::Handler(_) => ErrorKind::HandlerError,
            ActorError::MethodNotFound(_) => ErrorKind::NotFound,
            ActorError::Sqlite(_) | ActorError::Serde(_) | ActorError::Io(_) => ErrorKind::Internal,
            ActorError::Storage(e) => e.kind(),
        }
    }
}

impl From<ActorError> for ForgeError {
    fn from(err: ActorError) -> Self {
        let kind = err.kind();
        ForgeError::new(kind, err.to_string())
    }
}
