//! Service-binding error taxonomy (spec §4.7).

use forge_core::{ErrorKind, ForgeError};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("unknown service binding: {0}")]
    NotFound(String),

    #[error("method not found or hidden from rpc: {0}")]
    MethodNotFound(String),

    #[error("subrequest limit exceeded: {count} > {limit}")]
    LimitExceeded { count: u32, limit: u32 },

    #[error("connect() is not supported on service bindings")]
    NotSupported,

    #[error("handler error: {0}")]
    Handler(String),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::NotFound(_) => ErrorKind::NotFound,
            ServiceError::MethodNotFound(_) => ErrorKind::NotFound,
            ServiceError::LimitExceeded { .. } => ErrorKind::LimitExceeded,
            ServiceError::NotSupported => ErrorKind::NotSupported,
            ServiceError::Handler(_) => ErrorKind::HandlerError,
            ServiceError::Serde(_) => ErrorKind::Internal,
        }
    }
}

impl From<ServiceError> for ForgeError {
    fn from(err: ServiceError) -> Self {
        let kind = err.kind();
        ForgeError::new(kind, err.to_string())
    }
}
