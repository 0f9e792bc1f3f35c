//! `RuntimeError` (spec §4.8/§4.9/§6): generation lifecycle, cron parsing,
//! and dispatch failures, plus the errors bubbled up from every binding
//! crate the dispatcher touches.

use thiserror::Error;

use forge_core::{ErrorKind, ForgeError};

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("no active generation")]
    NoActiveGeneration,

    #[error("invalid cron expression: {0}")]
    InvalidCron(String),

    #[error("unknown queue: {0}")]
    UnknownQueue(String),

    #[error("user handler error: {0}")]
    Handler(String),

    #[error(transparent)]
    Assets(#[from] forge_assets::AssetsError),

    #[error(transparent)]
    Queue(#[from] forge_queue::QueueError),

    #[error(transparent)]
    Service(#[from] forge_service::ServiceError),

    #[error(transparent)]
    Config(#[from] forge_core::ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RuntimeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RuntimeError::NoActiveGeneration => ErrorKind::Internal,
            RuntimeError::InvalidCron(_) => ErrorKind::InvalidInput,
            RuntimeError::UnknownQueue(_) => ErrorKind::NotFound,
            RuntimeError::Handler(_) => ErrorKind::HandlerError,
            RuntimeError::Assets(e) => e.kind(),
            RuntimeError::Queue(e) => e.kind(),
            RuntimeError::Service(e) => e.kind(),
            RuntimeError::Config(_) => ErrorKind::Internal,
            RuntimeError::Io(_) => ErrorKind::Internal,
        }
    }
}

impl From<RuntimeError> for ForgeError {
    fn from(err: RuntimeError) -> Self {
        let kind = err.kind();
        ForgeError::new(kind, err.to_string())
    }
}
