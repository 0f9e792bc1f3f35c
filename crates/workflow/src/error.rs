//! Workflow error taxonomy (spec §4.6).

use forge_core::{ErrorKind, ForgeError};

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("workflow instance not found: {0}")]
    NotFound(String),

    #[error("invalid workflow operation: {0}")]
    InvalidInput(String),

    /// A workflow's class could not be resolved when (re-)invoking `run` —
    /// notably on crash recovery, where the handler module may have changed
    /// shape since the instance was persisted. Per spec: do not guess.
    #[error("workflow class not registered: {0}")]
    ClassNotRegistered(String),

    #[error("waitForEvent timed out")]
    Timeout,

    #[error("workflow instance was terminated")]
    Aborted,

    #[error("step failed non-retryably: {0}")]
    NonRetryable(String),

    #[error("step handler error: {0}")]
    Handler(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] forge_storage::StorageError),
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkflowError::NotFound(_) => ErrorKind::NotFound,
            WorkflowError::InvalidInput(_) => ErrorKind::InvalidInput,
            WorkflowError::ClassNotRegistered(_) => ErrorKind::Internal,
            WorkflowError::Timeout => ErrorKind::Timeout,
            WorkflowError::Aborted => ErrorKind::Aborted,
            WorkflowError::NonRetryable(_) | WorkflowError::Handler(_) => ErrorKind::HandlerError,
            WorkflowError::Sqlite(_) | WorkflowError::Serde(_) => ErrorKind::Internal,
            WorkflowError::Storage(e) => e.kind(),
        }
    }

    /// `NonRetryableError` the user's step closure throws to terminate the
    /// workflow with `errored` immediately instead of retrying.
    pub fn non_retryable(message: impl Into<String>) -> Self {
        WorkflowError::NonRetryable(message.into())
    }
}

impl From<WorkflowError> for ForgeError {
    fn from(err: WorkflowError) -> Self {
        let kind = err.kind();
        ForgeError::new(kind, err.to_string())
    }
}
