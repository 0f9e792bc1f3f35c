//! Error taxonomy for the static-asset server (spec §4.2).

use forge_core::{ErrorKind, ForgeError};

#[derive(Debug, thiserror::Error)]
pub enum AssetsError {
    #[error("path escapes the asset root")]
    PathTraversal,

    #[error("invalid request path")]
    InvalidPath,

    #[error("invalid pattern in {file}: {reason}")]
    InvalidConfig { file: &'static str, reason: String },

    #[error("too many {kind} rules in {file} ({count} > {limit})")]
    TooManyRules { file: &'static str, kind: &'static str, count: usize, limit: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AssetsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AssetsError::PathTraversal | AssetsError::InvalidPath => ErrorKind::InvalidInput,
            AssetsError::InvalidConfig { .. } => ErrorKind::InvalidInput,
            AssetsError::TooManyRules { .. } => ErrorKind::LimitExceeded,
            AssetsError::Io(_) => ErrorKind::Internal,
        }
    }
}

impl From<AssetsError> for ForgeError {
    fn from(err: AssetsError) -> Self {
        let kind = err.kind();
        ForgeError::new(kind, err.to_string())
    }
}
