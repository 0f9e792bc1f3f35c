//! Abstract error taxonomy (spec §7) shared by every binding and subsystem.
//!
//! Crate-local error types stay `thiserror` enums of their own; each one
//! implements [`ErrorKind`]'s classification via a `kind()` method so the
//! dispatcher can map errors to the policy table in spec §7 without matching
//! on crate-local types.

use thiserror::Error;

/// The abstract error kinds from spec §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    LimitExceeded,
    NotSupported,
    Conflict,
    Aborted,
    Timeout,
    HandlerError,
    Internal,
}

crate::simple_display! {
    ErrorKind {
        InvalidInput => "invalid_input",
        NotFound => "not_found",
        LimitExceeded => "limit_exceeded",
        NotSupported => "not_supported",
        Conflict => "conflict",
        Aborted => "aborted",
        Timeout => "timeout",
        HandlerError => "handler_error",
        Internal => "internal",
    }
}

/// A classified error carrying a message and the abstract kind it maps to.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct ForgeError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ForgeError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn limit_exceeded(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::LimitExceeded, message)
    }

    pub fn not_supported(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotSupported, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn aborted(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Aborted, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    pub fn handler(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::HandlerError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let e = ForgeError::limit_exceeded("too many subrequests");
        assert_eq!(e.to_string(), "limit_exceeded: too many subrequests");
        assert_eq!(e.kind, ErrorKind::LimitExceeded);
    }
}
