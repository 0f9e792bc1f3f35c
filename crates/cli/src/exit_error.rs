//! Carries a process exit code out of a command handler so `main` is the
//! only place that calls `std::process::exit` (spec §6: exit codes 0/1).

use std::fmt;

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}

/// Wraps any displayable error as an exit-code-1 `ExitError`.
pub fn failed(err: impl std::fmt::Display) -> ExitError {
    ExitError::new(1, err.to_string())
}
