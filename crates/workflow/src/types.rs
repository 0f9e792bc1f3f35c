//! Shared workflow types (spec §4.6).

use serde_json::Value;

use crate::error::WorkflowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Queued,
    Running,
    Waiting,
    Paused,
    Complete,
    Errored,
    Terminated,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Queued => "queued",
            Status::Running => "running",
            Status::Waiting => "waiting",
            Status::Paused => "paused",
            Status::Complete => "complete",
            Status::Errored => "errored",
            Status::Terminated => "terminated",
        }
    }

    pub fn parse(raw: &str) -> Result<Self, WorkflowError> {
        match raw {
            "queued" => Ok(Status::Queued),
            "running" => Ok(Status::Running),
            "waiting" => Ok(Status::Waiting),
            "paused" => Ok(Status::Paused),
            "complete" => Ok(Status::Complete),
            "errored" => Ok(Status::Errored),
            "terminated" => Ok(Status::Terminated),
            other => Err(WorkflowError::InvalidInput(format!("unknown workflow status: {other}"))),
        }
    }

    /// A status from which the run loop may still make progress.
    pub fn is_live(&self) -> bool {
        matches!(self, Status::Queued | Status::Running | Status::Waiting | Status::Paused)
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowInstanceRow {
    pub id: String,
    pub workflow_name: String,
    pub class_name: String,
    pub params: Value,
    pub status: Status,
    pub output: Option<Value>,
    pub error: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// What `run(event, step)` receives.
#[derive(Debug, Clone)]
pub struct WorkflowEvent {
    pub instance_id: String,
    pub params: Value,
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
