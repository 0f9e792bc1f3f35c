//! forge-workflow: the workflow engine (spec §4.6) — step memoization,
//! sleep/sleepUntil, waitForEvent, pause/resume/terminate/restart/duplicate,
//! and the `WorkflowEngine` supervisor that owns one background task per
//! running instance and re-invokes every `running` instance on crash
//! recovery.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod control;
pub mod engine;
pub mod error;
pub mod step;
pub mod store;
pub mod types;

pub use control::InstanceControl;
pub use engine::{Workflow, WorkflowEngine};
pub use error::WorkflowError;
pub use step::{Step, DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_ATTEMPTS};
pub use store::WorkflowStore;
pub use types::{Status, WorkflowEvent, WorkflowInstanceRow};
