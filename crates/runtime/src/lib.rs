//! forge-runtime: the generation manager and HTTP dispatcher (spec §4.8,
//! §4.9, §6) — loads a user module into an `active` generation, drains
//! superseded generations, runs the cron scheduler, and serves the
//! `/cdn-cgi/handler/*` trigger routes plus the static-asset/fetch catch-all.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod context;
pub mod cron;
pub mod dispatcher;
pub mod error;
pub mod generation;
pub mod handler;
pub mod manager;

pub use context::ExecutionContext;
pub use cron::{CronSchedule, CronScheduler, ScheduledHandler, TICK_INTERVAL_MS};
pub use dispatcher::{compile_glob, router, DispatcherState};
pub use error::RuntimeError;
pub use generation::{drain_until_stopped, Generation, GenerationState, OwnedBinding, RequestGuard};
pub use handler::{DispatchOutcome, DispatchRequest, DispatchResponse, UserModule, WebSocketPair};
pub use manager::{GenerationManager, DEFAULT_GRACE_PERIOD_MS};
