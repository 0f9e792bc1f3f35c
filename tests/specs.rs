//! Workspace-level process specs against the `forge` binary.

mod prelude;

#[path = "specs/cli_help.rs"]
mod cli_help;
#[path = "specs/dev.rs"]
mod dev;
#[path = "specs/kv.rs"]
mod kv;
#[path = "specs/queues.rs"]
mod queues;
