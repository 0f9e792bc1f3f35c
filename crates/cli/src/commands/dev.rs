//! `forge dev` — starts the runtime against a config file (spec §6).

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Args;

use forge_core::SystemClock;

use crate::exit_error::{failed, ExitError};

#[derive(Args)]
pub struct DevArgs {
    /// Path to the TOML config file
    #[arg(long, default_value = "forge.toml")]
    pub config: PathBuf,

    /// Directory the shared SQLite database and blob stores live under
    #[arg(long, default_value = ".forge")]
    pub data_dir: PathBuf,

    /// Address to bind the HTTP dispatcher to
    #[arg(long, default_value = "127.0.0.1:8787")]
    pub addr: SocketAddr,
}

pub async fn run(args: DevArgs) -> Result<(), ExitError> {
    forge_daemon::serve(&args.config, &args.data_dir, args.addr, SystemClock).await.map_err(failed)
}
