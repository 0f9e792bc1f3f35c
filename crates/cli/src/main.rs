#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

mod commands;
mod exit_error;

use clap::{Parser, Subcommand};

use commands::{dev, kv, queues};
use exit_error::ExitError;

#[derive(Parser)]
#[command(name = "forge", about = "Local edge-compute runtime emulator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the runtime against a config file
    Dev(dev::DevArgs),
    /// Inspect a KV namespace
    Kv(kv::KvArgs),
    /// Send, pull, and ack queue messages
    Queues(queues::QueuesArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Dev(args) => dev::run(args).await,
        Command::Kv(args) => kv::run(args),
        Command::Queues(args) => queues::run(args),
    };

    if let Err(ExitError { code, message }) = result {
        eprintln!("forge: {message}");
        std::process::exit(code);
    }
}
