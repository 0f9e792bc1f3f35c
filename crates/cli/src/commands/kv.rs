//! `forge kv` — inspect a KV namespace's stored keys (spec §6 "kv" surface).

use std::path::PathBuf;

use clap::{Args, Subcommand};

use forge_core::SystemClock;
use forge_storage::kv::PutOptions;
use forge_storage::{Db, KvNamespace};

use crate::exit_error::{failed, ExitError};

#[derive(Args)]
pub struct KvArgs {
    /// KV namespace to operate on
    pub namespace: String,

    #[command(subcommand)]
    pub command: KvCommand,

    /// Directory the shared SQLite database lives under
    #[arg(long, default_value = ".forge", global = true)]
    pub data_dir: PathBuf,
}

#[derive(Subcommand)]
pub enum KvCommand {
    /// Fetch one key's value
    Get { key: String },
    /// Set a key's value
    Put { key: String, value: String },
    /// Remove a key
    Delete { key: String },
    /// List keys, optionally filtered by prefix
    List {
        #[arg(long)]
        prefix: Option<String>,
    },
}

pub fn run(args: KvArgs) -> Result<(), ExitError> {
    let db = Db::open(&args.data_dir).map_err(failed)?;
    let kv = KvNamespace::new(db, args.namespace, SystemClock);

    match args.command {
        KvCommand::Get { key } => match kv.get(&key).map_err(failed)? {
            Some(value) => println!("{}", String::from_utf8_lossy(&value)),
            None => return Err(ExitError::new(1, format!("key not found: {key}"))),
        },
        KvCommand::Put { key, value } => {
            kv.put(&key, value.as_bytes(), PutOptions::default()).map_err(failed)?;
        }
        KvCommand::Delete { key } => {
            kv.delete(&key).map_err(failed)?;
        }
        KvCommand::List { prefix } => {
            let page = kv.list(prefix.as_deref(), None, 1000).map_err(failed)?;
            for key in page.keys {
                println!("{}", key.key);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "kv_tests.rs"]
mod tests;
