//! `forge queues` — send, pull, and ack messages against a queue directly
//! from the CLI (spec §6 "queues" surface), using the same pull/ack
//! semantics the dispatcher's HTTP routes expose.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use forge_core::SystemClock;
use forge_queue::{AckRequest, MessageBody, PullConsumer, Producer, SendOptions};
use forge_storage::Db;

use crate::exit_error::{failed, ExitError};

#[derive(Args)]
pub struct QueuesArgs {
    /// Queue to operate on
    pub queue: String,

    #[command(subcommand)]
    pub command: QueuesCommand,

    /// Directory the shared SQLite database lives under
    #[arg(long, default_value = ".forge", global = true)]
    pub data_dir: PathBuf,
}

#[derive(Subcommand)]
pub enum QueuesCommand {
    /// Enqueue a text message
    Send {
        body: String,
        #[arg(long)]
        delay_seconds: Option<u32>,
    },
    /// Pull a batch of pending messages, leasing each one
    Pull {
        #[arg(long)]
        batch_size: Option<u32>,
        #[arg(long)]
        visibility_timeout_ms: Option<u64>,
    },
    /// Acknowledge a leased message by its lease id
    Ack { lease_id: String },
}

pub fn run(args: QueuesArgs) -> Result<(), ExitError> {
    let db = Db::open(&args.data_dir).map_err(failed)?;

    match args.command {
        QueuesCommand::Send { body, delay_seconds } => {
            let producer = Producer::new(db, args.queue, SystemClock);
            let id = producer.send(MessageBody::Text(body), SendOptions { delay_seconds }).map_err(failed)?;
            println!("{id}");
        }
        QueuesCommand::Pull { batch_size, visibility_timeout_ms } => {
            let consumer = PullConsumer::new(db, args.queue, SystemClock);
            let messages = consumer.pull(batch_size, visibility_timeout_ms).map_err(failed)?;
            for message in &messages {
                println!("{}\t{}\t{:?}", message.lease_id, message.id, message.body);
            }
        }
        QueuesCommand::Ack { lease_id } => {
            let consumer = PullConsumer::new(db, args.queue, SystemClock);
            let result = consumer
                .ack(AckRequest { acks: vec![lease_id], retries: vec![] })
                .map_err(failed)?;
            if result.acked == 0 {
                return Err(ExitError::new(1, "no matching lease to ack".to_string()));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "queues_tests.rs"]
mod tests;
