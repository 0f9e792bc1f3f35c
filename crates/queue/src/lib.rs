//! forge-queue: the queue engine (spec §4.4) — producer, push-consumer poll
//! loop, and pull-consumer lease/ack protocol.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod error;
pub mod message;
pub mod producer;
pub mod pull_consumer;
pub mod push_consumer;

pub use error::QueueError;
pub use message::{ContentType, DecodedBody, MessageBody};
pub use producer::{Producer, SendOptions};
pub use pull_consumer::{AckRequest, AckResult, PullConsumer, PulledMessage};
pub use push_consumer::{MessageBatch, PushConsumer, PushConsumerConfig, QueueHandler, QueueMessageHandle, Resolution};
