use super::*;
use crate::message::MessageBody;
use crate::producer::{Producer, SendOptions};
use forge_core::test_support::fixed_clock;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

struct AckAllHandler;

#[async_trait::async_trait]
impl QueueHandler for AckAllHandler {
    async fn handle(&self, batch: &MessageBatch) -> Result<(), forge_core::ForgeError> {
        batch.ack_all();
        Ok(())
    }
}

struct FailingHandler;

#[async_trait::async_trait]
impl QueueHandler for FailingHandler {
    async fn handle(&self, _batch: &MessageBatch) -> Result<(), forge_core::ForgeError> {
        Err(forge_core::ForgeError::handler("boom"))
    }
}

struct CountingHandler(AtomicUsize);

#[async_trait::async_trait]
impl QueueHandler for CountingHandler {
    async fn handle(&self, batch: &MessageBatch) -> Result<(), forge_core::ForgeError> {
        self.0.fetch_add(batch.messages.len(), AtomicOrdering::SeqCst);
        batch.ack_all();
        Ok(())
    }
}

fn setup() -> (tempfile::TempDir, Db, forge_core::FakeClock) {
    let dir = tempfile::tempdir().unwrap();
    let db = Db::open(dir.path()).unwrap();
    (dir, db, fixed_clock(1_700_000_000_000))
}

#[tokio::test]
async fn successful_batch_is_acked() {
    let (_dir, db, clock) = setup();
    let producer = Producer::new(db.clone(), "q", clock.clone());
    producer.send(MessageBody::Text("hi".to_string()), SendOptions::default()).unwrap();

    let config = PushConsumerConfig::new("q");
    let consumer = PushConsumer::new(db.clone(), config, clock, Arc::new(AckAllHandler));
    let dispatched = consumer.poll_once().await.unwrap();
    assert_eq!(dispatched, 1);

    let status: String = db
        .with_conn(|conn| conn.query_row("SELECT status FROM queue_messages", [], |r| r.get(0)).map_err(Into::into))
        .unwrap();
    assert_eq!(status, "acked");
}

#[tokio::test]
async fn failing_handler_retries_with_default_delay() {
    let (_dir, db, clock) = setup();
    let producer = Producer::new(db.clone(), "q", clock.clone());
    producer.send(MessageBody::Text("hi".to_string()), SendOptions::default()).unwrap();

    let config = PushConsumerConfig::new("q");
    let consumer = PushConsumer::new(db.clone(), config, clock, Arc::new(FailingHandler));
    consumer.poll_once().await.unwrap();

    let (status, attempts): (String, i64) = db
        .with_conn(|conn| {
            conn.query_row("SELECT status, attempts FROM queue_messages", [], |r| Ok((r.get(0)?, r.get(1)?)))
                .map_err(Into::into)
        })
        .unwrap();
    assert_eq!(status, "pending");
    assert_eq!(attempts, 1);
}

#[tokio::test]
async fn exhausted_retries_without_dlq_marks_failed() {
    let (_dir, db, clock) = setup();
    let producer = Producer::new(db.clone(), "q", clock.clone());
    producer.send(MessageBody::Text("hi".to_string()), SendOptions::default()).unwrap();

    let mut config = PushConsumerConfig::new("q");
    config.max_retries = 1;
    let consumer = PushConsumer::new(db.clone(), config, clock, Arc::new(FailingHandler));
    consumer.poll_once().await.unwrap();

    let status: String = db
        .with_conn(|conn| conn.query_row("SELECT status FROM queue_messages", [], |r| r.get(0)).map_err(Into::into))
        .unwrap();
    assert_eq!(status, "failed");
}

#[tokio::test]
async fn exhausted_retries_with_dlq_reroutes_queue() {
    let (_dir, db, clock) = setup();
    let producer = Producer::new(db.clone(), "q", clock.clone());
    producer.send(MessageBody::Text("hi".to_string()), SendOptions::default()).unwrap();

    let mut config = PushConsumerConfig::new("q");
    config.max_retries = 1;
    config.dead_letter_queue = Some("q-dlq".to_string());
    let max_retries = config.max_retries;
    let consumer = PushConsumer::new(db.clone(), config, clock, Arc::new(FailingHandler));
    consumer.poll_once().await.unwrap();

    let (queue, attempts): (String, i64) = db
        .with_conn(|conn| {
            conn.query_row("SELECT queue, attempts FROM queue_messages", [], |r| Ok((r.get(0)?, r.get(1)?)))
                .map_err(Into::into)
        })
        .unwrap();
    assert_eq!(queue, "q-dlq");
    assert!(attempts as u32 >= max_retries);
}

#[tokio::test]
async fn single_flight_guard_prevents_reentrant_poll() {
    let (_dir, db, clock) = setup();
    let handler = Arc::new(CountingHandler(AtomicUsize::new(0)));
    let config = PushConsumerConfig::new("q");
    let consumer = Arc::new(PushConsumer::new(db, config, clock, handler.clone()));
    consumer.polling.store(true, AtomicOrdering::SeqCst);
    let dispatched = consumer.poll_once().await.unwrap();
    assert_eq!(dispatched, 0);
}
