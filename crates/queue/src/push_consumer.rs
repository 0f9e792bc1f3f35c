//! Push consumer poll loop (spec §4.4.2).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::params;

use forge_core::Clock;
use forge_storage::Db;

use crate::error::QueueError;
use crate::message::{decode, ContentType, DecodedBody};

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_RETENTION_SECONDS: i64 = 345_600;

#[derive(Clone)]
pub struct PushConsumerConfig {
    pub queue: String,
    pub max_batch_size: u32,
    pub max_batch_timeout_ms: u64,
    pub max_retries: u32,
    pub dead_letter_queue: Option<String>,
    pub retention_seconds: i64,
    pub poll_interval_ms: u64,
}

impl PushConsumerConfig {
    pub fn new(queue: impl Into<String>) -> Self {
        Self {
            queue: queue.into(),
            max_batch_size: 10,
            max_batch_timeout_ms: 5000,
            max_retries: 3,
            dead_letter_queue: None,
            retention_seconds: DEFAULT_RETENTION_SECONDS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Ack,
    Retry { delay_seconds: Option<u32> },
}

pub struct QueueMessageHandle {
    pub id: String,
    pub timestamp: i64,
    pub body: DecodedBody,
    pub attempts: i64,
    resolution: Arc<Mutex<Option<Resolution>>>,
}

impl QueueMessageHandle {
    pub fn ack(&self) {
        *self.resolution.lock() = Some(Resolution::Ack);
    }

    pub fn retry(&self, delay_seconds: Option<u32>) {
        *self.resolution.lock() = Some(Resolution::Retry { delay_seconds });
    }
}

pub struct MessageBatch {
    pub messages: Vec<QueueMessageHandle>,
    default_resolution: Arc<Mutex<Resolution>>,
}

impl MessageBatch {
    pub fn ack_all(&self) {
        *self.default_resolution.lock() = Resolution::Ack;
    }

    pub fn retry_all(&self, delay_seconds: Option<u32>) {
        *self.default_resolution.lock() = Resolution::Retry { delay_seconds };
    }

    fn resolution_for(&self, msg: &QueueMessageHandle) -> Resolution {
        msg.resolution.lock().unwrap_or(*self.default_resolution.lock())
    }
}

/// Injected by the runtime crate to invoke the user's `queue(batch, env, ctx)`
/// handler. Returning `Err` is treated like the handler throwing (spec:
/// "If it throws, treat as `retryAll()` with default delay").
#[async_trait::async_trait]
pub trait QueueHandler: Send + Sync {
    async fn handle(&self, batch: &MessageBatch) -> Result<(), forge_core::ForgeError>;
}

pub struct PushConsumer<C: Clock, H: QueueHandler> {
    db: Db,
    config: PushConsumerConfig,
    clock: C,
    handler: Arc<H>,
    polling: Arc<AtomicBool>,
}

impl<C: Clock, H: QueueHandler> PushConsumer<C, H> {
    pub fn new(db: Db, config: PushConsumerConfig, clock: C, handler: Arc<H>) -> Self {
        Self { db, config, clock, handler, polling: Arc::new(AtomicBool::new(false)) }
    }

    /// One poll cycle (spec §4.4.2 steps 1-7). Returns the number of
    /// messages dispatched. No-ops (single-flight guard) if a poll is
    /// already in flight for this consumer.
    pub async fn poll_once(&self) -> Result<usize, QueueError> {
        if self.polling.swap(true, Ordering::SeqCst) {
            return Ok(0);
        }
        let result = self.poll_inner().await;
        self.polling.store(false, Ordering::SeqCst);
        result
    }

    async fn poll_inner(&self) -> Result<usize, QueueError> {
        let now = self.clock.epoch_ms();
        self.sweep(now)?;
        let rows = self.select_and_mark(now)?;
        if rows.is_empty() {
            return Ok(0);
        }

        let batch = MessageBatch {
            messages: rows
                .iter()
                .map(|r| QueueMessageHandle {
                    id: r.id.clone(),
                    timestamp: r.created_at,
                    body: decode(r.content_type, &r.body),
                    attempts: r.attempts,
                    resolution: Arc::new(Mutex::new(None)),
                })
                .collect(),
            default_resolution: Arc::new(Mutex::new(Resolution::Ack)),
        };

        if let Err(err) = self.handler.handle(&batch).await {
            tracing::warn!(queue = %self.config.queue, error = %err, "queue handler failed, retrying batch");
            batch.retry_all(None);
        }

        let count = batch.messages.len();
        self.resolve(&batch, now)?;
        Ok(count)
    }

    fn sweep(&self, now: i64) -> Result<(), QueueError> {
        let cutoff = now - self.config.retention_seconds * 1000;
        self.db.with_conn(|conn| {
            conn.execute(
                "DELETE FROM queue_messages WHERE queue = ?1 AND created_at < ?2",
                params![self.config.queue, cutoff],
            )?;
            Ok(())
        })?;
        Ok(())
    }

    fn select_and_mark(&self, now: i64) -> Result<Vec<Row>, QueueError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, body, content_type, attempts, created_at FROM queue_messages
                 WHERE queue = ?1 AND status = 'pending' AND visible_at <= ?2
                 ORDER BY visible_at LIMIT ?3",
            )?;
            let rows: Vec<Row> = stmt
                .query_map(params![self.config.queue, now, self.config.max_batch_size], |row| {
                    let content_type: String = row.get(2)?;
                    Ok(Row {
                        id: row.get(0)?,
                        body: row.get(1)?,
                        content_type: crate::message::ContentType::parse(&content_type),
                        attempts: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<Result<_, _>>()?;
            for row in &rows {
                conn.execute(
                    "UPDATE queue_messages SET attempts = attempts + 1 WHERE id = ?1",
                    params![row.id],
                )?;
            }
            Ok(rows)
        }).map_err(Into::into)
    }

    fn resolve(&self, batch: &MessageBatch, now: i64) -> Result<(), QueueError> {
        self.db.with_conn(|conn| {
            for msg in &batch.messages {
                match batch.resolution_for(msg) {
                    Resolution::Ack => {
                        conn.execute(
                            "UPDATE queue_messages SET status = 'acked', completed_at = ?2 WHERE id = ?1",
                            params![msg.id, now],
                        )?;
                    }
                    Resolution::Retry { delay_seconds } => {
                        let current_attempts: i64 = conn.query_row(
                            "SELECT attempts FROM queue_messages WHERE id = ?1",
                            params![msg.id],
                            |row| row.get(0),
                        )?;
                        if current_attempts as u32 >= self.config.max_retries {
                            if let Some(dlq) = &self.config.dead_letter_queue {
                                conn.execute(
                                    "UPDATE queue_messages SET queue = ?2, status = 'pending', visible_at = ?3 WHERE id = ?1",
                                    params![msg.id, dlq, now],
                                )?;
                            } else {
                                conn.execute(
                                    "UPDATE queue_messages SET status = 'failed', completed_at = ?2 WHERE id = ?1",
                                    params![msg.id, now],
                                )?;
                            }
                        } else {
                            let delay = delay_seconds.unwrap_or(0) as i64;
                            conn.execute(
                                "UPDATE queue_messages SET visible_at = ?2 WHERE id = ?1",
                                params![msg.id, now + delay * 1000],
                            )?;
                        }
                    }
                }
            }
            Ok(())
        })?;
        Ok(())
    }

    /// Spawns the single-owner poll loop; the returned handle is aborted by
    /// the generation on drain (spec: "Consumers are owned by the
    /// generation and stopped on drain").
    pub fn spawn(self: Arc<Self>) -> tokio::task::JoinHandle<()>
    where
        C: 'static,
        H: 'static,
    {
        let interval_ms = self.config.poll_interval_ms;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
            loop {
                ticker.tick().await;
                if let Err(err) = self.poll_once().await {
                    tracing::warn!(queue = %self.config.queue, error = %err, "queue poll failed");
                }
            }
        })
    }
}

struct Row {
    id: String,
    body: Vec<u8>,
    content_type: ContentType,
    attempts: i64,
    created_at: i64,
}

#[cfg(test)]
#[path = "push_consumer_tests.rs"]
mod tests;
