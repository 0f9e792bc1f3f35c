//! Producer (spec §4.4.1): `send`/`sendBatch` with atomic batch insert.

use forge_core::Clock;
use forge_storage::Db;

use crate::error::QueueError;
use crate::message::{validate_delay, MessageBody, MAX_BATCH_BYTES, MAX_BATCH_MESSAGES, MAX_MESSAGE_BYTES};

#[derive(Clone)]
pub struct Producer<C: Clock> {
    db: Db,
    queue: String,
    clock: C,
}

pub struct SendOptions {
    pub delay_seconds: Option<u32>,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self { delay_seconds: None }
    }
}

impl<C: Clock> Producer<C> {
    pub fn new(db: Db, queue: impl Into<String>, clock: C) -> Self {
        Self { db, queue: queue.into(), clock }
    }

    pub fn send(&self, body: MessageBody, opts: SendOptions) -> Result<String, QueueError> {
        let ids = self.send_batch(vec![(body, opts)])?;
        Ok(ids.into_iter().next().unwrap_or_default())
    }

    /// Atomic batch insert (spec: "Batch send is atomic").
    pub fn send_batch(&self, messages: Vec<(MessageBody, SendOptions)>) -> Result<Vec<String>, QueueError> {
        if messages.len() > MAX_BATCH_MESSAGES {
            return Err(QueueError::BatchTooLarge);
        }
        let now = self.clock.epoch_ms();
        let mut encoded = Vec::with_capacity(messages.len());
        let mut total_bytes = 0usize;
        for (body, opts) in messages {
            let (bytes, content_type) = body.encode()?;
            if bytes.len() > MAX_MESSAGE_BYTES {
                return Err(QueueError::MessageTooLarge);
            }
            total_bytes += bytes.len();
            let delay = validate_delay(opts.delay_seconds)?;
            encoded.push((bytes, content_type, delay));
        }
        if total_bytes > MAX_BATCH_BYTES {
            return Err(QueueError::BatchTooLarge);
        }

        let mut ids = Vec::with_capacity(encoded.len());
        self.db.with_conn(|conn| {
            conn.execute_batch("BEGIN")?;
            for (bytes, content_type, delay) in &encoded {
                let id = forge_core::id::new_uuid_v7().to_string();
                let visible_at = now + (*delay as i64) * 1000;
                let inserted = conn.execute(
                    "INSERT INTO queue_messages (id, queue, body, content_type, attempts, visible_at, created_at, status)
                     VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6, 'pending')",
                    rusqlite::params![id, self.queue, bytes, content_type.to_string(), visible_at, now],
                );
                if let Err(e) = inserted {
                    conn.execute_batch("ROLLBACK")?;
                    return Err(e.into());
                }
                ids.push(id);
            }
            conn.execute_batch("COMMIT")?;
            Ok(())
        })?;
        Ok(ids)
    }
}

#[cfg(test)]
#[path = "producer_tests.rs"]
mod tests;
