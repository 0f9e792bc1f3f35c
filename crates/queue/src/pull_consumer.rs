//! Pull consumer (spec §4.4.3): HTTP-invoked `pull`/`ack`.

use rusqlite::params;

use forge_core::Clock;
use forge_storage::Db;

use crate::error::QueueError;
use crate::message::{decode, ContentType, DecodedBody};

pub const DEFAULT_VISIBILITY_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_PULL_BATCH_SIZE: u32 = 10;

#[derive(Clone)]
pub struct PullConsumer<C: Clock> {
    db: Db,
    queue: String,
    clock: C,
}

pub struct PulledMessage {
    pub lease_id: String,
    pub id: String,
    pub timestamp: i64,
    pub body: DecodedBody,
    pub attempts: i64,
}

pub struct AckRequest {
    pub acks: Vec<String>,
    pub retries: Vec<(String, Option<u32>)>,
}

pub struct AckResult {
    pub acked: usize,
    pub retried: usize,
}

impl<C: Clock> PullConsumer<C> {
    pub fn new(db: Db, queue: impl Into<String>, clock: C) -> Self {
        Self { db, queue: queue.into(), clock }
    }

    pub fn pull(&self, batch_size: Option<u32>, visibility_timeout_ms: Option<u64>) -> Result<Vec<PulledMessage>, QueueError> {
        let now = self.clock.epoch_ms();
        let limit = batch_size.unwrap_or(DEFAULT_PULL_BATCH_SIZE);
        let visibility = visibility_timeout_ms.unwrap_or(DEFAULT_VISIBILITY_TIMEOUT_MS) as i64;

        self.db.with_conn(|conn| {
            conn.execute("DELETE FROM queue_leases WHERE expires_at <= ?1", params![now])?;

            let mut stmt = conn.prepare(
                "SELECT id, body, content_type, attempts, created_at FROM queue_messages
                 WHERE queue = ?1 AND status = 'pending' AND visible_at <= ?2
                   AND id NOT IN (SELECT message_id FROM queue_leases WHERE queue = ?1)
                 ORDER BY visible_at LIMIT ?3",
            )?;
            let candidates: Vec<(String, Vec<u8>, ContentType, i64, i64)> = stmt
                .query_map(params![self.queue, now, limit], |row| {
                    let content_type: String = row.get(2)?;
                    Ok((row.get(0)?, row.get(1)?, ContentType::parse(&content_type), row.get(3)?, row.get(4)?))
                })?
                .collect::<Result<_, _>>()?;

            let mut out = Vec::with_capacity(candidates.len());
            conn.execute_batch("BEGIN")?;
            for (id, body, content_type, attempts, created_at) in candidates {
                // Pull-consumer responses never surface v8 messages (spec §4.4.3 step 3).
                if content_type == ContentType::V8 {
                    continue;
                }
                let lease_id = forge_core::id::new_uuid_v7().to_string();
                let expires_at = now + visibility;
                if let Err(e) = conn.execute(
                    "INSERT INTO queue_leases (lease_id, message_id, queue, expires_at) VALUES (?1, ?2, ?3, ?4)",
                    params![lease_id, id, self.queue, expires_at],
                ) {
                    conn.execute_batch("ROLLBACK")?;
                    return Err(e.into());
                }
                if let Err(e) = conn.execute("UPDATE queue_messages SET attempts = attempts + 1 WHERE id = ?1", params![id]) {
                    conn.execute_batch("ROLLBACK")?;
                    return Err(e.into());
                }
                out.push(PulledMessage {
                    lease_id,
                    id,
                    timestamp: created_at,
                    body: decode(content_type, &body),
                    attempts: attempts + 1,
                });
            }
            conn.execute_batch("COMMIT")?;
            Ok(out)
        }).map_err(Into::into)
    }

    pub fn ack(&self, req: AckRequest) -> Result<AckResult, QueueError> {
        let now = self.clock.epoch_ms();
        self.db.with_conn(|conn| {
            let mut acked = 0usize;
            let mut retried = 0usize;
            for lease_id in &req.acks {
                let message_id: Option<String> = conn
                    .query_row(
                        "SELECT message_id FROM queue_leases WHERE lease_id = ?1 AND expires_at > ?2",
                        params![lease_id, now],
                        |row| row.get(0),
                    )
                    .ok();
                let Some(message_id) = message_id else { continue };
                conn.execute(
                    "UPDATE queue_messages SET status = 'acked', completed_at = ?2 WHERE id = ?1",
                    params![message_id, now],
                )?;
                conn.execute("DELETE FROM queue_leases WHERE lease_id = ?1", params![lease_id])?;
                acked += 1;
            }
            for (lease_id, delay_seconds) in &req.retries {
                let message_id: Option<String> = conn
                    .query_row(
                        "SELECT message_id FROM queue_leases WHERE lease_id = ?1 AND expires_at > ?2",
                        params![lease_id, now],
                        |row| row.get(0),
                    )
                    .ok();
                let Some(message_id) = message_id else { continue };
                let delay = delay_seconds.unwrap_or(0) as i64;
                conn.execute(
                    "UPDATE queue_messages SET visible_at = ?2 WHERE id = ?1",
                    params![message_id, now + delay * 1000],
                )?;
                conn.execute("DELETE FROM queue_leases WHERE lease_id = ?1", params![lease_id])?;
                retried += 1;
            }
            Ok(AckResult { acked, retried })
        }).map_err(Into::into)
    }
}

#[cfg(test)]
#[path = "pull_consumer_tests.rs"]
mod tests;
