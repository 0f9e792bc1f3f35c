//! Alarms (spec §4.5.4): a persisted row per `(namespace, id)`, an in-process
//! timer, exponential backoff on failure, and startup re-arm.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::{params, OptionalExtension};

use forge_storage::Db;

use crate::error::ActorError;

pub const DEFAULT_BASE_DELAY_MS: i64 = 1000;
pub const DEFAULT_MAX_DELAY_MS: i64 = 30 * 60 * 1000;
pub const MAX_RETRIES: u32 = 6;

/// `delay = min(maxDelay, base * 2^retryCount)` (spec §4.5.4).
pub fn backoff_delay_ms(retry_count: u32, base_ms: i64, max_delay_ms: i64) -> i64 {
    let factor = 1i64.checked_shl(retry_count).unwrap_or(i64::MAX);
    base_ms.saturating_mul(factor).min(max_delay_ms)
}

#[derive(Clone)]
pub struct AlarmStore {
    db: Db,
    namespace: String,
}

impl AlarmStore {
    pub fn new(db: Db, namespace: impl Into<String>) -> Self {
        Self { db, namespace: namespace.into() }
    }

    pub fn set(&self, id: &str, time_ms: i64) -> Result<(), ActorError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO do_alarms (namespace, id, alarm_time) VALUES (?1, ?2, ?3)
                 ON CONFLICT(namespace, id) DO UPDATE SET alarm_time = excluded.alarm_time",
                params![self.namespace, id, time_ms],
            )?;
            Ok(())
        })?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Option<i64>, ActorError> {
        self.db
            .with_conn(|conn| {
                conn.query_row(
                    "SELECT alarm_time FROM do_alarms WHERE namespace = ?1 AND id = ?2",
                    params![self.namespace, id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(Into::into)
            })
            .map_err(Into::into)
    }

    pub fn delete(&self, id: &str) -> Result<(), ActorError> {
        self.db.with_conn(|conn| {
            conn.execute("DELETE FROM do_alarms WHERE namespace = ?1 AND id = ?2", params![self.namespace, id])?;
            Ok(())
        })?;
        Ok(())
    }

    /// All persisted alarms in this namespace — used to re-arm on startup
    /// (spec: "On startup, re-arm every persisted alarm").
    pub fn list_all(&self) -> Result<Vec<(String, i64)>, ActorError> {
        self.db
            .with_conn(|conn| {
                let mut stmt = conn.prepare("SELECT id, alarm_time FROM do_alarms WHERE namespace = ?1")?;
                let rows = stmt
                    .query_map(params![self.namespace], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .map_err(Into::into)
    }
}

pub type FireFuture = Pin<Box<dyn Future<Output = Result<(), ActorError>> + Send>>;
pub type FireFn = Arc<dyn Fn(u32, bool) -> FireFuture + Send + Sync>;

/// Owns the live timer tasks; one per `(namespace, id)` with a pending alarm.
/// Alarms must be able to wake evicted instances, so this lives on the
/// namespace rather than the instance.
pub struct AlarmScheduler {
    store: AlarmStore,
    base_delay_ms: i64,
    max_delay_ms: i64,
    tasks: Mutex<HashMap<String, tokio::task::JoinHandle<()>>>,
}

impl AlarmScheduler {
    pub fn new(store: AlarmStore) -> Self {
        Self { store, base_delay_ms: DEFAULT_BASE_DELAY_MS, max_delay_ms: DEFAULT_MAX_DELAY_MS, tasks: Mutex::new(HashMap::new()) }
    }

    /// Arms (or re-arms) the timer for `id`. `on_fire(retry_count, is_retry)`
    /// is the re-instantiate-and-call-`alarm()` closure supplied by the
    /// namespace; past-due alarms fire immediately.
    pub fn arm(self: &Arc<Self>, id: String, fire_at_ms: i64, now_ms: i64, on_fire: FireFn) {
        self.cancel(&id);
        let delay = Duration::from_millis(fire_at_ms.saturating_sub(now_ms).max(0) as u64);
        let scheduler = self.clone();
        let task_id = id.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            scheduler.fire(task_id, 0, false, on_fire).await;
        });
        self.tasks.lock().insert(id, handle);
    }

    fn fire(self: &Arc<Self>, id: String, retry_count: u32, is_retry: bool, on_fire: FireFn) -> Pin<Box<dyn Future<Output = ()> + Send>> {
        let this = self.clone();
        Box::pin(async move {
            match on_fire(retry_count, is_retry).await {
                Ok(()) => {
                    if let Err(err) = this.store.delete(&id) {
                        tracing::warn!(%id, error = %err, "failed to clear fired alarm");
                    }
                    this.tasks.lock().remove(&id);
                }
                Err(err) => {
                    tracing::warn!(%id, error = %err, retry_count, "alarm handler failed");
                    if retry_count + 1 > MAX_RETRIES {
                        tracing::warn!(%id, "alarm abandoned after max retries");
                        let _ = this.store.delete(&id);
                        this.tasks.lock().remove(&id);
                        return;
                    }
                    let delay = backoff_delay_ms(retry_count + 1, this.base_delay_ms, this.max_delay_ms);
                    let scheduler = this.clone();
                    let retry_id = id.clone();
                    let handle = tokio::spawn(async move {
                        tokio::time::sleep(Duration::from_millis(delay as u64)).await;
                        scheduler.fire(retry_id, retry_count + 1, true, on_fire).await;
                    });
                    this.tasks.lock().insert(id, handle);
                }
            }
        })
    }

    pub fn cancel(&self, id: &str) {
        if let Some(handle) = self.tasks.lock().remove(id) {
            handle.abort();
        }
    }

    pub fn store(&self) -> &AlarmStore {
        &self.store
    }
}

#[cfg(test)]
#[path = "alarms_tests.rs"]
mod tests;
