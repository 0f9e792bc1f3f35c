//! KV binding (spec §4.3).
//!
//! Expirations are absolute epoch seconds; `expiration_ttl` is relative and
//! must be ≥60 seconds. Expired entries are invisible to reads and lazily
//! swept on list.

use crate::db::Db;
use crate::error::StorageError;
use forge_core::Clock;
use serde_json::Value;

const MIN_EXPIRATION_TTL_SECS: i64 = 60;

#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    pub expiration: Option<i64>,
    pub expiration_ttl: Option<i64>,
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct GetWithMetadata {
    pub value: Vec<u8>,
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct ListKey {
    pub key: String,
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct ListPage {
    pub keys: Vec<ListKey>,
    pub cursor: Option<String>,
}

/// A handle to one KV namespace backed by the shared `kv` table.
#[derive(Clone)]
pub struct KvNamespace<C: Clock> {
    db: Db,
    namespace: String,
    clock: C,
}

impl<C: Clock> KvNamespace<C> {
    pub fn new(db: Db, namespace: impl Into<String>, clock: C) -> Self {
        Self { db, namespace: namespace.into(), clock }
    }

    pub fn put(&self, key: &str, value: &[u8], opts: PutOptions) -> Result<(), StorageError> {
        let expires_at = match (opts.expiration, opts.expiration_ttl) {
            (Some(abs), _) => Some(abs),
            (None, Some(ttl)) => {
                if ttl < MIN_EXPIRATION_TTL_SECS {
                    return Err(StorageError::InvalidInput(format!(
                        "expirationTtl must be >= {MIN_EXPIRATION_TTL_SECS} seconds, got {ttl}"
                    )));
                }
                Some(self.clock.epoch_secs() + ttl)
            }
            (None, None) => None,
        };
        let metadata = opts.metadata.map(|m| m.to_string());
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO kv (namespace, key, value, metadata, expires_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(namespace, key) DO UPDATE SET
                    value = excluded.value, metadata = excluded.metadata, expires_at = excluded.expires_at",
                rusqlite::params![self.namespace, key, value, metadata, expires_at],
            )?;
            Ok(())
        })
    }

    pub fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.get_with_metadata(key)?.map(|gm| gm.value))
    }

    pub fn get_with_metadata(&self, key: &str) -> Result<Option<GetWithMetadata>, StorageError> {
        let now = self.clock.epoch_secs();
        self.db.with_conn(|conn| {
            let row: Option<(Vec<u8>, Option<String>, Option<i64>)> = conn
                .query_row(
                    "SELECT value, metadata, expires_at FROM kv WHERE namespace = ?1 AND key = ?2",
                    rusqlite::params![self.namespace, key],
                    |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
                )
                .ok();
            let Some((value, metadata, expires_at)) = row else { return Ok(None) };
            if expires_at.is_some_and(|exp| exp <= now) {
                return Ok(None);
            }
            let metadata = metadata.and_then(|m| serde_json::from_str(&m).ok());
            Ok(Some(GetWithMetadata { value, metadata }))
        })
    }

    pub fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "DELETE FROM kv WHERE namespace = ?1 AND key = ?2",
                rusqlite::params![self.namespace, key],
            )?;
            Ok(())
        })
    }

    /// List keys in lexicographic order, cursor-paginated. Expired rows are
    /// swept as part of the scan (spec §3: "lazily swept on list").
    pub fn list(
        &self,
        prefix: Option<&str>,
        cursor: Option<&str>,
        limit: u32,
    ) -> Result<ListPage, StorageError> {
        let now = self.clock.epoch_secs();
        let prefix = prefix.unwrap_or("");
        let start_after = cursor.unwrap_or("");
        let limit = limit.max(1) as i64;

        self.db.with_conn(|conn| {
            conn.execute(
                "DELETE FROM kv WHERE namespace = ?1 AND expires_at IS NOT NULL AND expires_at <= ?2",
                rusqlite::params![self.namespace, now],
            )?;

            let mut stmt = conn.prepare(
                "SELECT key, metadata FROM kv
                 WHERE namespace = ?1 AND key LIKE ?2 || '%' AND key > ?3
                 ORDER BY key ASC LIMIT ?4",
            )?;
            let rows = stmt.query_map(
                rusqlite::params![self.namespace, prefix, start_after, limit],
                |r| {
                    let key: String = r.get(0)?;
                    let metadata: Option<String> = r.get(1)?;
                    Ok((key, metadata))
                },
            )?;

            let mut keys = Vec::new();
            for row in rows {
                let (key, metadata) = row?;
                let metadata = metadata.and_then(|m| serde_json::from_str(&m).ok());
                keys.push(ListKey { key, metadata });
            }
            let cursor = if keys.len() == limit as usize {
                keys.last().map(|k| k.key.clone())
            } else {
                None
            };
            Ok(ListPage { keys, cursor })
        })
    }
}

#[cfg(test)]
#[path = "kv_tests.rs"]
mod tests;
