//! R2 blob-bucket binding (spec §4.3).
//!
//! Bytes live as files under `{dataDir}/r2/{bucket}/{key}`; metadata rows
//! live in SQLite. Invariant (spec §3): the metadata row exists iff the blob
//! file exists, at commit boundaries — writes therefore create/overwrite the
//! file first, then the metadata row, and deletes remove the row first, then
//! the file (narrowing the window where they could diverge to an error path
//! only).

use crate::db::Db;
use crate::error::StorageError;
use forge_core::Clock;
use serde_json::Value;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct R2Object {
    pub key: String,
    pub size: u64,
    pub etag: String,
    pub uploaded: i64,
    pub http_metadata: Value,
    pub custom_metadata: Value,
}

#[derive(Debug, Clone)]
pub struct R2ObjectBody {
    pub meta: R2Object,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    pub http_metadata: Option<Value>,
    pub custom_metadata: Option<Value>,
}

#[derive(Clone)]
pub struct R2Bucket<C: Clock> {
    db: Db,
    bucket: String,
    clock: C,
}

impl<C: Clock> R2Bucket<C> {
    pub fn new(db: Db, bucket: impl Into<String>, clock: C) -> Self {
        Self { db, bucket: bucket.into(), clock }
    }

    fn blob_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        if key.split('/').any(|segment| segment == "..") {
            return Err(StorageError::InvalidInput(format!("path traversal in key: {key}")));
        }
        Ok(self.db.r2_dir().join(&self.bucket).join(key))
    }

    pub fn put(&self, key: &str, bytes: &[u8], opts: PutOptions) -> Result<R2Object, StorageError> {
        let path = self.blob_path(key)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, bytes)?;

        let etag = hex::encode(md5::compute(bytes).0);
        let uploaded = self.clock.epoch_ms();
        let http_metadata = opts.http_metadata.unwrap_or(Value::Null);
        let custom_metadata = opts.custom_metadata.unwrap_or(Value::Null);

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO r2_objects (bucket, key, size, etag, uploaded, http_metadata, custom_metadata)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(bucket, key) DO UPDATE SET
                    size = excluded.size, etag = excluded.etag, uploaded = excluded.uploaded,
                    http_metadata = excluded.http_metadata, custom_metadata = excluded.custom_metadata",
                rusqlite::params![
                    self.bucket,
                    key,
                    bytes.len() as i64,
                    etag,
                    uploaded,
                    http_metadata.to_string(),
                    custom_metadata.to_string()
                ],
            )?;
            Ok(())
        })?;

        Ok(R2Object { key: key.to_string(), size: bytes.len() as u64, etag, uploaded, http_metadata, custom_metadata })
    }

    pub fn head(&self, key: &str) -> Result<Option<R2Object>, StorageError> {
        self.db.with_conn(|conn| {
            let row: Option<(i64, String, i64, String, String)> = conn
                .query_row(
                    "SELECT size, etag, uploaded, http_metadata, custom_metadata
                     FROM r2_objects WHERE bucket = ?1 AND key = ?2",
                    rusqlite::params![self.bucket, key],
                    |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)),
                )
                .ok();
            Ok(row.map(|(size, etag, uploaded, http_metadata, custom_metadata)| R2Object {
                key: key.to_string(),
                size: size as u64,
                etag,
                uploaded,
                http_metadata: serde_json::from_str(&http_metadata).unwrap_or(Value::Null),
                custom_metadata: serde_json::from_str(&custom_metadata).unwrap_or(Value::Null),
            }))
        })
    }

    pub fn get(&self, key: &str) -> Result<Option<R2ObjectBody>, StorageError> {
        let Some(meta) = self.head(key)? else { return Ok(None) };
        let path = self.blob_path(key)?;
        let body = std::fs::read(&path)?;
        Ok(Some(R2ObjectBody { meta, body }))
    }

    pub fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "DELETE FROM r2_objects WHERE bucket = ?1 AND key = ?2",
                rusqlite::params![self.bucket, key],
            )?;
            Ok(())
        })?;
        let path = self.blob_path(key)?;
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    pub fn list(&self, prefix: Option<&str>, cursor: Option<&str>, limit: u32) -> Result<(Vec<R2Object>, Option<String>), StorageError> {
        let prefix = prefix.unwrap_or("");
        let start_after = cursor.unwrap_or("");
        let limit = limit.max(1) as i64;
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT key, size, etag, uploaded, http_metadata, custom_metadata FROM r2_objects
                 WHERE bucket = ?1 AND key LIKE ?2 || '%' AND key > ?3
                 ORDER BY key ASC LIMIT ?4",
            )?;
            let rows = stmt.query_map(
                rusqlite::params![self.bucket, prefix, start_after, limit],
                |r| {
                    Ok(R2Object {
                        key: r.get(0)?,
                        size: r.get::<_, i64>(1)? as u64,
                        etag: r.get(2)?,
                        uploaded: r.get(3)?,
                        http_metadata: serde_json::from_str::<Value>(&r.get::<_, String>(4)?).unwrap_or(Value::Null),
                        custom_metadata: serde_json::from_str::<Value>(&r.get::<_, String>(5)?).unwrap_or(Value::Null),
                    })
                },
            )?;
            let mut objects = Vec::new();
            for row in rows {
                objects.push(row?);
            }
            let cursor = if objects.len() == limit as usize { objects.last().map(|o| o.key.clone()) } else { None };
            Ok((objects, cursor))
        })
    }

    /// `createMultipartUpload` is approximated: returns an upload id that the
    /// caller threads through `uploadPart`/`completeMultipartUpload`-style
    /// calls which accumulate parts in memory before a final `put`.
    pub fn create_multipart_upload(&self, key: &str) -> MultipartUpload {
        MultipartUpload { key: key.to_string(), upload_id: uuid::Uuid::new_v4().to_string(), parts: Vec::new() }
    }
}

pub struct MultipartUpload {
    pub key: String,
    pub upload_id: String,
    parts: Vec<Vec<u8>>,
}

impl MultipartUpload {
    pub fn upload_part(&mut self, bytes: Vec<u8>) -> usize {
        self.parts.push(bytes);
        self.parts.len()
    }

    pub fn complete<C: Clock>(self, bucket: &R2Bucket<C>) -> Result<R2Object, StorageError> {
        let combined: Vec<u8> = self.parts.into_iter().flatten().collect();
        bucket.put(&self.key, &combined, PutOptions::default())
    }
}

#[cfg(test)]
#[path = "r2_tests.rs"]
mod tests;
