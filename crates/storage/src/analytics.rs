//! Analytics Engine binding (spec §4.3): insert-only append into one table,
//! with breach limits enforced on write.

use crate::db::Db;
use crate::error::StorageError;
use forge_core::Clock;

const MAX_INDEXES: usize = 1;
const MAX_INDEX_BYTES: usize = 96;
const MAX_DOUBLES: usize = 20;
const MAX_BLOBS: usize = 20;
const MAX_TOTAL_BLOB_BYTES: usize = 16 * 1024;

#[derive(Debug, Clone, Default)]
pub struct DataPoint {
    pub indexes: Vec<String>,
    pub doubles: Vec<f64>,
    pub blobs: Vec<Vec<u8>>,
}

#[derive(Clone)]
pub struct AnalyticsEngine<C: Clock> {
    db: Db,
    dataset: String,
    clock: C,
}

impl<C: Clock> AnalyticsEngine<C> {
    pub fn new(db: Db, dataset: impl Into<String>, clock: C) -> Self {
        Self { db, dataset: dataset.into(), clock }
    }

    pub fn write_data_point(&self, point: DataPoint) -> Result<(), StorageError> {
        if point.indexes.len() > MAX_INDEXES {
            return Err(StorageError::InvalidInput(format!(
                "at most {MAX_INDEXES} index, got {}",
                point.indexes.len()
            )));
        }
        for index in &point.indexes {
            if index.len() > MAX_INDEX_BYTES {
                return Err(StorageError::InvalidInput(format!(
                    "index exceeds {MAX_INDEX_BYTES} bytes"
                )));
            }
        }
        if point.doubles.len() > MAX_DOUBLES {
            return Err(StorageError::InvalidInput(format!(
                "at most {MAX_DOUBLES} doubles, got {}",
                point.doubles.len()
            )));
        }
        if point.blobs.len() > MAX_BLOBS {
            return Err(StorageError::InvalidInput(format!(
                "at most {MAX_BLOBS} blobs, got {}",
                point.blobs.len()
            )));
        }
        let total_blob_bytes: usize = point.blobs.iter().map(|b| b.len()).sum();
        if total_blob_bytes > MAX_TOTAL_BLOB_BYTES {
            return Err(StorageError::InvalidInput(format!(
                "total blob bytes exceeds {MAX_TOTAL_BLOB_BYTES}, got {total_blob_bytes}"
            )));
        }

        let indexes = serde_json::to_string(&point.indexes)?;
        let doubles = serde_json::to_string(&point.doubles)?;
        let blobs: Vec<String> = point.blobs.iter().map(hex::encode).collect();
        let blobs = serde_json::to_string(&blobs)?;
        let now = self.clock.epoch_ms();

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO analytics_engine_events (dataset, indexes, doubles, blobs, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![self.dataset, indexes, doubles, blobs, now],
            )?;
            Ok(())
        })
    }
}

#[cfg(test)]
#[path = "analytics_tests.rs"]
mod tests;
