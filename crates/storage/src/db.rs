//! Persistence layer: a single shared SQLite handle plus the data directory
//! layout every binding stores into (spec §4.1, §6).
//!
//! Callers never embed `{dataDir}` paths themselves; they request the
//! directories they need (`r2_dir`, `d1_dir`, `do_sql_dir`) through this
//! component, which hands out narrow accessors rather than a raw path.

use crate::error::StorageError;
use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const MIGRATIONS: &[(&str, &str)] = &[
    (
        "0001_kv",
        "CREATE TABLE IF NOT EXISTS kv (
            namespace TEXT NOT NULL,
            key TEXT NOT NULL,
            value BLOB NOT NULL,
            metadata TEXT,
            expires_at INTEGER,
            PRIMARY KEY (namespace, key)
        );",
    ),
    (
        "0002_r2_objects",
        "CREATE TABLE IF NOT EXISTS r2_objects (
            bucket TEXT NOT NULL,
            key TEXT NOT NULL,
            size INTEGER NOT NULL,
            etag TEXT NOT NULL,
            uploaded INTEGER NOT NULL,
            http_metadata TEXT NOT NULL,
            custom_metadata TEXT NOT NULL,
            PRIMARY KEY (bucket, key)
        );",
    ),
    (
        "0003_do_storage",
        "CREATE TABLE IF NOT EXISTS do_storage (
            namespace TEXT NOT NULL,
            id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            PRIMARY KEY (namespace, id, key)
        );",
    ),
    (
        "0004_do_alarms",
        "CREATE TABLE IF NOT EXISTS do_alarms (
            namespace TEXT NOT NULL,
            id TEXT NOT NULL,
            alarm_time INTEGER NOT NULL,
            PRIMARY KEY (namespace, id)
        );",
    ),
    (
        "0005_queue_messages",
        "CREATE TABLE IF NOT EXISTS queue_messages (
            id TEXT PRIMARY KEY,
            queue TEXT NOT NULL,
            body BLOB NOT NULL,
            content_type TEXT NOT NULL,
            attempts INTEGER NOT NULL DEFAULT 0,
            visible_at INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            completed_at INTEGER
        );
        CREATE INDEX IF NOT EXISTS idx_queue_messages_dispatch
            ON queue_messages (queue, status, visible_at);",
    ),
    (
        "0006_queue_leases",
        "CREATE TABLE IF NOT EXISTS queue_leases (
            lease_id TEXT PRIMARY KEY,
            message_id TEXT NOT NULL,
            queue TEXT NOT NULL,
            expires_at INTEGER NOT NULL
        );",
    ),
    (
        "0007_workflow_instances",
        "CREATE TABLE IF NOT EXISTS workflow_instances (
            id TEXT PRIMARY KEY,
            workflow_name TEXT NOT NULL,
            class_name TEXT NOT NULL,
            params TEXT NOT NULL,
            status TEXT NOT NULL,
            output TEXT,
            error TEXT,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );",
    ),
    (
        "0008_workflow_steps",
        "CREATE TABLE IF NOT EXISTS workflow_steps (
            instance_id TEXT NOT NULL,
            step_name TEXT NOT NULL,
            output TEXT NOT NULL,
            completed_at INTEGER NOT NULL,
            PRIMARY KEY (instance_id, step_name)
        );
        CREATE TABLE IF NOT EXISTS workflow_step_attempts (
            instance_id TEXT NOT NULL,
            step_name TEXT NOT NULL,
            failed_attempts INTEGER NOT NULL DEFAULT 0,
            last_error TEXT,
            last_error_id TEXT,
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (instance_id, step_name)
        );
        CREATE TABLE IF NOT EXISTS workflow_events (
            instance_id TEXT NOT NULL,
            event_type TEXT NOT NULL,
            payload TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );",
    ),
    (
        "0009_cache_entries",
        "CREATE TABLE IF NOT EXISTS cache_entries (
            cache_name TEXT NOT NULL,
            url TEXT NOT NULL,
            status INTEGER NOT NULL,
            headers TEXT NOT NULL,
            body BLOB NOT NULL,
            expires_at INTEGER,
            PRIMARY KEY (cache_name, url)
        );",
    ),
    (
        "0010_email_and_analytics",
        "CREATE TABLE IF NOT EXISTS email_messages (
            id TEXT PRIMARY KEY,
            binding TEXT NOT NULL,
            sender TEXT NOT NULL,
            recipient TEXT NOT NULL,
            raw BLOB NOT NULL,
            status TEXT NOT NULL,
            reason TEXT,
            created_at INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS analytics_engine_events (
            dataset TEXT NOT NULL,
            indexes TEXT NOT NULL,
            doubles TEXT NOT NULL,
            blobs TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );",
    ),
];

/// Shared handle to the single SQLite database plus the on-disk data
/// directory layout (spec §6).
#[derive(Clone)]
pub struct Db {
    conn: Arc<Mutex<Connection>>,
    data_dir: PathBuf,
}

impl Db {
    /// Open (creating if absent) the shared database at `{dataDir}/data.sqlite`,
    /// run idempotent migrations, and create the `r2/`, `d1/`, `do-sql/`
    /// subdirectories.
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        std::fs::create_dir_all(data_dir.join("r2"))?;
        std::fs::create_dir_all(data_dir.join("d1"))?;
        std::fs::create_dir_all(data_dir.join("do-sql"))?;

        let conn = Connection::open(data_dir.join("data.sqlite"))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        run_migrations(&conn)?;

        Ok(Self { conn: Arc::new(Mutex::new(conn)), data_dir })
    }

    /// Open an in-memory database for tests; still creates a temp data
    /// directory for blob-backed bindings (R2, D1, per-actor SQL).
    pub fn open_in(data_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        Self::open(data_dir)
    }

    pub fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T, StorageError>) -> Result<T, StorageError> {
        let guard = self.conn.lock();
        f(&guard)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn r2_dir(&self) -> PathBuf {
        self.data_dir.join("r2")
    }

    pub fn d1_dir(&self) -> PathBuf {
        self.data_dir.join("d1")
    }

    pub fn do_sql_dir(&self) -> PathBuf {
        self.data_dir.join("do-sql")
    }
}

fn run_migrations(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (name TEXT PRIMARY KEY, applied_at INTEGER NOT NULL);",
    )?;
    for (name, sql) in MIGRATIONS {
        let already: bool = conn
            .query_row("SELECT 1 FROM schema_migrations WHERE name = ?1", [name], |_| Ok(true))
            .unwrap_or(false);
        if already {
            continue;
        }
        conn.execute_batch(sql)?;
        conn.execute(
            "INSERT INTO schema_migrations (name, applied_at) VALUES (?1, strftime('%s','now'))",
            [name],
        )?;
        tracing::debug!(migration = name, "applied schema migration");
    }
    Ok(())
}

#[cfg(test)]
#[path = "db_tests.rs"]
mod tests;
