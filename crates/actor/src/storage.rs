//! Durable actor storage (spec §4.5.3): a KV store scoped to `(namespace,
//! id)` on the shared database, plus a fully isolated per-instance SQL file.
//!
//! The JS API is described as async with a synchronous `storage.kv` twin;
//! both read and write the same rows, so in this synchronous Rust port
//! [`ActorKv`] simply *is* that twin — there is no separate async path to
//! keep in sync.

use std::path::{Path, PathBuf};

use forge_storage::Db;
use rusqlite::{params, OptionalExtension};
use serde_json::Value;

use crate::error::ActorError;

#[derive(Clone)]
pub struct ActorKv {
    db: Db,
    namespace: String,
    id: String,
}

#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub prefix: Option<String>,
    pub start: Option<String>,
    pub start_after: Option<String>,
    pub end: Option<String>,
    pub limit: Option<usize>,
    pub reverse: bool,
}

impl ActorKv {
    pub fn new(db: Db, namespace: impl Into<String>, id: impl Into<String>) -> Self {
        Self { db, namespace: namespace.into(), id: id.into() }
    }

    pub fn get(&self, key: &str) -> Result<Option<Value>, ActorError> {
        let value: Option<String> = self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT value FROM do_storage WHERE namespace = ?1 AND id = ?2 AND key = ?3",
                params![self.namespace, self.id, key],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
        })?;
        Ok(match value {
            Some(s) => Some(serde_json::from_str(&s)?),
            None => None,
        })
    }

    pub fn get_many(&self, keys: &[String]) -> Result<Vec<(String, Value)>, ActorError> {
        let mut out = Vec::new();
        for key in keys {
            if let Some(value) = self.get(key)? {
                out.push((key.clone(), value));
            }
        }
        Ok(out)
    }

    pub fn put(&self, key: &str, value: &Value) -> Result<(), ActorError> {
        let encoded = serde_json::to_string(value)?;
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO do_storage (namespace, id, key, value) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(namespace, id, key) DO UPDATE SET value = excluded.value",
                params![self.namespace, self.id, key, encoded],
            )?;
            Ok(())
        })?;
        Ok(())
    }

    pub fn put_many(&self, entries: &[(String, Value)]) -> Result<(), ActorError> {
        self.db.with_conn(|conn| {
            conn.execute_batch("BEGIN")?;
            for (key, value) in entries {
                let encoded = serde_json::to_string(value).map_err(|e| {
                    rusqlite::Error::ToSqlConversionFailure(Box::new(e))
                })?;
                if let Err(e) = conn.execute(
                    "INSERT INTO do_storage (namespace, id, key, value) VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(namespace, id, key) DO UPDATE SET value = excluded.value",
                    params![self.namespace, self.id, key, encoded],
                ) {
                    conn.execute_batch("ROLLBACK")?;
                    return Err(e.into());
                }
            }
            conn.execute_batch("COMMIT")?;
            Ok(())
        })?;
        Ok(())
    }

    pub fn delete(&self, key: &str) -> Result<bool, ActorError> {
        let changed = self.db.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM do_storage WHERE namespace = ?1 AND id = ?2 AND key = ?3",
                params![self.namespace, self.id, key],
            )?;
            Ok(n)
        })?;
        Ok(changed > 0)
    }

    pub fn delete_many(&self, keys: &[String]) -> Result<usize, ActorError> {
        let mut total = 0;
        for key in keys {
            if self.delete(key)? {
                total += 1;
            }
        }
        Ok(total)
    }

    pub fn delete_all(&self) -> Result<(), ActorError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "DELETE FROM do_storage WHERE namespace = ?1 AND id = ?2",
                params![self.namespace, self.id],
            )?;
            Ok(())
        })?;
        Ok(())
    }

    pub fn list(&self, opts: ListOptions) -> Result<Vec<(String, Value)>, ActorError> {
        let rows: Vec<(String, String)> = self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT key, value FROM do_storage WHERE namespace = ?1 AND id = ?2 ORDER BY key",
            )?;
            let rows = stmt
                .query_map(params![self.namespace, self.id], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        let mut filtered: Vec<(String, String)> = rows
            .into_iter()
            .filter(|(k, _)| {
                if let Some(prefix) = &opts.prefix {
                    if !k.starts_with(prefix.as_str()) {
                        return false;
                    }
                }
                if let Some(start) = &opts.start {
                    if k.as_str() < start.as_str() {
                        return false;
                    }
                }
                if let Some(start_after) = &opts.start_after {
                    if k.as_str() <= start_after.as_str() {
                        return false;
                    }
                }
                if let Some(end) = &opts.end {
                    if k.as_str() >= end.as_str() {
                        return false;
                    }
                }
                true
            })
            .collect();

        if opts.reverse {
            filtered.reverse();
        }
        if let Some(limit) = opts.limit {
            filtered.truncate(limit);
        }

        filtered
            .into_iter()
            .map(|(k, v)| Ok((k, serde_json::from_str(&v)?)))
            .collect()
    }

    /// `storage.transaction(fn)` / `storage.transactionSync(fn)` — both
    /// collapse to the same BEGIN/COMMIT/ROLLBACK wrapper in this
    /// synchronous port. The BEGIN/COMMIT bracket the shared connection's
    /// transaction state, not a held lock, so callers should not run
    /// unrelated writes on other bindings concurrently with a long-lived
    /// actor transaction.
    pub fn transaction<T>(&self, f: impl FnOnce(&ActorKv) -> Result<T, ActorError>) -> Result<T, ActorError> {
        self.db.with_conn(|conn| conn.execute_batch("BEGIN").map_err(Into::into))?;
        match f(self) {
            Ok(value) => {
                self.db.with_conn(|conn| conn.execute_batch("COMMIT").map_err(Into::into))?;
                Ok(value)
            }
            Err(err) => {
                self.db.with_conn(|conn| conn.execute_batch("ROLLBACK").map_err(Into::into))?;
                Err(err)
            }
        }
    }
}

/// Per-instance SQL storage (spec: `storage.sql`), fully isolated at
/// `{dataDir}/do-sql/{namespace}/{id}.sqlite`.
pub struct ActorSql {
    conn: rusqlite::Connection,
    path: PathBuf,
    rows_read: std::cell::Cell<u64>,
    rows_written: std::cell::Cell<u64>,
}

pub struct SqlCursor {
    pub column_names: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl SqlCursor {
    pub fn to_array(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn one(&self) -> Result<&Vec<Value>, ActorError> {
        if self.rows.len() != 1 {
            return Err(ActorError::WrongRowCount(self.rows.len()));
        }
        Ok(&self.rows[0])
    }

    pub fn raw(&self) -> Vec<Vec<Value>> {
        self.rows.clone()
    }
}

impl ActorSql {
    pub fn open(do_sql_dir: &Path, namespace: &str, id: &str) -> Result<Self, ActorError> {
        let dir = do_sql_dir.join(namespace);
        std::fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{id}.sqlite"));
        let conn = rusqlite::Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self { conn, path, rows_read: std::cell::Cell::new(0), rows_written: std::cell::Cell::new(0) })
    }

    pub fn exec(&self, sql: &str, params: &[Value]) -> Result<SqlCursor, ActorError> {
        let bound: Vec<Box<dyn rusqlite::ToSql>> = params.iter().map(json_to_tosql).collect();
        let refs: Vec<&dyn rusqlite::ToSql> = bound.iter().map(|b| b.as_ref()).collect();
        let mut stmt = self.conn.prepare(sql)?;
        let column_names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        if stmt.readonly() {
            let mut rows_out = Vec::new();
            let mut rows = stmt.query(refs.as_slice())?;
            while let Some(row) = rows.next()? {
                let mut values = Vec::with_capacity(column_names.len());
                for i in 0..column_names.len() {
                    values.push(sql_value_to_json(row.get_ref(i)?));
                }
                rows_out.push(values);
            }
            self.rows_read.set(self.rows_read.get() + rows_out.len() as u64);
            Ok(SqlCursor { column_names, rows: rows_out })
        } else {
            let changed = stmt.execute(refs.as_slice())?;
            self.rows_written.set(self.rows_written.get() + changed as u64);
            Ok(SqlCursor { column_names, rows: Vec::new() })
        }
    }

    pub fn rows_read(&self) -> u64 {
        self.rows_read.get()
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written.get()
    }

    pub fn database_size(&self) -> u64 {
        std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }
}

fn json_to_tosql(value: &Value) -> Box<dyn rusqlite::ToSql> {
    match value {
        Value::Null => Box::new(Option::<i64>::None),
        Value::Bool(b) => Box::new(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Box::new(i)
            } else {
                Box::new(n.as_f64().unwrap_or(0.0))
            }
        }
        Value::String(s) => Box::new(s.clone()),
        other => Box::new(other.to_string()),
    }
}

fn sql_value_to_json(value: rusqlite::types::ValueRef<'_>) -> Value {
    match value {
        rusqlite::types::ValueRef::Null => Value::Null,
        rusqlite::types::ValueRef::Integer(i) => Value::Number(i.into()),
        rusqlite::types::ValueRef::Real(f) => {
            serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
        }
        rusqlite::types::ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        rusqlite::types::ValueRef::Blob(b) => Value::String(forge_core_base64(b)),
    }
}

fn forge_core_base64(bytes: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

#[cfg(test)]
#[path = "storage_tests.rs"]
mod tests;
