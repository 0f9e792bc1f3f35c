//! D1 binding (spec §4.3): a per-binding SQLite file distinct from the main
//! database, at `{dataDir}/d1/{databaseName}.sqlite`.

use crate::db::Db;
use crate::error::StorageError;
use parking_lot::Mutex;
use rusqlite::Connection;
use rusqlite::types::ValueRef;
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Clone)]
pub struct D1Database {
    conn: Arc<Mutex<Connection>>,
}

#[derive(Debug, Clone, Default)]
pub struct D1Result {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub rows_read: u64,
    pub rows_written: u64,
}

impl D1Result {
    /// `.first()` — the first row as a column→value object, or `null`.
    pub fn first(&self) -> Option<Value> {
        self.rows.first().map(|row| self.row_to_object(row))
    }

    /// `.all()` — every row as column→value objects.
    pub fn all(&self) -> Vec<Value> {
        self.rows.iter().map(|row| self.row_to_object(row)).collect()
    }

    /// `.raw({columnNames:true})` — arrays, optionally prefixed with a
    /// column-name row.
    pub fn raw(&self, column_names: bool) -> Vec<Vec<Value>> {
        let mut out = Vec::with_capacity(self.rows.len() + 1);
        if column_names {
            out.push(self.columns.iter().map(|c| Value::String(c.clone())).collect());
        }
        out.extend(self.rows.iter().cloned());
        out
    }

    fn row_to_object(&self, row: &[Value]) -> Value {
        let mut map = Map::new();
        for (col, val) in self.columns.iter().zip(row.iter()) {
            map.insert(col.clone(), val.clone());
        }
        Value::Object(map)
    }
}

pub struct PreparedStatement<'a> {
    db: &'a D1Database,
    sql: String,
    params: Vec<Value>,
}

impl<'a> PreparedStatement<'a> {
    pub fn bind(mut self, params: Vec<Value>) -> Self {
        self.params = params;
        self
    }

    pub fn run(&self) -> Result<D1Result, StorageError> {
        self.db.exec_one(&self.sql, &self.params)
    }

    pub fn first(&self) -> Result<Option<Value>, StorageError> {
        Ok(self.run()?.first())
    }

    pub fn all(&self) -> Result<Vec<Value>, StorageError> {
        Ok(self.run()?.all())
    }

    pub fn one(&self) -> Result<Value, StorageError> {
        let result = self.run()?;
        if result.rows.len() != 1 {
            return Err(StorageError::InvalidInput(format!(
                "expected exactly one row, got {}",
                result.rows.len()
            )));
        }
        Ok(result.first().unwrap())
    }
}

impl D1Database {
    pub fn open(db: &Db, database_name: &str) -> Result<Self, StorageError> {
        let path = db.d1_dir().join(format!("{database_name}.sqlite"));
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    pub fn prepare(&self, sql: &str) -> PreparedStatement<'_> {
        PreparedStatement { db: self, sql: sql.to_string(), params: Vec::new() }
    }

    /// `exec(sql)` — splits multi-statement SQL on `;` and runs each in turn.
    pub fn exec(&self, sql: &str) -> Result<D1Result, StorageError> {
        let mut total = D1Result::default();
        for statement in sql.split(';') {
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }
            let result = self.exec_one(statement, &[])?;
            total.rows_written += result.rows_written;
            total.rows_read += result.rows_read;
        }
        Ok(total)
    }

    /// `batch(stmts)` — all statements run in one transaction, rolled back on
    /// any error.
    pub fn batch(&self, stmts: &[(&str, Vec<Value>)]) -> Result<Vec<D1Result>, StorageError> {
        let conn = self.conn.lock();
        conn.execute_batch("BEGIN")?;
        let mut results = Vec::with_capacity(stmts.len());
        for (sql, params) in stmts {
            match run_statement(&conn, sql, params) {
                Ok(result) => results.push(result),
                Err(e) => {
                    conn.execute_batch("ROLLBACK")?;
                    return Err(e);
                }
            }
        }
        conn.execute_batch("COMMIT")?;
        Ok(results)
    }

    fn exec_one(&self, sql: &str, params: &[Value]) -> Result<D1Result, StorageError> {
        let conn = self.conn.lock();
        run_statement(&conn, sql, params)
    }
}

fn run_statement(conn: &Connection, sql: &str, params: &[Value]) -> Result<D1Result, StorageError> {
    let bound: Vec<Box<dyn rusqlite::ToSql>> = params.iter().map(json_to_sql).collect();
    let param_refs: Vec<&dyn rusqlite::ToSql> = bound.iter().map(|b| b.as_ref()).collect();

    let mut stmt = conn.prepare(sql)?;
    if !stmt.readonly() {
        let rows_written = stmt.execute(param_refs.as_slice())? as u64;
        return Ok(D1Result { columns: Vec::new(), rows: Vec::new(), rows_read: 0, rows_written });
    }

    let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
    let col_count = columns.len();
    let mut rows_out = Vec::new();
    let mut rows = stmt.query(param_refs.as_slice())?;
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            values.push(sql_to_json(row.get_ref(i)?));
        }
        rows_out.push(values);
    }
    let rows_read = rows_out.len() as u64;
    Ok(D1Result { columns, rows: rows_out, rows_read, rows_written: 0 })
}

fn json_to_sql(value: &Value) -> Box<dyn rusqlite::ToSql> {
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

fn sql_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(base64::Engine::encode(&base64::engine::general_purpose::STANDARD, b)),
    }
}

#[cfg(test)]
#[path = "d1_tests.rs"]
mod tests;
