//! Persistence for workflow instances, steps, and events (`workflow_*`
//! tables owned by `forge-storage`; spec §4.6).

use forge_storage::Db;
use rusqlite::{params, OptionalExtension};
use serde_json::Value;

use crate::error::WorkflowError;
use crate::types::{Status, WorkflowInstanceRow};

#[derive(Clone)]
pub struct WorkflowStore {
    db: Db,
}

impl WorkflowStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub fn create_instance(&self, id: &str, workflow_name: &str, class_name: &str, params: &Value, now: i64) -> Result<(), WorkflowError> {
        let encoded = serde_json::to_string(params)?;
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO workflow_instances (id, workflow_name, class_name, params, status, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 'running', ?5, ?5)",
                params![id, workflow_name, class_name, encoded, now],
            )?;
            Ok(())
        })?;
        Ok(())
    }

    pub fn get_instance(&self, id: &str) -> Result<Option<WorkflowInstanceRow>, WorkflowError> {
        let row: Option<(String, String, String, String, String, Option<String>, Option<String>, i64, i64)> = self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT id, workflow_name, class_name, params, status, output, error, created_at, updated_at
                 FROM workflow_instances WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                        row.get(7)?,
                        row.get(8)?,
                    ))
                },
            )
            .optional()
            .map_err(Into::into)
        })?;

        row.map(|(id, workflow_name, class_name, params, status, output, error, created_at, updated_at)| {
            Ok(WorkflowInstanceRow {
                id,
                workflow_name,
                class_name,
                params: serde_json::from_str(&params)?,
                status: Status::parse(&status)?,
                output: output.map(|o| serde_json::from_str(&o)).transpose()?,
                error,
                created_at,
                updated_at,
            })
        })
        .transpose()
    }

    pub fn set_status(&self, id: &str, status: Status, now: i64) -> Result<(), WorkflowError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE workflow_instances SET status = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, status.as_str(), now],
            )?;
            Ok(())
        })?;
        Ok(())
    }

    pub fn set_complete(&self, id: &str, output: &Value, now: i64) -> Result<(), WorkflowError> {
        let encoded = serde_json::to_string(output)?;
        self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE workflow_instances SET status = 'complete', output = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, encoded, now],
            )?;
            Ok(())
        })?;
        Ok(())
    }

    pub fn set_errored(&self, id: &str, error: &str, now: i64) -> Result<(), WorkflowError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "UPDATE workflow_instances SET status = 'errored', error = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, error, now],
            )?;
            Ok(())
        })?;
        Ok(())
    }

    /// Every instance still `running` — re-invoked on binding init (spec:
    /// crash recovery).
    pub fn list_running(&self) -> Result<Vec<WorkflowInstanceRow>, WorkflowError> {
        let ids: Vec<String> = self.db.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM workflow_instances WHERE status = 'running'")?;
            let rows = stmt.query_map([], |row| row.get(0))?.collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;
        ids.into_iter().filter_map(|id| self.get_instance(&id).transpose()).collect()
    }

    pub fn get_step_output(&self, instance_id: &str, step_name: &str) -> Result<Option<Value>, WorkflowError> {
        let encoded: Option<String> = self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT output FROM workflow_steps WHERE instance_id = ?1 AND step_name = ?2",
                params![instance_id, step_name],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
        })?;
        encoded.map(|s| serde_json::from_str(&s).map_err(Into::into)).transpose()
    }

    pub fn put_step_output(&self, instance_id: &str, step_name: &str, output: &Value, now: i64) -> Result<(), WorkflowError> {
        let encoded = serde_json::to_string(output)?;
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO workflow_steps (instance_id, step_name, output, completed_at) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(instance_id, step_name) DO UPDATE SET output = excluded.output, completed_at = excluded.completed_at",
                params![instance_id, step_name, encoded, now],
            )?;
            Ok(())
        })?;
        Ok(())
    }

    pub fn get_step_attempts(&self, instance_id: &str, step_name: &str) -> Result<u32, WorkflowError> {
        let attempts: Option<u32> = self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT failed_attempts FROM workflow_step_attempts WHERE instance_id = ?1 AND step_name = ?2",
                params![instance_id, step_name],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
        })?;
        Ok(attempts.unwrap_or(0))
    }

    pub fn record_step_failure(&self, instance_id: &str, step_name: &str, error: &str, error_id: &str, now: i64) -> Result<u32, WorkflowError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO workflow_step_attempts (instance_id, step_name, failed_attempts, last_error, last_error_id, updated_at)
                 VALUES (?1, ?2, 1, ?3, ?4, ?5)
                 ON CONFLICT(instance_id, step_name) DO UPDATE SET
                   failed_attempts = failed_attempts + 1, last_error = excluded.last_error,
                   last_error_id = excluded.last_error_id, updated_at = excluded.updated_at",
                params![instance_id, step_name, error, error_id, now],
            )?;
            conn.query_row(
                "SELECT failed_attempts FROM workflow_step_attempts WHERE instance_id = ?1 AND step_name = ?2",
                params![instance_id, step_name],
                |row| row.get(0),
            )
            .map_err(Into::into)
        })
        .map_err(Into::into)
    }

    /// `restart({fromStep})` — deletes step rows from `fromStep` onward (or
    /// all, if `None`), clearing retry-attempt counters for the instance.
    pub fn delete_steps_from(&self, instance_id: &str, from_step: Option<&str>) -> Result<(), WorkflowError> {
        self.db.with_conn(|conn| {
            match from_step {
                None => {
                    conn.execute("DELETE FROM workflow_steps WHERE instance_id = ?1", params![instance_id])?;
                }
                Some(step_name) => {
                    let from_rowid: Option<i64> = conn
                        .query_row(
                            "SELECT rowid FROM workflow_steps WHERE instance_id = ?1 AND step_name = ?2",
                            params![instance_id, step_name],
                            |row| row.get(0),
                        )
                        .optional()?;
                    if let Some(from_rowid) = from_rowid {
                        conn.execute(
                            "DELETE FROM workflow_steps WHERE instance_id = ?1 AND rowid >= ?2",
                            params![instance_id, from_rowid],
                        )?;
                    }
                }
            }
            conn.execute("DELETE FROM workflow_step_attempts WHERE instance_id = ?1", params![instance_id])?;
            Ok(())
        })?;
        Ok(())
    }

    pub fn send_event(&self, instance_id: &str, event_type: &str, payload: &Value, now: i64) -> Result<(), WorkflowError> {
        let encoded = serde_json::to_string(payload)?;
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO workflow_events (instance_id, event_type, payload, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![instance_id, event_type, encoded, now],
            )?;
            Ok(())
        })?;
        Ok(())
    }

    /// Consumes (deletes) the oldest unread event of `event_type`, if any.
    pub fn take_matching_event(&self, instance_id: &str, event_type: &str) -> Result<Option<Value>, WorkflowError> {
        let encoded: Option<String> = self.db.with_conn(|conn| {
            let found: Option<(i64, String)> = conn
                .query_row(
                    "SELECT rowid, payload FROM workflow_events WHERE instance_id = ?1 AND event_type = ?2
                     ORDER BY created_at LIMIT 1",
                    params![instance_id, event_type],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            match found {
                Some((rowid, payload)) => {
                    conn.execute("DELETE FROM workflow_events WHERE rowid = ?1", params![rowid])?;
                    Ok(Some(payload))
                }
                None => Ok(None),
            }
        })?;
        encoded.map(|s| serde_json::from_str(&s).map_err(Into::into)).transpose()
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
