//! Task type reference data.

use super::{optional, unique_as_field, Database};
use crate::error::{Error, Result};
use crate::types::TaskType;
use rusqlite::{params, Connection, Row};

const DUPLICATE: &str = "Task type with this Name already exists.";

fn parse_task_type_row(row: &Row) -> rusqlite::Result<TaskType> {
    Ok(TaskType {
        id: row.get("id")?,
        name: row.get("name")?,
    })
}

pub(crate) fn get_task_type_internal(conn: &Connection, id: i64) -> Result<Option<TaskType>> {
    optional(conn.query_row(
        "SELECT id, name FROM task_types WHERE id = ?1",
        params![id],
        parse_task_type_row,
    ))
}

fn name_taken(conn: &Connection, name: &str, exclude_id: Option<i64>) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM task_types WHERE name = ?1 AND id IS NOT ?2",
        params![name, exclude_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

impl Database {
    /// Create a task type. `name` must already be cleaned.
    pub fn create_task_type(&self, name: &str) -> Result<TaskType> {
        self.transaction(|tx| {
            if name_taken(tx, name, None)? {
                return Err(Error::invalid("name", DUPLICATE));
            }
            tx.execute("INSERT INTO task_types (name) VALUES (?1)", params![name])
                .map_err(|e| unique_as_field(e, "task_types", "name", DUPLICATE))?;
            Ok(TaskType {
                id: tx.last_insert_rowid(),
                name: name.to_string(),
            })
        })
    }

    pub fn get_task_type(&self, id: i64) -> Result<Option<TaskType>> {
        self.with_conn(|conn| get_task_type_internal(conn, id))
    }

    /// Task types ordered by name, optionally capped.
    pub fn list_task_types(&self, limit: Option<i64>) -> Result<Vec<TaskType>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, name FROM task_types ORDER BY name, id LIMIT ?1")?;
            // LIMIT -1 means no limit in SQLite
            let task_types = stmt
                .query_map(params![limit.map_or(-1, |n| n.max(0))], parse_task_type_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(task_types)
        })
    }

    pub fn rename_task_type(&self, id: i64, name: &str) -> Result<TaskType> {
        self.transaction(|tx| {
            if get_task_type_internal(tx, id)?.is_none() {
                return Err(Error::not_found("task type", id));
            }
            if name_taken(tx, name, Some(id))? {
                return Err(Error::invalid("name", DUPLICATE));
            }
            tx.execute(
                "UPDATE task_types SET name = ?1 WHERE id = ?2",
                params![name, id],
            )
            .map_err(|e| unique_as_field(e, "task_types", "name", DUPLICATE))?;
            Ok(TaskType {
                id,
                name: name.to_string(),
            })
        })
    }

    /// Delete a task type that no task refers to.
    pub fn delete_task_type(&self, id: i64) -> Result<()> {
        self.transaction(|tx| {
            if get_task_type_internal(tx, id)?.is_none() {
                return Err(Error::not_found("task type", id));
            }
            let in_use: i64 = tx.query_row(
                "SELECT COUNT(*) FROM tasks WHERE task_type_id = ?1",
                params![id],
                |row| row.get(0),
            )?;
            if in_use > 0 {
                return Err(Error::conflict(format!(
                    "Task type is used by {} task(s); reassign or delete them first.",
                    in_use
                )));
            }
            tx.execute("DELETE FROM task_types WHERE id = ?1", params![id])?;
            Ok(())
        })
    }
}
