//! Position reference data.

use super::{optional, unique_as_field, Database};
use crate::error::{Error, Result};
use crate::types::Position;
use rusqlite::{params, Connection};

const DUPLICATE: &str = "Position with this Name already exists.";

pub(crate) fn get_position_internal(conn: &Connection, id: i64) -> Result<Option<Position>> {
    optional(conn.query_row(
        "SELECT id, name FROM positions WHERE id = ?1",
        params![id],
        |row| {
            Ok(Position {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        },
    ))
}

fn name_taken(conn: &Connection, name: &str, exclude_id: Option<i64>) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM positions WHERE name = ?1 AND id IS NOT ?2",
        params![name, exclude_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

impl Database {
    /// Create a position. `name` must already be cleaned.
    pub fn create_position(&self, name: &str) -> Result<Position> {
        self.transaction(|tx| {
            if name_taken(tx, name, None)? {
                return Err(Error::invalid("name", DUPLICATE));
            }
            tx.execute("INSERT INTO positions (name) VALUES (?1)", params![name])
                .map_err(|e| unique_as_field(e, "positions", "name", DUPLICATE))?;
            Ok(Position {
                id: tx.last_insert_rowid(),
                name: name.to_string(),
            })
        })
    }

    pub fn get_position(&self, id: i64) -> Result<Option<Position>> {
        self.with_conn(|conn| get_position_internal(conn, id))
    }

    /// Look up a position by exact name.
    pub fn find_position_by_name(&self, name: &str) -> Result<Option<Position>> {
        self.with_conn(|conn| {
            optional(conn.query_row(
                "SELECT id, name FROM positions WHERE name = ?1",
                params![name],
                |row| {
                    Ok(Position {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            ))
        })
    }

    /// All positions ordered by name.
    pub fn list_positions(&self) -> Result<Vec<Position>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM positions ORDER BY name, id")?;
            let positions = stmt
                .query_map([], |row| {
                    Ok(Position {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(positions)
        })
    }

    pub fn rename_position(&self, id: i64, name: &str) -> Result<Position> {
        self.transaction(|tx| {
            if get_position_internal(tx, id)?.is_none() {
                return Err(Error::not_found("position", id));
            }
            if name_taken(tx, name, Some(id))? {
                return Err(Error::invalid("name", DUPLICATE));
            }
            tx.execute(
                "UPDATE positions SET name = ?1 WHERE id = ?2",
                params![name, id],
            )
            .map_err(|e| unique_as_field(e, "positions", "name", DUPLICATE))?;
            Ok(Position {
                id,
                name: name.to_string(),
            })
        })
    }

    /// Delete a position. Workers holding it keep their accounts with no position.
    pub fn delete_position(&self, id: i64) -> Result<()> {
        self.transaction(|tx| {
            let removed = tx.execute("DELETE FROM positions WHERE id = ?1", params![id])?;
            if removed == 0 {
                return Err(Error::not_found("position", id));
            }
            Ok(())
        })
    }
}
