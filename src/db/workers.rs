//! Worker accounts.

use super::positions::get_position_internal;
use super::{now_ms, optional, unique_as_field, Database};
use crate::error::{Error, FieldErrors, Result};
use crate::forms::{WorkerChanges, INVALID_CHOICE, REQUIRED};
use crate::types::{page_window, Page, Position, RankedWorker, Worker, WorkerSummary};
use rusqlite::{params, Connection, Row};

const DUPLICATE: &str = "A user with that username already exists.";

const WORKER_SELECT: &str = "SELECT w.id, w.username, w.first_name, w.last_name, w.email,
        w.is_staff, w.date_joined, p.id AS position_id, p.name AS position_name
     FROM workers w
     LEFT JOIN positions p ON p.id = w.position_id";

pub fn parse_worker_row(row: &Row) -> rusqlite::Result<Worker> {
    let position_id: Option<i64> = row.get("position_id")?;
    let position_name: Option<String> = row.get("position_name")?;
    let position = match (position_id, position_name) {
        (Some(id), Some(name)) => Some(Position { id, name }),
        _ => None,
    };

    Ok(Worker {
        id: row.get("id")?,
        username: row.get("username")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        email: row.get("email")?,
        is_staff: row.get("is_staff")?,
        position,
        date_joined: row.get("date_joined")?,
    })
}

/// Internal helper to get a worker using an existing connection (avoids deadlock).
pub(crate) fn get_worker_internal(conn: &Connection, worker_id: i64) -> Result<Option<Worker>> {
    let sql = format!("{} WHERE w.id = ?1", WORKER_SELECT);
    optional(conn.query_row(&sql, params![worker_id], parse_worker_row))
}

pub(crate) fn worker_exists(conn: &Connection, worker_id: i64) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM workers WHERE id = ?1",
        params![worker_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Checks that need the database: username uniqueness and position reference.
fn check_references(
    conn: &Connection,
    changes: &WorkerChanges,
    exclude_id: Option<i64>,
    errors: &mut FieldErrors,
) -> Result<()> {
    if let Some(username) = &changes.username {
        let taken: i64 = conn.query_row(
            "SELECT COUNT(*) FROM workers WHERE username = ?1 AND id IS NOT ?2",
            params![username, exclude_id],
            |row| row.get(0),
        )?;
        if taken > 0 {
            errors.add("username", DUPLICATE);
        }
    }
    if let Some(Some(position_id)) = changes.position_id
        && get_position_internal(conn, position_id)?.is_none()
    {
        errors.add("position", INVALID_CHOICE);
    }
    Ok(())
}

impl Database {
    /// Create a worker from cleaned form changes.
    ///
    /// `form_errors` holds the per-field problems already found by the form;
    /// they are reported together with the database checks.
    pub fn create_worker(
        &self,
        changes: &WorkerChanges,
        is_staff: bool,
        form_errors: FieldErrors,
    ) -> Result<Worker> {
        let now = now_ms();

        self.transaction(|tx| {
            let mut errors = form_errors;
            if changes.username.is_none() && !errors.contains("username") {
                errors.add("username", REQUIRED);
            }
            check_references(tx, changes, None, &mut errors)?;
            errors.into_result()?;

            let username = changes.username.as_deref().unwrap_or_default();
            tx.execute(
                "INSERT INTO workers (
                    username, first_name, last_name, email, is_staff, position_id, date_joined
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    username,
                    changes.first_name.as_deref().unwrap_or_default(),
                    changes.last_name.as_deref().unwrap_or_default(),
                    changes.email.as_deref().unwrap_or_default(),
                    is_staff,
                    changes.position_id.flatten(),
                    now,
                ],
            )
            .map_err(|e| unique_as_field(e, "workers", "username", DUPLICATE))?;

            let id = tx.last_insert_rowid();
            get_worker_internal(tx, id)?
                .ok_or_else(|| Error::Internal(format!("worker {} vanished after insert", id)))
        })
    }

    /// Get a worker by ID.
    pub fn get_worker(&self, worker_id: i64) -> Result<Option<Worker>> {
        self.with_conn(|conn| get_worker_internal(conn, worker_id))
    }

    /// Get a worker by exact username.
    pub fn find_worker_by_username(&self, username: &str) -> Result<Option<Worker>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE w.username = ?1", WORKER_SELECT);
            optional(conn.query_row(&sql, params![username], parse_worker_row))
        })
    }

    /// Workers ordered by username with their position, one page at a time.
    pub fn list_workers(&self, page: i64, page_size: i64) -> Result<Page<Worker>> {
        let (page, page_size, offset) = page_window(page, page_size);

        self.with_conn(|conn| {
            let total: i64 = conn.query_row("SELECT COUNT(*) FROM workers", [], |row| row.get(0))?;

            let sql = format!("{} ORDER BY w.username, w.id LIMIT ?1 OFFSET ?2", WORKER_SELECT);
            let mut stmt = conn.prepare(&sql)?;
            let workers = stmt
                .query_map(params![page_size, offset], parse_worker_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(Page::new(workers, page, page_size, total))
        })
    }

    /// Apply cleaned changes to a worker. `is_staff` is never touched here.
    pub fn update_worker(
        &self,
        worker_id: i64,
        changes: &WorkerChanges,
        form_errors: FieldErrors,
    ) -> Result<Worker> {
        self.transaction(|tx| {
            let current = get_worker_internal(tx, worker_id)?
                .ok_or_else(|| Error::not_found("worker", worker_id))?;

            let mut errors = form_errors;
            check_references(tx, changes, Some(worker_id), &mut errors)?;
            errors.into_result()?;

            let position_id = match changes.position_id {
                Some(p) => p,
                None => current.position.as_ref().map(|p| p.id),
            };

            tx.execute(
                "UPDATE workers SET username = ?1, first_name = ?2, last_name = ?3,
                    email = ?4, position_id = ?5
                 WHERE id = ?6",
                params![
                    changes.username.as_ref().unwrap_or(&current.username),
                    changes.first_name.as_ref().unwrap_or(&current.first_name),
                    changes.last_name.as_ref().unwrap_or(&current.last_name),
                    changes.email.as_ref().unwrap_or(&current.email),
                    position_id,
                    worker_id,
                ],
            )
            .map_err(|e| unique_as_field(e, "workers", "username", DUPLICATE))?;

            get_worker_internal(tx, worker_id)?
                .ok_or_else(|| Error::not_found("worker", worker_id))
        })
    }

    /// Delete a worker.
    ///
    /// Tasks they created stay with `created_by` cleared; their assignment
    /// rows are removed.
    pub fn delete_worker(&self, worker_id: i64) -> Result<()> {
        self.transaction(|tx| {
            let removed = tx.execute("DELETE FROM workers WHERE id = ?1", params![worker_id])?;
            if removed == 0 {
                return Err(Error::not_found("worker", worker_id));
            }
            Ok(())
        })
    }

    /// Workers ranked by number of assigned tasks, most first.
    pub fn team_ranking(&self, limit: i64) -> Result<Vec<RankedWorker>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT w.id, w.username, w.first_name, w.last_name, COUNT(ta.task_id) AS task_count
                 FROM workers w
                 LEFT JOIN task_assignees ta ON ta.worker_id = w.id
                 GROUP BY w.id
                 ORDER BY task_count DESC, w.username
                 LIMIT ?1",
            )?;
            let ranked = stmt
                .query_map(params![limit.max(0)], |row| {
                    Ok(RankedWorker {
                        worker: WorkerSummary {
                            id: row.get(0)?,
                            username: row.get(1)?,
                            first_name: row.get(2)?,
                            last_name: row.get(3)?,
                        },
                        task_count: row.get(4)?,
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(ranked)
        })
    }
}
