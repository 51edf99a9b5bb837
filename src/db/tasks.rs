//! Task CRUD, completion and filtered listings.
//!
//! Every listing resolves `task_type` and `created_by` in the row query
//! itself and loads the assignees of the whole result set with one extra
//! query, so the number of round trips does not grow with the row count.

use super::task_types::get_task_type_internal;
use super::workers::worker_exists;
use super::{now_ms, placeholders, unique_as_field, Database};
use crate::error::{Error, FieldErrors, Result};
use crate::forms::{TaskChanges, INVALID_CHOICE, REQUIRED};
use crate::types::{page_window, Page, Priority, Task, TaskType, WorkerSummary};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{params, params_from_iter, Connection, Row};
use std::collections::HashMap;

const DUPLICATE: &str = "Task with this Name already exists.";

/// Upper bound on ids bound into one `IN (...)` list.
const MAX_IN_PARAMS: usize = 500;

const TASK_SELECT: &str = "SELECT t.id, t.name, t.description, t.deadline, t.is_completed,
        t.priority, t.created_at,
        tt.id AS task_type_id, tt.name AS task_type_name,
        c.id AS creator_id, c.username AS creator_username,
        c.first_name AS creator_first_name, c.last_name AS creator_last_name
     FROM tasks t
     JOIN task_types tt ON tt.id = t.task_type_id
     LEFT JOIN workers c ON c.id = t.created_by_id";

impl ToSql for Priority {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Priority {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

/// Sort order for task listings. Ties always fall back to insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskOrder {
    /// Latest deadline first.
    #[default]
    DeadlineDesc,
    /// Earliest deadline first.
    DeadlineAsc,
}

impl TaskOrder {
    fn sql(&self) -> &'static str {
        match self {
            TaskOrder::DeadlineDesc => "ORDER BY t.deadline DESC, t.id ASC",
            TaskOrder::DeadlineAsc => "ORDER BY t.deadline ASC, t.id ASC",
        }
    }
}

/// Filters for task listings. Unset fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    /// Only tasks this worker is assigned to.
    pub assignee_id: Option<i64>,
    pub task_type_id: Option<i64>,
    /// Case-insensitive substring of the task type name.
    pub task_type_name: Option<String>,
    pub is_completed: Option<bool>,
    pub priority: Option<Priority>,
    /// Case-insensitive substring of name, description or creator username.
    pub search: Option<String>,
    pub order: TaskOrder,
}

impl TaskQuery {
    pub fn assigned_to(worker_id: i64) -> Self {
        Self {
            assignee_id: Some(worker_id),
            ..Default::default()
        }
    }

    pub fn with_task_type_name(mut self, name: Option<&str>) -> Self {
        self.task_type_name = name.filter(|n| !n.is_empty()).map(str::to_string);
        self
    }

    pub fn with_completed(mut self, is_completed: bool) -> Self {
        self.is_completed = Some(is_completed);
        self
    }

    pub fn with_order(mut self, order: TaskOrder) -> Self {
        self.order = order;
        self
    }

    /// Build the WHERE clause and its bound values.
    fn where_clause(&self) -> (String, Vec<Value>) {
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(worker_id) = self.assignee_id {
            clauses.push(
                "EXISTS (SELECT 1 FROM task_assignees ta
                         WHERE ta.task_id = t.id AND ta.worker_id = ?)",
            );
            values.push(Value::Integer(worker_id));
        }
        if let Some(type_id) = self.task_type_id {
            clauses.push("t.task_type_id = ?");
            values.push(Value::Integer(type_id));
        }
        if let Some(name) = self.task_type_name.as_deref().filter(|n| !n.is_empty()) {
            clauses.push("instr(casefold(tt.name), casefold(?)) > 0");
            values.push(Value::Text(name.to_string()));
        }
        if let Some(done) = self.is_completed {
            clauses.push("t.is_completed = ?");
            values.push(Value::Integer(i64::from(done)));
        }
        if let Some(priority) = self.priority {
            clauses.push("t.priority = ?");
            values.push(Value::Text(priority.as_str().to_string()));
        }
        if let Some(term) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            clauses.push(
                "(instr(casefold(t.name), casefold(?)) > 0
                  OR instr(casefold(t.description), casefold(?)) > 0
                  OR instr(casefold(COALESCE(c.username, '')), casefold(?)) > 0)",
            );
            values.extend(std::iter::repeat_n(Value::Text(term.to_string()), 3));
        }

        if clauses.is_empty() {
            (String::new(), values)
        } else {
            (format!("WHERE {}", clauses.join(" AND ")), values)
        }
    }
}

pub fn parse_task_row(row: &Row) -> rusqlite::Result<Task> {
    let creator_id: Option<i64> = row.get("creator_id")?;
    let created_by = match creator_id {
        Some(id) => Some(WorkerSummary {
            id,
            username: row.get("creator_username")?,
            first_name: row.get("creator_first_name")?,
            last_name: row.get("creator_last_name")?,
        }),
        None => None,
    };

    Ok(Task {
        id: row.get("id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        deadline: row.get("deadline")?,
        is_completed: row.get("is_completed")?,
        priority: row.get("priority")?,
        task_type: TaskType {
            id: row.get("task_type_id")?,
            name: row.get("task_type_name")?,
        },
        created_by,
        assignees: Vec::new(),
        created_at: row.get("created_at")?,
    })
}

/// Run `TASK_SELECT` with the given tail (WHERE / ORDER / LIMIT) and resolve assignees.
fn select_tasks(conn: &Connection, tail: &str, values: &[Value]) -> Result<Vec<Task>> {
    let sql = format!("{} {}", TASK_SELECT, tail);
    let mut stmt = conn.prepare(&sql)?;
    let mut tasks = stmt
        .query_map(params_from_iter(values.iter()), parse_task_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    load_assignees(conn, &mut tasks)?;
    Ok(tasks)
}

/// Fill in `assignees` for every task with one query per `MAX_IN_PARAMS` tasks.
fn load_assignees(conn: &Connection, tasks: &mut [Task]) -> Result<()> {
    if tasks.is_empty() {
        return Ok(());
    }

    let ids: Vec<i64> = tasks.iter().map(|t| t.id).collect();
    let mut by_task: HashMap<i64, Vec<WorkerSummary>> = HashMap::new();

    for chunk in ids.chunks(MAX_IN_PARAMS) {
        let sql = format!(
            "SELECT ta.task_id, w.id, w.username, w.first_name, w.last_name
             FROM task_assignees ta
             JOIN workers w ON w.id = ta.worker_id
             WHERE ta.task_id IN ({})
             ORDER BY w.username, w.id",
            placeholders(chunk.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(chunk.iter()), |row| {
            Ok((
                row.get::<_, i64>(0)?,
                WorkerSummary {
                    id: row.get(1)?,
                    username: row.get(2)?,
                    first_name: row.get(3)?,
                    last_name: row.get(4)?,
                },
            ))
        })?;
        for row in rows {
            let (task_id, worker) = row?;
            by_task.entry(task_id).or_default().push(worker);
        }
    }

    for task in tasks.iter_mut() {
        task.assignees = by_task.remove(&task.id).unwrap_or_default();
    }
    Ok(())
}

/// Internal helper to get a task using an existing connection (avoids deadlock).
pub(crate) fn get_task_internal(conn: &Connection, task_id: i64) -> Result<Option<Task>> {
    let mut tasks = select_tasks(conn, "WHERE t.id = ?", &[Value::Integer(task_id)])?;
    Ok(tasks.pop())
}

fn query_tasks_internal(
    conn: &Connection,
    query: &TaskQuery,
    limit: Option<i64>,
    offset: i64,
) -> Result<Vec<Task>> {
    let (where_sql, mut values) = query.where_clause();
    let tail = format!("{} {} LIMIT ? OFFSET ?", where_sql, query.order.sql());
    // LIMIT -1 means no limit in SQLite
    values.push(Value::Integer(limit.unwrap_or(-1)));
    values.push(Value::Integer(offset));
    select_tasks(conn, &tail, &values)
}

fn count_tasks_internal(conn: &Connection, query: &TaskQuery) -> Result<i64> {
    let (where_sql, values) = query.where_clause();
    let sql = format!(
        "SELECT COUNT(*) FROM tasks t
         JOIN task_types tt ON tt.id = t.task_type_id
         LEFT JOIN workers c ON c.id = t.created_by_id
         {}",
        where_sql
    );
    let count = conn.query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
    Ok(count)
}

/// Replace the assignee set of a task.
fn sync_assignees(conn: &Connection, task_id: i64, worker_ids: &[i64]) -> Result<()> {
    conn.execute(
        "DELETE FROM task_assignees WHERE task_id = ?1",
        params![task_id],
    )?;
    for worker_id in worker_ids {
        conn.execute(
            "INSERT INTO task_assignees (task_id, worker_id) VALUES (?1, ?2)",
            params![task_id, worker_id],
        )?;
    }
    Ok(())
}

/// Database-backed checks: name uniqueness, task type and assignee references.
fn check_references(
    conn: &Connection,
    changes: &TaskChanges,
    exclude_id: Option<i64>,
    errors: &mut FieldErrors,
) -> Result<()> {
    if let Some(name) = &changes.name {
        let taken: i64 = conn.query_row(
            "SELECT COUNT(*) FROM tasks WHERE name = ?1 AND id IS NOT ?2",
            params![name, exclude_id],
            |row| row.get(0),
        )?;
        if taken > 0 {
            errors.add("name", DUPLICATE);
        }
    }

    if let Some(type_id) = changes.task_type_id
        && get_task_type_internal(conn, type_id)?.is_none()
    {
        errors.add("task_type", INVALID_CHOICE);
    }

    if let Some(worker_ids) = &changes.assignee_ids {
        for &worker_id in worker_ids {
            if !worker_exists(conn, worker_id)? {
                errors.add(
                    "assignees",
                    format!(
                        "Select a valid choice. {} is not one of the available choices.",
                        worker_id
                    ),
                );
            }
        }
    }

    Ok(())
}

impl Database {
    /// Create a task owned by `creator_id`.
    ///
    /// `form_errors` are the per-field problems already found while cleaning
    /// the form; they are reported together with the database checks. The
    /// task always starts incomplete.
    pub fn create_task(
        &self,
        changes: &TaskChanges,
        form_errors: FieldErrors,
        creator_id: i64,
    ) -> Result<Task> {
        let now = now_ms();

        self.transaction(|tx| {
            let mut errors = form_errors;
            for (field, missing) in [
                ("name", changes.name.is_none()),
                ("deadline", changes.deadline.is_none()),
                ("task_type", changes.task_type_id.is_none()),
            ] {
                if missing && !errors.contains(field) {
                    errors.add(field, REQUIRED);
                }
            }
            check_references(tx, changes, None, &mut errors)?;
            errors.into_result()?;

            let (Some(name), Some(deadline), Some(task_type_id)) =
                (&changes.name, changes.deadline, changes.task_type_id)
            else {
                return Err(Error::Internal("task form passed validation incomplete".into()));
            };

            tx.execute(
                "INSERT INTO tasks (
                    name, description, deadline, is_completed, priority,
                    task_type_id, created_by_id, created_at
                ) VALUES (?1, ?2, ?3, 0, ?4, ?5, ?6, ?7)",
                params![
                    name,
                    changes.description.as_deref().unwrap_or_default(),
                    deadline,
                    changes.priority.unwrap_or_default(),
                    task_type_id,
                    creator_id,
                    now,
                ],
            )
            .map_err(|e| unique_as_field(e, "tasks", "name", DUPLICATE))?;

            let task_id = tx.last_insert_rowid();
            if let Some(worker_ids) = &changes.assignee_ids {
                sync_assignees(tx, task_id, worker_ids)?;
            }

            get_task_internal(tx, task_id)?
                .ok_or_else(|| Error::Internal(format!("task {} vanished after insert", task_id)))
        })
    }

    /// Get a task by ID with its relationships.
    pub fn get_task(&self, task_id: i64) -> Result<Option<Task>> {
        self.with_conn(|conn| get_task_internal(conn, task_id))
    }

    /// Apply supplied fields to a task.
    ///
    /// The creator and the completion flag are never changed here.
    pub fn update_task(
        &self,
        task_id: i64,
        changes: &TaskChanges,
        form_errors: FieldErrors,
    ) -> Result<Task> {
        self.transaction(|tx| {
            let current =
                get_task_internal(tx, task_id)?.ok_or_else(|| Error::not_found("task", task_id))?;

            let mut errors = form_errors;
            check_references(tx, changes, Some(task_id), &mut errors)?;
            errors.into_result()?;

            tx.execute(
                "UPDATE tasks SET name = ?1, description = ?2, deadline = ?3,
                    priority = ?4, task_type_id = ?5
                 WHERE id = ?6",
                params![
                    changes.name.as_ref().unwrap_or(&current.name),
                    changes.description.as_ref().unwrap_or(&current.description),
                    changes.deadline.unwrap_or(current.deadline),
                    changes.priority.unwrap_or(current.priority),
                    changes.task_type_id.unwrap_or(current.task_type.id),
                    task_id,
                ],
            )
            .map_err(|e| unique_as_field(e, "tasks", "name", DUPLICATE))?;

            if let Some(worker_ids) = &changes.assignee_ids {
                sync_assignees(tx, task_id, worker_ids)?;
            }

            get_task_internal(tx, task_id)?.ok_or_else(|| Error::not_found("task", task_id))
        })
    }

    /// Mark a task complete on behalf of `worker_id`.
    ///
    /// Only an assignee may do this. Completing an already complete task is a
    /// no-op success.
    pub fn complete_task(&self, task_id: i64, worker_id: i64) -> Result<Task> {
        self.transaction(|tx| {
            let task =
                get_task_internal(tx, task_id)?.ok_or_else(|| Error::not_found("task", task_id))?;

            if !task.is_assignee(worker_id) {
                return Err(Error::permission_denied(
                    "You don't have permission to complete this task.",
                ));
            }

            if task.is_completed {
                return Ok(task);
            }

            tx.execute(
                "UPDATE tasks SET is_completed = 1 WHERE id = ?1",
                params![task_id],
            )?;

            Ok(Task {
                is_completed: true,
                ..task
            })
        })
    }

    /// Delete a task and its assignment rows.
    pub fn delete_task(&self, task_id: i64) -> Result<()> {
        self.transaction(|tx| {
            let removed = tx.execute("DELETE FROM tasks WHERE id = ?1", params![task_id])?;
            if removed == 0 {
                return Err(Error::not_found("task", task_id));
            }
            Ok(())
        })
    }

    /// Tasks matching `query`, in its order, without paging.
    pub fn query_tasks(&self, query: &TaskQuery) -> Result<Vec<Task>> {
        self.with_conn(|conn| query_tasks_internal(conn, query, None, 0))
    }

    /// One page of tasks matching `query`. Pages past the end are empty.
    pub fn query_tasks_page(&self, query: &TaskQuery, page: i64, page_size: i64) -> Result<Page<Task>> {
        let (page, page_size, offset) = page_window(page, page_size);
        self.with_conn(|conn| {
            let total = count_tasks_internal(conn, query)?;
            let tasks = query_tasks_internal(conn, query, Some(page_size), offset)?;
            Ok(Page::new(tasks, page, page_size, total))
        })
    }

    /// Tasks assigned to a worker, latest deadline first, optionally narrowed
    /// by a task type name fragment.
    ///
    /// An unknown worker is `NotFound`; a known worker with no tasks gets an
    /// empty list.
    pub fn list_tasks_for_worker(
        &self,
        worker_id: i64,
        task_type_name: Option<&str>,
    ) -> Result<Vec<Task>> {
        let query = TaskQuery::assigned_to(worker_id).with_task_type_name(task_type_name);
        self.with_conn(|conn| {
            if !worker_exists(conn, worker_id)? {
                return Err(Error::not_found("worker", worker_id));
            }
            query_tasks_internal(conn, &query, None, 0)
        })
    }

    /// Earliest-deadline tasks for the dashboard.
    pub fn list_recent_tasks(&self, limit: i64) -> Result<Vec<Task>> {
        let query = TaskQuery::default().with_order(TaskOrder::DeadlineAsc);
        self.with_conn(|conn| query_tasks_internal(conn, &query, Some(limit.max(0)), 0))
    }

    /// Open tasks, latest deadline first, one page at a time.
    pub fn list_incomplete_tasks(&self, page: i64, page_size: i64) -> Result<Page<Task>> {
        self.query_tasks_page(&TaskQuery::default().with_completed(false), page, page_size)
    }
}
