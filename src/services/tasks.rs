//! Task lifecycle: listings, create, update, completion and delete.

use crate::access;
use crate::db::{today, Database, TaskQuery};
use crate::error::{Error, Result};
use crate::forms::{FormMode, TaskForm};
use crate::types::{Page, Task, Worker};
use tracing::{debug, info, warn};

/// Tasks assigned to `worker_id`, latest deadline first.
pub fn list_for_worker(
    db: &Database,
    worker_id: i64,
    task_type_name: Option<&str>,
) -> Result<Vec<Task>> {
    let tasks = db.list_tasks_for_worker(worker_id, task_type_name)?;
    debug!(
        worker_id,
        filter = task_type_name.unwrap_or(""),
        count = tasks.len(),
        "Listed worker tasks"
    );
    Ok(tasks)
}

pub fn list_recent(db: &Database, limit: i64) -> Result<Vec<Task>> {
    db.list_recent_tasks(limit)
}

pub fn list_incomplete(db: &Database, page: i64, page_size: i64) -> Result<Page<Task>> {
    db.list_incomplete_tasks(page, page_size)
}

/// Staff-only filtered listing across all tasks.
pub fn search(
    db: &Database,
    actor: &Worker,
    query: &TaskQuery,
    page: i64,
    page_size: i64,
) -> Result<Page<Task>> {
    if !access::can_search_tasks(actor) {
        warn!(actor = actor.id, "Task search denied");
        return Err(Error::permission_denied(
            "Only staff members can search all tasks.",
        ));
    }
    let found = db.query_tasks_page(query, page, page_size)?;
    debug!(actor = actor.id, total = found.total, page = found.page, "Searched tasks");
    Ok(found)
}

pub fn get(db: &Database, task_id: i64) -> Result<Task> {
    db.get_task(task_id)?
        .ok_or_else(|| Error::not_found("task", task_id))
}

/// Create a task owned by `creator`. Any creator in the form is ignored.
pub fn create(db: &Database, creator: &Worker, form: &TaskForm) -> Result<Task> {
    let (changes, errors) = form.clean(FormMode::Create, today());
    let task = db
        .create_task(&changes, errors, creator.id)
        .inspect_err(|e| warn!(actor = creator.id, error = %e, "Task create rejected"))?;
    info!(
        task_id = task.id,
        actor = creator.id,
        assignees = task.assignees.len(),
        "Created task"
    );
    Ok(task)
}

/// Apply the supplied fields. Creator and completion stay as they are.
pub fn update(db: &Database, actor: &Worker, task_id: i64, form: &TaskForm) -> Result<Task> {
    let (changes, errors) = form.clean(FormMode::Update, today());
    let task = db
        .update_task(task_id, &changes, errors)
        .inspect_err(|e| warn!(task_id, actor = actor.id, error = %e, "Task update rejected"))?;
    info!(task_id, actor = actor.id, "Updated task");
    Ok(task)
}

/// Mark a task complete. Only assignees may do this; repeating it is harmless.
pub fn mark_complete(db: &Database, actor: &Worker, task_id: i64) -> Result<Task> {
    let task = get(db, task_id)?;
    if !access::can_complete_task(actor, &task) {
        warn!(task_id, actor = actor.id, "Task completion denied");
        return Err(Error::permission_denied(
            "You don't have permission to complete this task.",
        ));
    }

    // the assignment is re-checked inside the write transaction
    let task = db.complete_task(task_id, actor.id)?;
    info!(task_id, actor = actor.id, "Completed task");
    Ok(task)
}

pub fn delete(db: &Database, actor: &Worker, task_id: i64) -> Result<()> {
    db.delete_task(task_id)?;
    info!(task_id, actor = actor.id, "Deleted task");
    Ok(())
}
