//! Task type reference data.

use crate::db::{Database, TaskQuery};
use crate::error::{Error, Result};
use crate::forms::NameForm;
use crate::types::{Task, TaskType, Worker};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct TaskTypeDetail {
    pub task_type: TaskType,
    pub tasks: Vec<Task>,
}

pub fn list(db: &Database) -> Result<Vec<TaskType>> {
    db.list_task_types(None)
}

pub fn get(db: &Database, id: i64) -> Result<TaskType> {
    db.get_task_type(id)?
        .ok_or_else(|| Error::not_found("task type", id))
}

/// The task type with every task of that type.
pub fn detail(db: &Database, id: i64) -> Result<TaskTypeDetail> {
    let task_type = get(db, id)?;
    let query = TaskQuery {
        task_type_id: Some(id),
        ..Default::default()
    };
    let tasks = db.query_tasks(&query)?;
    Ok(TaskTypeDetail { task_type, tasks })
}

pub fn create(db: &Database, actor: &Worker, form: &NameForm) -> Result<TaskType> {
    let name = form.clean().map_err(Error::Validation)?;
    let task_type = db.create_task_type(&name)?;
    info!(task_type_id = task_type.id, actor = actor.id, name = %task_type.name, "Created task type");
    Ok(task_type)
}

pub fn update(db: &Database, actor: &Worker, id: i64, form: &NameForm) -> Result<TaskType> {
    let name = form.clean().map_err(Error::Validation)?;
    let task_type = db.rename_task_type(id, &name)?;
    info!(task_type_id = id, actor = actor.id, "Renamed task type");
    Ok(task_type)
}

/// Delete a task type. Fails with `Conflict` while tasks still use it.
pub fn delete(db: &Database, actor: &Worker, id: i64) -> Result<()> {
    db.delete_task_type(id)
        .inspect_err(|e| warn!(task_type_id = id, actor = actor.id, error = %e, "Task type delete rejected"))?;
    info!(task_type_id = id, actor = actor.id, "Deleted task type");
    Ok(())
}
