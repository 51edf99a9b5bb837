//! Worker accounts.

use crate::access;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::forms::{FormMode, WorkerForm};
use crate::types::{Page, RankedWorker, Task, Worker};
use serde::Serialize;
use tracing::{debug, info, warn};

/// A worker together with the tasks assigned to them.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerDetail {
    pub worker: Worker,
    pub tasks: Vec<Task>,
}

pub fn list(db: &Database, page: i64, page_size: i64) -> Result<Page<Worker>> {
    let workers = db.list_workers(page, page_size)?;
    debug!(page = workers.page, total = workers.total, "Listed workers");
    Ok(workers)
}

pub fn get(db: &Database, worker_id: i64) -> Result<Worker> {
    db.get_worker(worker_id)?
        .ok_or_else(|| Error::not_found("worker", worker_id))
}

pub fn detail(db: &Database, viewer: &Worker, worker_id: i64) -> Result<WorkerDetail> {
    let worker = get(db, worker_id)?;
    if !access::can_view_worker_detail(viewer, &worker) {
        return Err(Error::permission_denied(
            "You don't have permission to view this worker.",
        ));
    }
    let tasks = db.list_tasks_for_worker(worker_id, None)?;
    Ok(WorkerDetail { worker, tasks })
}

/// Register a new non-staff worker on behalf of `actor`.
pub fn create(db: &Database, actor: &Worker, form: &WorkerForm) -> Result<Worker> {
    let worker = register(db, form, false)
        .inspect_err(|e| warn!(actor = actor.id, error = %e, "Worker create rejected"))?;
    info!(worker_id = worker.id, actor = actor.id, "Created worker");
    Ok(worker)
}

/// Create a worker without an acting user. Used to bootstrap accounts.
pub fn register(db: &Database, form: &WorkerForm, is_staff: bool) -> Result<Worker> {
    let (changes, errors) = form.clean(FormMode::Create);
    let worker = db.create_worker(&changes, is_staff, errors)?;
    info!(worker_id = worker.id, username = %worker.username, is_staff, "Registered worker");
    Ok(worker)
}

/// Update a worker. Staff may edit anyone; others only themselves.
pub fn update(db: &Database, actor: &Worker, worker_id: i64, form: &WorkerForm) -> Result<Worker> {
    let target = get(db, worker_id)?;
    if !access::can_update_worker(actor, &target) {
        warn!(worker_id, actor = actor.id, "Worker update denied");
        return Err(Error::permission_denied(
            "You don't have permission to edit this worker.",
        ));
    }

    let (changes, errors) = form.clean(FormMode::Update);
    let worker = db
        .update_worker(worker_id, &changes, errors)
        .inspect_err(|e| warn!(worker_id, actor = actor.id, error = %e, "Worker update rejected"))?;
    info!(worker_id, actor = actor.id, "Updated worker");
    Ok(worker)
}

pub fn delete(db: &Database, actor: &Worker, worker_id: i64) -> Result<()> {
    if !access::can_delete_worker(actor) {
        warn!(worker_id, actor = actor.id, "Worker delete denied");
        return Err(Error::permission_denied(
            "You don't have permission to delete this worker.",
        ));
    }
    db.delete_worker(worker_id)?;
    info!(worker_id, actor = actor.id, "Deleted worker");
    Ok(())
}

/// Workers by assigned task count, busiest first.
pub fn team_ranking(db: &Database, limit: i64) -> Result<Vec<RankedWorker>> {
    db.team_ranking(limit)
}
