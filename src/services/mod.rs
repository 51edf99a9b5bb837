//! Service layer.
//!
//! One module per entity. Every operation takes the acting worker
//! explicitly, checks [`crate::access`] before touching storage and logs
//! the outcome.

pub mod positions;
pub mod task_types;
pub mod tasks;
pub mod workers;

use crate::db::Database;
use crate::error::Result;
use crate::types::{RankedWorker, Task, TaskType};
use serde::Serialize;
use tracing::debug;

/// Home page summary.
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    /// Tasks with the nearest deadlines.
    pub tasks: Vec<Task>,
    pub task_types: Vec<TaskType>,
    /// Workers with the most assigned tasks.
    pub workers: Vec<RankedWorker>,
}

pub fn dashboard(db: &Database, limit: i64) -> Result<Dashboard> {
    let tasks = tasks::list_recent(db, limit)?;
    let task_types = db.list_task_types(Some(limit))?;
    let workers = workers::team_ranking(db, limit)?;
    debug!(
        tasks = tasks.len(),
        task_types = task_types.len(),
        workers = workers.len(),
        "Built dashboard"
    );
    Ok(Dashboard {
        tasks,
        task_types,
        workers,
    })
}
