//! Task routes.

use super::{ApiError, AppState, CurrentWorker, PageParams};
use crate::access;
use crate::db::TaskQuery;
use crate::error::{Error, FieldErrors};
use crate::forms::{INVALID_CHOICE, TaskForm};
use crate::services::tasks;
use crate::types::{Page, Priority, Task};
use axum::{
    Json,
    extract::{Form, Path, Query, State},
    response::Redirect,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub(super) struct ListParams {
    task_type_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct TaskList {
    tasks: Vec<Task>,
    task_type_name: String,
}

/// Tasks assigned to the current worker.
pub(super) async fn list_mine(
    State(state): State<AppState>,
    CurrentWorker(worker): CurrentWorker,
    Query(params): Query<ListParams>,
) -> Result<Json<TaskList>, ApiError> {
    let filter = params.task_type_name.unwrap_or_default();
    let tasks = tasks::list_for_worker(&state.db, worker.id, Some(filter.as_str()))?;
    Ok(Json(TaskList {
        tasks,
        task_type_name: filter,
    }))
}

pub(super) async fn list_incomplete(
    State(state): State<AppState>,
    CurrentWorker(_worker): CurrentWorker,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<Task>>, ApiError> {
    let page = tasks::list_incomplete(
        &state.db,
        params.number(),
        state.config.listing.tasks_page_size,
    )?;
    Ok(Json(page))
}

pub(super) async fn create(
    State(state): State<AppState>,
    CurrentWorker(worker): CurrentWorker,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Redirect, ApiError> {
    let form = TaskForm::from_pairs(pairs);
    tasks::create(&state.db, &worker, &form)?;
    Ok(Redirect::to("/tasks/"))
}

#[derive(Debug, Serialize)]
pub(super) struct TaskDetail {
    task: Task,
    can_complete: bool,
    is_overdue: bool,
}

pub(super) async fn detail(
    State(state): State<AppState>,
    CurrentWorker(worker): CurrentWorker,
    Path(task_id): Path<i64>,
) -> Result<Json<TaskDetail>, ApiError> {
    let task = tasks::get(&state.db, task_id)?;
    Ok(Json(TaskDetail {
        can_complete: access::can_complete_task(&worker, &task),
        is_overdue: task.is_overdue(crate::db::today()),
        task,
    }))
}

/// POST on the detail page marks the task complete.
pub(super) async fn mark_complete(
    State(state): State<AppState>,
    CurrentWorker(worker): CurrentWorker,
    Path(task_id): Path<i64>,
) -> Result<Redirect, ApiError> {
    tasks::mark_complete(&state.db, &worker, task_id)?;
    Ok(Redirect::to(&format!("/tasks/{}/", task_id)))
}

pub(super) async fn update(
    State(state): State<AppState>,
    CurrentWorker(worker): CurrentWorker,
    Path(task_id): Path<i64>,
    Form(pairs): Form<Vec<(String, String)>>,
) -> Result<Redirect, ApiError> {
    let form = TaskForm::from_pairs(pairs);
    tasks::update(&state.db, &worker, task_id, &form)?;
    Ok(Redirect::to("/tasks/"))
}

pub(super) async fn delete(
    State(state): State<AppState>,
    CurrentWorker(worker): CurrentWorker,
    Path(task_id): Path<i64>,
) -> Result<Redirect, ApiError> {
    tasks::delete(&state.db, &worker, task_id)?;
    Ok(Redirect::to("/tasks/"))
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct SearchParams {
    q: Option<String>,
    priority: Option<String>,
    is_completed: Option<String>,
    task_type: Option<String>,
    page: Option<String>,
}

impl SearchParams {
    /// Turn the query string into a [`TaskQuery`]; blank values do not filter.
    fn to_query(&self) -> Result<TaskQuery, Error> {
        let mut errors = FieldErrors::new();
        let mut query = TaskQuery {
            search: self.q.clone(),
            ..Default::default()
        };

        if let Some(raw) = blank_to_none(&self.priority) {
            match raw.parse::<Priority>() {
                Ok(p) => query.priority = Some(p),
                Err(_) => errors.add("priority", INVALID_CHOICE),
            }
        }
        if let Some(raw) = blank_to_none(&self.is_completed) {
            match raw.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => query.is_completed = Some(true),
                "0" | "false" | "no" => query.is_completed = Some(false),
                _ => errors.add("is_completed", INVALID_CHOICE),
            }
        }
        if let Some(raw) = blank_to_none(&self.task_type) {
            match raw.parse::<i64>() {
                Ok(id) => query.task_type_id = Some(id),
                Err(_) => errors.add("task_type", INVALID_CHOICE),
            }
        }

        errors.into_result()?;
        Ok(query)
    }

    fn page(&self) -> i64 {
        PageParams {
            page: self.page.clone(),
        }
        .number()
    }
}

fn blank_to_none(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Staff task search.
pub(super) async fn search(
    State(state): State<AppState>,
    CurrentWorker(worker): CurrentWorker,
    Query(params): Query<SearchParams>,
) -> Result<Json<Page<Task>>, ApiError> {
    let query = params.to_query()?;
    let page = tasks::search(
        &state.db,
        &worker,
        &query,
        params.page(),
        state.config.listing.tasks_page_size,
    )?;
    Ok(Json(page))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_search_params_do_not_filter() {
        let params = SearchParams {
            priority: Some(" ".into()),
            is_completed: Some(String::new()),
            ..Default::default()
        };
        let query = params.to_query().unwrap();
        assert!(query.priority.is_none());
        assert!(query.is_completed.is_none());
        assert_eq!(params.page(), 1);
    }

    #[test]
    fn search_params_parse() {
        let params = SearchParams {
            q: Some("bug".into()),
            priority: Some("High".into()),
            is_completed: Some("false".into()),
            task_type: Some("2".into()),
            page: Some("2".into()),
        };
        let query = params.to_query().unwrap();
        assert_eq!(query.priority, Some(Priority::High));
        assert_eq!(query.is_completed, Some(false));
        assert_eq!(query.task_type_id, Some(2));
        assert_eq!(query.search.as_deref(), Some("bug"));
        assert_eq!(params.page(), 2);
    }

    #[test]
    fn bad_search_params_are_field_errors() {
        let params = SearchParams {
            priority: Some("critical".into()),
            task_type: Some("bug".into()),
            ..Default::default()
        };
        let err = params.to_query().unwrap_err();
        let fields = err.field_errors().unwrap();
        assert!(fields.contains("priority"));
        assert!(fields.contains("task_type"));
    }
}
