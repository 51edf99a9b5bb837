//! Worker routes.

use super::{ApiError, AppState, CurrentWorker, PageParams};
use crate::forms::WorkerForm;
use crate::services::workers::{self, WorkerDetail};
use crate::types::{Page, Worker};
use axum::{
    Json,
    extract::{Form, Path, Query, State},
    response::Redirect,
};

pub(super) async fn list(
    State(state): State<AppState>,
    CurrentWorker(_viewer): CurrentWorker,
    Query(params): Query<PageParams>,
) -> Result<Json<Page<Worker>>, ApiError> {
    let page = workers::list(
        &state.db,
        params.number(),
        state.config.listing.workers_page_size,
    )?;
    Ok(Json(page))
}

pub(super) async fn create(
    State(state): State<AppState>,
    CurrentWorker(actor): CurrentWorker,
    Form(form): Form<WorkerForm>,
) -> Result<Redirect, ApiError> {
    workers::create(&state.db, &actor, &form)?;
    Ok(Redirect::to("/workers/"))
}

pub(super) async fn detail(
    State(state): State<AppState>,
    CurrentWorker(viewer): CurrentWorker,
    Path(worker_id): Path<i64>,
) -> Result<Json<WorkerDetail>, ApiError> {
    Ok(Json(workers::detail(&state.db, &viewer, worker_id)?))
}

pub(super) async fn update(
    State(state): State<AppState>,
    CurrentWorker(actor): CurrentWorker,
    Path(worker_id): Path<i64>,
    Form(form): Form<WorkerForm>,
) -> Result<Redirect, ApiError> {
    workers::update(&state.db, &actor, worker_id, &form)?;
    Ok(Redirect::to("/workers/"))
}

pub(super) async fn delete(
    State(state): State<AppState>,
    CurrentWorker(actor): CurrentWorker,
    Path(worker_id): Path<i64>,
) -> Result<Redirect, ApiError> {
    workers::delete(&state.db, &actor, worker_id)?;
    Ok(Redirect::to("/workers/"))
}
