//! Task type and position routes.

use super::{ApiError, AppState, CurrentWorker, ReferenceReader};
use crate::forms::NameForm;
use crate::services::task_types::{self, TaskTypeDetail};
use crate::services::positions;
use crate::types::{Position, TaskType};
use axum::{
    Json,
    extract::{Form, Path, State},
    response::Redirect,
};

pub(super) async fn list_task_types(
    State(state): State<AppState>,
    ReferenceReader(_reader): ReferenceReader,
) -> Result<Json<Vec<TaskType>>, ApiError> {
    Ok(Json(task_types::list(&state.db)?))
}

pub(super) async fn task_type_detail(
    State(state): State<AppState>,
    ReferenceReader(_reader): ReferenceReader,
    Path(id): Path<i64>,
) -> Result<Json<TaskTypeDetail>, ApiError> {
    Ok(Json(task_types::detail(&state.db, id)?))
}

pub(super) async fn create_task_type(
    State(state): State<AppState>,
    CurrentWorker(actor): CurrentWorker,
    Form(form): Form<NameForm>,
) -> Result<Redirect, ApiError> {
    task_types::create(&state.db, &actor, &form)?;
    Ok(Redirect::to("/tasktypes/"))
}

pub(super) async fn update_task_type(
    State(state): State<AppState>,
    CurrentWorker(actor): CurrentWorker,
    Path(id): Path<i64>,
    Form(form): Form<NameForm>,
) -> Result<Redirect, ApiError> {
    task_types::update(&state.db, &actor, id, &form)?;
    Ok(Redirect::to("/tasktypes/"))
}

pub(super) async fn delete_task_type(
    State(state): State<AppState>,
    CurrentWorker(actor): CurrentWorker,
    Path(id): Path<i64>,
) -> Result<Redirect, ApiError> {
    task_types::delete(&state.db, &actor, id)?;
    Ok(Redirect::to("/tasktypes/"))
}

pub(super) async fn list_positions(
    State(state): State<AppState>,
    CurrentWorker(_viewer): CurrentWorker,
) -> Result<Json<Vec<Position>>, ApiError> {
    Ok(Json(positions::list(&state.db)?))
}

pub(super) async fn create_position(
    State(state): State<AppState>,
    CurrentWorker(actor): CurrentWorker,
    Form(form): Form<NameForm>,
) -> Result<Redirect, ApiError> {
    positions::create(&state.db, &actor, &form)?;
    Ok(Redirect::to("/positions/"))
}

pub(super) async fn update_position(
    State(state): State<AppState>,
    CurrentWorker(actor): CurrentWorker,
    Path(id): Path<i64>,
    Form(form): Form<NameForm>,
) -> Result<Redirect, ApiError> {
    positions::update(&state.db, &actor, id, &form)?;
    Ok(Redirect::to("/positions/"))
}

pub(super) async fn delete_position(
    State(state): State<AppState>,
    CurrentWorker(actor): CurrentWorker,
    Path(id): Path<i64>,
) -> Result<Redirect, ApiError> {
    positions::delete(&state.db, &actor, id)?;
    Ok(Redirect::to("/positions/"))
}
