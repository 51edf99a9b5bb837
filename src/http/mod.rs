//! HTTP surface.
//!
//! GET endpoints answer with JSON, successful form posts answer with a
//! `303 See Other` to the relevant listing. Identity comes from a header set
//! by the front proxy; see [`auth`].

pub mod auth;
pub mod error;
mod reference;
mod tasks;
mod workers;

use crate::config::Config;
use crate::db::Database;
use crate::services;
use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use auth::{CurrentWorker, ReferenceReader};
pub use error::ApiError;

/// State shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: Database, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }
}

/// `?page=` as submitted. Anything that is not a number means page 1.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct PageParams {
    page: Option<String>,
}

impl PageParams {
    pub(crate) fn number(&self) -> i64 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(1)
    }
}

/// Health check response.
#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Dashboard: nearest deadlines, first task types, busiest workers. Public.
async fn index(State(state): State<AppState>) -> Result<Json<services::Dashboard>, ApiError> {
    let dashboard = services::dashboard(&state.db, state.config.listing.dashboard_limit)?;
    Ok(Json(dashboard))
}

/// Build the router with all routes.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        // Tasks
        .route("/tasks/", get(tasks::list_mine))
        .route("/tasks/incomplete/", get(tasks::list_incomplete))
        .route("/tasks/create/", post(tasks::create))
        .route(
            "/tasks/{task_id}/",
            get(tasks::detail).post(tasks::mark_complete),
        )
        .route("/tasks/{task_id}/update/", post(tasks::update))
        .route("/tasks/{task_id}/delete/", post(tasks::delete))
        .route("/admin/tasks/", get(tasks::search))
        // Workers
        .route("/workers/", get(workers::list))
        .route("/workers/create/", post(workers::create))
        .route("/workers/{worker_id}/", get(workers::detail))
        .route("/workers/{worker_id}/update/", post(workers::update))
        .route("/workers/{worker_id}/delete/", post(workers::delete))
        // Reference data
        .route("/tasktypes/", get(reference::list_task_types))
        .route("/tasktypes/create/", post(reference::create_task_type))
        .route("/tasktypes/{id}/", get(reference::task_type_detail))
        .route("/tasktypes/{id}/update/", post(reference::update_task_type))
        .route("/tasktypes/{id}/delete/", post(reference::delete_task_type))
        .route("/positions/", get(reference::list_positions))
        .route("/positions/create/", post(reference::create_position))
        .route("/positions/{id}/update/", post(reference::update_position))
        .route("/positions/{id}/delete/", post(reference::delete_position))
        .route("/api/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server on `addr`.
///
/// Returns a oneshot sender that stops the server gracefully, and the
/// address actually bound (useful with port 0).
pub async fn start_server(
    state: AppState,
    addr: SocketAddr,
) -> anyhow::Result<(oneshot::Sender<()>, SocketAddr)> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    info!("Task manager listening on http://{}", bound_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("Task manager shutting down");
            })
            .await
        {
            tracing::error!("HTTP server error: {}", e);
        }
    });

    Ok((shutdown_tx, bound_addr))
}
