//! Request identity.
//!
//! The front proxy owns authentication and passes the username in a header
//! (`access.identity_header`). A request without a known username is sent
//! to `access.login_url` with `?next=` pointing back at the requested path.

use super::{ApiError, AppState};
use crate::error::Error;
use crate::types::Worker;
use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

/// The logged-in worker. Rejects with a redirect to the login page.
#[derive(Debug, Clone)]
pub struct CurrentWorker(pub Worker);

/// Reader of task type data. Holds `None` for anonymous callers when
/// `access.public_task_type_reads` is on; otherwise behaves like
/// [`CurrentWorker`].
#[derive(Debug, Clone)]
pub struct ReferenceReader(pub Option<Worker>);

/// Look up the worker named by the identity header.
fn identify(parts: &Parts, state: &AppState) -> Result<Option<Worker>, Error> {
    let header = state.config.access.identity_header.as_str();
    let Some(username) = parts
        .headers
        .get(header)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|u| !u.is_empty())
    else {
        return Ok(None);
    };

    let worker = state.db.find_worker_by_username(username)?;
    if worker.is_none() {
        debug!(username, "Identity header names an unknown worker");
    }
    Ok(worker)
}

/// Turn an extractor failure into a response. A missing identity goes to
/// the configured login page.
fn reject(err: Error, parts: &Parts, state: &AppState) -> Response {
    match err {
        Error::Unauthenticated => login_redirect(&state.config.access.login_url, parts),
        other => ApiError(other).into_response(),
    }
}

/// Redirect to the login page, remembering where the caller was going.
pub fn login_redirect(login_url: &str, parts: &Parts) -> Response {
    let next = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let separator = if login_url.contains('?') { '&' } else { '?' };
    let target = format!(
        "{}{}next={}",
        login_url,
        separator,
        urlencoding::encode(next)
    );
    Redirect::to(&target).into_response()
}

impl FromRequestParts<AppState> for CurrentWorker {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let parts: &Parts = parts;
        identify(parts, state)
            .and_then(|worker| worker.ok_or(Error::Unauthenticated))
            .map(CurrentWorker)
            .map_err(|e| reject(e, parts, state))
    }
}

impl FromRequestParts<AppState> for ReferenceReader {
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let parts: &Parts = parts;
        let worker = identify(parts, state).map_err(|e| reject(e, parts, state))?;
        if worker.is_none() && !state.config.access.public_task_type_reads {
            return Err(reject(Error::Unauthenticated, parts, state));
        }
        Ok(ReferenceReader(worker))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode, header::LOCATION};

    fn parts_for(uri: &str) -> Parts {
        let (parts, _) = Request::builder().uri(uri).body(()).unwrap().into_parts();
        parts
    }

    #[test]
    fn login_redirect_carries_next() {
        let response = login_redirect("/accounts/login/", &parts_for("/tasks/1/?x=1"));
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[LOCATION],
            "/accounts/login/?next=%2Ftasks%2F1%2F%3Fx%3D1"
        );
    }

    #[test]
    fn unauthenticated_uses_configured_login_page() {
        let mut config = crate::config::Config::default();
        config.access.login_url = "/sso/".into();
        let db = crate::db::Database::open_in_memory().unwrap();
        let state = AppState::new(db, config);

        let response = reject(Error::Unauthenticated, &parts_for("/workers/"), &state);
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], "/sso/?next=%2Fworkers%2F");

        let response = reject(Error::not_found("worker", 3), &parts_for("/workers/"), &state);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn login_redirect_appends_to_existing_query() {
        let response = login_redirect("/login?sso=1", &parts_for("/workers/"));
        assert_eq!(response.headers()[LOCATION], "/login?sso=1&next=%2Fworkers%2F");
    }
}
