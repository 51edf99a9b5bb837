//! Mapping of domain errors onto HTTP responses.

use crate::config::DEFAULT_LOGIN_URL;
use crate::error::{Error, ErrorBody};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tracing::error;

/// Handler error. Wraps [`Error`] so `?` works in handlers.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::PermissionDenied(_) => StatusCode::FORBIDDEN,
            Error::Unauthenticated => StatusCode::SEE_OTHER,
            Error::Conflict(_) => StatusCode::CONFLICT,
            Error::Storage(_) | Error::Migration(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // the extractors redirect with the configured URL and `next`;
        // this only covers errors raised outside them
        if matches!(self.0, Error::Unauthenticated) {
            return Redirect::to(DEFAULT_LOGIN_URL).into_response();
        }
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }
        (status, Json(ErrorBody::from(&self.0))).into_response()
    }
}
