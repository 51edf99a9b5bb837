//! Structured error types shared by storage, services and the HTTP layer.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Input errors
    ValidationError,

    // Lookup / access errors
    NotFound,
    PermissionDenied,
    Unauthenticated,

    // Conflict errors
    Conflict,

    // Internal errors
    DatabaseError,
    InternalError,
}

/// Per-field validation messages, keyed by form field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// A map holding a single message.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Field names in sorted order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `Ok(())` when empty, otherwise a validation error carrying every message.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(self))
        }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Crate-wide error.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    Validation(FieldErrors),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    #[error("{0}")]
    PermissionDenied(String),

    #[error("authentication required")]
    Unauthenticated,

    #[error("{0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("migration error: {0}")]
    Migration(#[from] refinery::Error),

    #[error("{0}")]
    Internal(String),
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::Validation(_) => ErrorCode::ValidationError,
            Error::NotFound { .. } => ErrorCode::NotFound,
            Error::PermissionDenied(_) => ErrorCode::PermissionDenied,
            Error::Unauthenticated => ErrorCode::Unauthenticated,
            Error::Conflict(_) => ErrorCode::Conflict,
            Error::Storage(_) | Error::Migration(_) => ErrorCode::DatabaseError,
            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    // Convenience constructors

    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        Error::Validation(FieldErrors::single(field, message))
    }

    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Error::NotFound { entity, id }
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Error::PermissionDenied(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Error::Conflict(message.into())
    }

    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Error::Validation(fields) => Some(fields),
            _ => None,
        }
    }
}

/// Serialized error body returned to clients.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
}

impl From<&Error> for ErrorBody {
    fn from(err: &Error) -> Self {
        let message = match err {
            Error::Validation(_) => "Please correct the errors below.".to_string(),
            // Storage details stay in the logs.
            Error::Storage(_) | Error::Migration(_) => "Internal database error".to_string(),
            other => other.to_string(),
        };
        Self {
            code: err.code(),
            message,
            fields: err.field_errors().cloned(),
        }
    }
}

/// Result type for crate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Extract `(table, column)` from a SQLite UNIQUE constraint failure.
///
/// SQLite reports these as `UNIQUE constraint failed: tasks.name`.
pub(crate) fn unique_violation(err: &rusqlite::Error) -> Option<(&str, &str)> {
    match err {
        rusqlite::Error::SqliteFailure(e, Some(msg))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            let target = msg.strip_prefix("UNIQUE constraint failed: ")?;
            // Composite keys list several columns; the first one is enough here.
            let first = target.split(',').next()?.trim();
            first.split_once('.')
        }
        _ => None,
    }
}
