// crates/server/src/error.rs
//! The seven-kind error taxonomy (§7) as the one type serialized across the
//! HTTP boundary. Every crate-local error (`ParseError`, `DbError`,
//! `IndexError`, `SearchError`) is mapped onto one of these variants here —
//! this is the *only* place that mapping happens.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use turnlog_core::paths::PathSafetyError;
use turnlog_db::indexer::IndexError;
use turnlog_db::DbError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("sessions root does not exist: {0}")]
    RootMissing(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidPath(_) | AppError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::RootMissing(_) => StatusCode::PRECONDITION_FAILED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidPath(_) => "invalid_path",
            AppError::InvalidQuery(_) => "invalid_query",
            AppError::NotFound(_) => "not_found",
            AppError::Forbidden(_) => "forbidden",
            AppError::RootMissing(_) => "root_missing",
            AppError::Internal(_) => "store_error",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::warn!(kind = self.kind(), message = %self, "request failed");
        let body = ErrorBody { error: self.kind(), message: self.to_string() };
        (self.status(), Json(body)).into_response()
    }
}

impl From<PathSafetyError> for AppError {
    fn from(e: PathSafetyError) -> Self {
        let reason = match e {
            PathSafetyError::Empty => "path must not be empty",
            PathSafetyError::ContainsNul => "path must not contain a NUL byte",
            PathSafetyError::Absolute => "path must be relative",
            PathSafetyError::ParentTraversal => "path must not contain a .. segment",
            PathSafetyError::EscapesRoot => "path resolves outside the sessions root",
        };
        AppError::InvalidPath(reason.to_string())
    }
}

impl From<DbError> for AppError {
    fn from(e: DbError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<IndexError> for AppError {
    fn from(e: IndexError) -> Self {
        match e {
            IndexError::RootMissing(path) => AppError::RootMissing(path.display().to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<turnlog_search::SearchError> for AppError {
    fn from(e: turnlog_search::SearchError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => AppError::NotFound(e.to_string()),
            std::io::ErrorKind::PermissionDenied => AppError::Forbidden(e.to_string()),
            _ => AppError::Internal(e.to_string()),
        }
    }
}
