// crates/server/src/routes/raw.rs
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};

use crate::error::AppError;
use crate::state::AppState;

/// `get_session_raw` (§6): validates the root-relative path, then streams
/// the file's raw bytes back unmodified.
pub async fn get_session_raw(State(state): State<Arc<AppState>>, Path(path): Path<String>) -> Result<Response, AppError> {
    let resolved = turnlog_core::paths::validate_session_path(&state.sessions_root, &path)?;
    let bytes = tokio::fs::read(&resolved).await?;
    Ok(([(header::CONTENT_TYPE, "application/x-ndjson")], bytes).into_response())
}
