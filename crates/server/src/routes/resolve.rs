// crates/server/src/routes/resolve.rs
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ResolveSessionQuery {
    pub id: Option<String>,
    pub workspace: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ResolveSessionResponse {
    pub id: Option<String>,
}

pub async fn resolve_session(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ResolveSessionQuery>,
) -> Result<Json<ResolveSessionResponse>, AppError> {
    let id = params.id.as_deref().unwrap_or("").trim();
    if id.is_empty() {
        return Err(AppError::InvalidQuery("id must not be empty".to_string()));
    }

    let resolved = turnlog_search::facade::resolve_session(&state.db, id, params.workspace.as_deref()).await?;
    Ok(Json(ResolveSessionResponse { id: resolved }))
}
