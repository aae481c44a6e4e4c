// crates/server/src/routes/session_tree.rs
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::error::AppError;
use crate::state::AppState;
use crate::tree::{build_session_tree, SessionTree};

#[derive(Debug, Deserialize)]
pub struct ListSessionTreeQuery {
    pub workspace: Option<String>,
}

pub async fn list_session_tree(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListSessionTreeQuery>,
) -> Result<Json<SessionTree>, AppError> {
    let rows = state.db.list_sessions(params.workspace.as_deref()).await?;
    Ok(Json(build_session_tree(rows)))
}
