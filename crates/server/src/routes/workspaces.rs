// crates/server/src/routes/workspaces.rs
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use turnlog_search::{WorkspaceSort, WorkspaceSummary};

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListWorkspacesQuery {
    #[serde(default)]
    pub sort: Option<WorkspaceSort>,
}

pub async fn list_workspaces(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListWorkspacesQuery>,
) -> Result<Json<Vec<WorkspaceSummary>>, AppError> {
    let sort = params.sort.unwrap_or(WorkspaceSort::LastSeen);
    let rows = turnlog_search::facade::list_workspaces(&state.db, sort).await?;
    Ok(Json(rows))
}
