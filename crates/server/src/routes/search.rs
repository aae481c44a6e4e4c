// crates/server/src/routes/search.rs
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use turnlog_search::{GroupSort, ResultSort, SearchInput, SearchResponse};

use crate::error::AppError;
use crate::state::AppState;

const DEFAULT_LIMIT: u32 = 50;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
    pub limit: Option<u32>,
    pub workspace: Option<String>,
    #[serde(default)]
    pub result_sort: Option<ResultSort>,
    #[serde(default)]
    pub group_sort: Option<GroupSort>,
    pub request_id: Option<String>,
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    let query = params.query.as_deref().unwrap_or("").trim();
    if query.is_empty() {
        return Err(AppError::InvalidQuery("query must not be empty".to_string()));
    }

    let input = SearchInput {
        query,
        workspace: params.workspace.as_deref(),
        limit: params.limit.unwrap_or(DEFAULT_LIMIT),
        result_sort: params.result_sort.unwrap_or_default(),
        group_sort: params.group_sort.unwrap_or_default(),
        request_id: params.request_id,
    };

    let response = turnlog_search::facade::search(&state.db, input).await?;
    Ok(Json(response))
}
