// crates/server/src/routes/reindex.rs
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use turnlog_db::indexer::IndexSummary;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IndexSummaryResponse {
    scanned: usize,
    updated: usize,
    removed: usize,
    message_count: usize,
    skipped: usize,
    metadata_checked: usize,
}

impl From<IndexSummary> for IndexSummaryResponse {
    fn from(s: IndexSummary) -> Self {
        IndexSummaryResponse {
            scanned: s.scanned,
            updated: s.updated,
            removed: s.removed,
            message_count: s.message_count,
            skipped: s.skipped,
            metadata_checked: s.metadata_checked,
        }
    }
}

pub async fn reindex(State(state): State<Arc<AppState>>) -> Result<Json<IndexSummaryResponse>, AppError> {
    let summary = turnlog_db::indexer::reindex(&state.db, &state.sessions_root, |_, _| {}).await?;
    Ok(Json(summary.into()))
}

pub async fn reset_and_reindex(State(state): State<Arc<AppState>>) -> Result<Json<IndexSummaryResponse>, AppError> {
    let summary = turnlog_db::indexer::reset_and_reindex(&state.db, &state.sessions_root, |_, _| {}).await?;
    Ok(Json(summary.into()))
}
