// crates/server/src/routes/matches.rs
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use turnlog_search::SessionMatches;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SessionMatchesQuery {
    pub session: Option<String>,
    pub query: Option<String>,
    pub request_id: Option<String>,
}

pub async fn session_matches(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SessionMatchesQuery>,
) -> Result<Json<SessionMatches>, AppError> {
    let session = params.session.as_deref().unwrap_or("").trim();
    if session.is_empty() {
        return Err(AppError::InvalidQuery("session must not be empty".to_string()));
    }
    let query = params.query.as_deref().unwrap_or("");

    let mut matches = turnlog_search::facade::session_matches(&state.db, session, query).await?;
    matches.request_id = params.request_id;
    Ok(Json(matches))
}
