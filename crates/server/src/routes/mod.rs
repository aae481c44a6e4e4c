// crates/server/src/routes/mod.rs
//! One handler per §6 operation. No business logic lives here — each
//! handler parses its inputs, calls straight into `turnlog_db`/`turnlog_search`,
//! and maps the result onto JSON or `AppError`.

mod matches;
mod raw;
mod reindex;
mod resolve;
mod search;
mod session_tree;
mod workspaces;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/sessions", get(session_tree::list_session_tree))
        .route("/api/sessions/raw/{*path}", get(raw::get_session_raw))
        .route("/api/sessions/resolve", get(resolve::resolve_session))
        .route("/api/session-matches", get(matches::session_matches))
        .route("/api/search", get(search::search))
        .route("/api/workspaces", get(workspaces::list_workspaces))
        .route("/api/reindex", post(reindex::reindex))
        .route("/api/reindex/reset", post(reindex::reset_and_reindex))
        .with_state(state)
}
