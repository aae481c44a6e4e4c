// crates/server/src/state.rs
//! Shared state handed to every route handler: the store and the
//! configured sessions root, needed by `get_session_raw`'s path validation.

use std::path::PathBuf;

use turnlog_db::Database;

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub sessions_root: PathBuf,
}
