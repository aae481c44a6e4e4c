// crates/server/src/tree.rs
//! Presentation-layer shaping for `list_session_tree` (§6 "Session tree
//! shape"): a year -> month -> day -> leaf nesting keyed by the first three
//! path segments of each session path. The core owes only the leaf
//! ordering; bucket key ordering is incidental and uses `BTreeMap` purely
//! for deterministic JSON output.

use std::collections::BTreeMap;

use turnlog_core::types::SessionSummary;
use turnlog_db::SessionRow;

/// Converts a stored session row into the `SessionSummary` shape the core
/// exposes across its operation boundary (§6). Lives here rather than as a
/// `From` impl because both `SessionRow` and `SessionSummary` are foreign to
/// this crate.
fn session_summary(row: &SessionRow) -> SessionSummary {
    SessionSummary {
        path: row.path.clone(),
        session_id: row.session_id.clone(),
        cwd: row.cwd.clone(),
        git_branch: row.git_branch.clone(),
        started_at: row.started_at,
        preview: row.preview.clone(),
        turn_count: row.turn_count,
        message_count: row.message_count,
        active_duration_ms: row.active_duration_ms,
    }
}

pub type DayBucket = Vec<SessionSummary>;
pub type MonthBucket = BTreeMap<String, DayBucket>;
pub type YearBucket = BTreeMap<String, MonthBucket>;
pub type SessionTree = BTreeMap<String, YearBucket>;

/// Builds the nested tree from session rows already ordered by
/// `started_at DESC, path DESC` (the order `list_sessions` returns).
/// That ordering is preserved within each day bucket since leaves are
/// pushed in the order they arrive.
pub fn build_session_tree(rows: Vec<SessionRow>) -> SessionTree {
    let mut tree: SessionTree = BTreeMap::new();
    for row in rows {
        let mut segments = row.path.splitn(4, '/');
        let year = segments.next().unwrap_or("unknown").to_string();
        let month = segments.next().unwrap_or("unknown").to_string();
        let day = segments.next().unwrap_or("unknown").to_string();
        let leaf = session_summary(&row);
        tree.entry(year).or_default().entry(month).or_default().entry(day).or_default().push(leaf);
    }
    tree
}
