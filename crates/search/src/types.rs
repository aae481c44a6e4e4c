// crates/search/src/types.rs
//! Request/response shapes for the search facade (C4 — §4.4, §6).

use serde::{Deserialize, Serialize};

/// How cross-session results are ordered (§4.4.2 step 5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultSort {
    Relevance,
    Matches,
    Recent,
}

impl Default for ResultSort {
    fn default() -> Self {
        ResultSort::Relevance
    }
}

/// How workspace groups are ordered (§4.4.2 "Grouping").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupSort {
    LastSeen,
    Matches,
}

impl Default for GroupSort {
    fn default() -> Self {
        GroupSort::LastSeen
    }
}

/// Input to [`crate::facade::search`].
#[derive(Debug, Clone)]
pub struct SearchInput<'a> {
    pub query: &'a str,
    pub workspace: Option<&'a str>,
    pub limit: u32,
    pub result_sort: ResultSort,
    pub group_sort: GroupSort,
    pub request_id: Option<String>,
}

/// One session's aggregated match row (§4.4.2 steps 3-4), before grouping.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SessionResult {
    pub path: String,
    pub session_id: Option<String>,
    pub cwd: Option<String>,
    pub started_at: Option<i64>,
    pub preview: Option<String>,
    pub match_message_count: i64,
    pub match_turn_count: i64,
    pub first_match_turn_id: Option<i64>,
    pub snippet: Option<String>,
    pub best_score: f64,
}

/// A caller-facing workspace bucket of session results (§4.4.2 "Grouping").
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceGroup {
    /// The raw `cwd`, or `None` for the synthetic "Unknown workspace" bin.
    pub cwd: Option<String>,
    pub label: String,
    pub match_count: i64,
    pub last_seen: Option<i64>,
    pub session_count: i64,
    pub sessions: Vec<SessionResult>,
}

/// Output of [`crate::facade::search`] (§6 `search`).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub groups: Vec<WorkspaceGroup>,
    pub tokens: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Output of [`crate::facade::session_matches`] (§6 `session_matches`).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMatches {
    pub session: String,
    pub tokens: Vec<String>,
    pub turn_ids: Vec<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// One entry of `list_workspaces` (§6).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSummary {
    pub cwd: String,
    pub session_count: i64,
    pub last_seen: Option<i64>,
}

/// Sort order for `list_workspaces` (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceSort {
    LastSeen,
    SessionCount,
}
