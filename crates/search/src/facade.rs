// crates/search/src/facade.rs
//! The search engine facade (C4 — §4.4): cross-session ranked search with
//! workspace grouping, session-id resolution, and intra-session match
//! localization. Every operation here issues one or two synchronous queries
//! against the store and returns; none of them suspends internally beyond
//! that (§5 "Suspension points").

use std::collections::HashMap;

use thiserror::Error;
use tracing::instrument;
use turnlog_db::Database;

use crate::normalize::normalize;
use crate::types::{
    GroupSort, ResultSort, SearchInput, SearchResponse, SessionMatches, SessionResult, WorkspaceGroup,
    WorkspaceSort, WorkspaceSummary,
};

const UNKNOWN_WORKSPACE_LABEL: &str = "Unknown workspace";

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("store error: {0}")]
    Db(#[from] turnlog_db::DbError),
}

pub type SearchResult<T> = Result<T, SearchError>;

fn result_sort_clause(sort: ResultSort) -> &'static str {
    match sort {
        ResultSort::Matches => "a.match_message_count DESC, a.match_turn_count DESC, s.started_at DESC, s.path ASC",
        ResultSort::Recent => "s.started_at DESC, a.best_score ASC, s.path ASC",
        ResultSort::Relevance => "a.best_score ASC, s.started_at DESC, s.path ASC",
    }
}

/// Cross-session ranked search (§4.4.2). Returns empty groups without a
/// store call when normalization yields no searchable tokens.
#[instrument(skip(db, input), fields(query = %input.query))]
pub async fn search(db: &Database, input: SearchInput<'_>) -> SearchResult<SearchResponse> {
    let normalized = normalize(input.query);
    let Some(fts_query) = normalized.fts_query.as_deref() else {
        return Ok(SearchResponse { groups: Vec::new(), tokens: Vec::new(), request_id: input.request_id });
    };

    let sql = format!(
        r#"
        WITH matches AS (
            SELECT
                m.session_path AS session_path,
                m.turn_id AS turn_id,
                bm25(messages_fts) AS score,
                snippet(messages_fts, 0, '[[', ']]', '…', 18) AS snippet
            FROM messages_fts
            JOIN messages m ON m.id = messages_fts.rowid
            JOIN sessions s ON s.path = m.session_path
            WHERE messages_fts MATCH ?1
              AND m.turn_id > 0
              AND (?2 IS NULL OR s.cwd = ?2)
        ),
        ranked AS (
            SELECT *, ROW_NUMBER() OVER (PARTITION BY session_path ORDER BY score ASC) AS rn
            FROM matches
        ),
        aggregated AS (
            SELECT
                session_path,
                COUNT(*) AS match_message_count,
                COUNT(DISTINCT turn_id) AS match_turn_count,
                COALESCE(MIN(CASE WHEN rn = 1 THEN turn_id END), MIN(turn_id)) AS first_match_turn_id,
                MAX(CASE WHEN rn = 1 THEN snippet END) AS snippet,
                MIN(score) AS best_score
            FROM ranked
            GROUP BY session_path
        )
        SELECT
            s.path AS path,
            s.session_id AS session_id,
            s.cwd AS cwd,
            s.started_at AS started_at,
            s.preview AS preview,
            a.match_message_count AS match_message_count,
            a.match_turn_count AS match_turn_count,
            a.first_match_turn_id AS first_match_turn_id,
            a.snippet AS snippet,
            a.best_score AS best_score
        FROM aggregated a
        JOIN sessions s ON s.path = a.session_path
        ORDER BY {order}
        LIMIT ?3
        "#,
        order = result_sort_clause(input.result_sort)
    );

    let rows: Vec<SessionResult> = sqlx::query_as(&sql)
        .bind(fts_query)
        .bind(input.workspace)
        .bind(input.limit as i64)
        .fetch_all(db.pool())
        .await?;

    let groups = group_by_workspace(db, rows, input.group_sort).await?;
    Ok(SearchResponse { groups, tokens: normalized.tokens, request_id: input.request_id })
}

/// Bins session rows by `cwd` (§4.4.2 "Grouping"). Workspace summaries are
/// fetched only for the workspaces that actually appear in the result set,
/// avoiding a full-corpus scan.
async fn group_by_workspace(
    db: &Database,
    rows: Vec<SessionResult>,
    group_sort: GroupSort,
) -> SearchResult<Vec<WorkspaceGroup>> {
    let mut buckets: HashMap<Option<String>, Vec<SessionResult>> = HashMap::new();
    for row in rows {
        let key = row.cwd.clone().filter(|c| !c.is_empty());
        buckets.entry(key).or_default().push(row);
    }

    let present_workspaces: Vec<String> = buckets.keys().flatten().cloned().collect();
    let stored_summaries = workspace_summaries_for(db, &present_workspaces).await?;

    let mut groups: Vec<WorkspaceGroup> = buckets
        .into_iter()
        .map(|(cwd, sessions)| {
            let match_count: i64 = sessions.iter().map(|s| s.match_message_count).sum();
            let session_started_max = sessions.iter().filter_map(|s| s.started_at).max();
            let stored_last_seen = cwd.as_deref().and_then(|c| stored_summaries.get(c)).and_then(|(_, ls)| *ls);
            let last_seen = match (session_started_max, stored_last_seen) {
                (Some(a), Some(b)) => Some(a.max(b)),
                (Some(a), None) => Some(a),
                (None, Some(b)) => Some(b),
                (None, None) => None,
            };
            let label = cwd.clone().unwrap_or_else(|| UNKNOWN_WORKSPACE_LABEL.to_string());
            let session_count = sessions.len() as i64;
            WorkspaceGroup { cwd, label, match_count, last_seen, session_count, sessions }
        })
        .collect();

    match group_sort {
        GroupSort::Matches => groups.sort_by(|a, b| {
            b.match_count.cmp(&a.match_count).then(b.last_seen.cmp(&a.last_seen)).then(a.label.cmp(&b.label))
        }),
        GroupSort::LastSeen => groups.sort_by(|a, b| {
            b.last_seen.cmp(&a.last_seen).then(b.session_count.cmp(&a.session_count)).then(a.label.cmp(&b.label))
        }),
    }

    Ok(groups)
}

async fn workspace_summaries_for(db: &Database, workspaces: &[String]) -> SearchResult<HashMap<String, (i64, Option<i64>)>> {
    let mut out = HashMap::new();
    if workspaces.is_empty() {
        return Ok(out);
    }
    let rows = db.list_workspaces_for(workspaces).await?;
    for (cwd, session_count, last_seen) in rows {
        out.insert(cwd, (session_count, last_seen));
    }
    Ok(out)
}

/// Session-id resolution (§4.4.3): exact `session_id`, then exact `path`,
/// then substring `path LIKE`, narrowed by exactness then path length then
/// lexical order. Returns `None` — a soft miss, not an error — when nothing matches.
#[instrument(skip(db))]
pub async fn resolve_session(db: &Database, input: &str, workspace: Option<&str>) -> SearchResult<Option<String>> {
    let like_pattern = format!("%{}%", escape_like(input));

    let row: Option<(String,)> = sqlx::query_as(
        r#"
        SELECT path FROM sessions
        WHERE (session_id = ?1 OR path = ?1 OR path LIKE ?2 ESCAPE '\')
          AND (?3 IS NULL OR cwd = ?3)
        ORDER BY
            CASE WHEN session_id = ?1 THEN 0 WHEN path = ?1 THEN 1 ELSE 2 END,
            LENGTH(path) ASC,
            path ASC
        LIMIT 1
        "#,
    )
    .bind(input)
    .bind(like_pattern)
    .bind(workspace)
    .fetch_optional(db.pool())
    .await?;

    Ok(row.map(|(path,)| path))
}

fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

/// Intra-session match localization (§4.4.4). Normalizes as `search` does
/// and short-circuits empty; excludes `turn_id <= 0` exactly as the
/// cross-session `matches` CTE does, so the two stay aligned (§8 scenario E).
#[instrument(skip(db), fields(query = %query))]
pub async fn session_matches(db: &Database, session_path: &str, query: &str) -> SearchResult<SessionMatches> {
    let normalized = normalize(query);
    let Some(fts_query) = normalized.fts_query.as_deref() else {
        return Ok(SessionMatches {
            session: session_path.to_string(),
            tokens: Vec::new(),
            turn_ids: Vec::new(),
            request_id: None,
        });
    };

    let rows: Vec<(i64,)> = sqlx::query_as(
        r#"
        SELECT DISTINCT m.turn_id
        FROM messages_fts
        JOIN messages m ON m.id = messages_fts.rowid
        WHERE messages_fts MATCH ?1 AND m.session_path = ?2 AND m.turn_id > 0
        ORDER BY m.turn_id ASC
        "#,
    )
    .bind(fts_query)
    .bind(session_path)
    .fetch_all(db.pool())
    .await?;

    Ok(SessionMatches {
        session: session_path.to_string(),
        tokens: normalized.tokens,
        turn_ids: rows.into_iter().map(|(t,)| t).collect(),
        request_id: None,
    })
}

/// `list_workspaces` (§6): distinct workspaces with session counts and most
/// recent session start, ordered per `sort`.
#[instrument(skip(db))]
pub async fn list_workspaces(db: &Database, sort: WorkspaceSort) -> SearchResult<Vec<WorkspaceSummary>> {
    let mut rows: Vec<WorkspaceSummary> = db
        .list_workspaces()
        .await?
        .into_iter()
        .map(|(cwd, session_count, last_seen)| WorkspaceSummary { cwd, session_count, last_seen })
        .collect();

    match sort {
        WorkspaceSort::LastSeen => rows.sort_by(|a, b| b.last_seen.cmp(&a.last_seen).then(a.cwd.cmp(&b.cwd))),
        WorkspaceSort::SessionCount => {
            rows.sort_by(|a, b| b.session_count.cmp(&a.session_count).then(a.cwd.cmp(&b.cwd)))
        }
    }
    Ok(rows)
}
