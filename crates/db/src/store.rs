// crates/db/src/store.rs
//! Session/message/file CRUD (§4.2). All multi-statement writes for one
//! file happen inside a single transaction: delete old messages, upsert the
//! session row, insert new messages, upsert the file row.

use crate::{Database, DbResult};
use turnlog_core::types::ParsedSession;

/// A `sessions` row as read back from the store.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRow {
    pub path: String,
    pub session_id: Option<String>,
    pub session_id_checked: bool,
    pub session_id_mismatch: bool,
    pub cwd: Option<String>,
    pub repo_url: Option<String>,
    pub git_branch: Option<String>,
    pub git_commit: Option<String>,
    pub preview: Option<String>,
    pub started_at: Option<i64>,
    pub ended_at: Option<i64>,
    pub turn_count: i64,
    pub message_count: i64,
    pub thought_count: i64,
    pub tool_call_count: i64,
    pub meta_count: i64,
    pub token_count_count: i64,
    pub active_duration_ms: Option<i64>,
}

/// A `files` row as read back from the store — used solely for change
/// detection by the indexer; never exposed past C3.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FileRow {
    pub path: String,
    pub size: i64,
    pub mtime: i64,
    pub content_hash: Option<String>,
    pub last_indexed_at: i64,
}

/// The indexer's pre-pass snapshot of one stored file, joined against
/// whether its session row exists and has completed id extraction.
#[derive(Debug, Clone)]
pub struct FileSnapshot {
    pub size: i64,
    pub mtime: i64,
    pub session_exists: bool,
    pub session_id_checked: bool,
}

impl Database {
    /// Replaces a session's full state: deletes its old messages, upserts
    /// the session row (full replace of every attribute — reparse always
    /// wins), inserts the new messages, upserts the file row. One
    /// transaction; a failure at any step leaves the prior state intact.
    pub async fn replace_session(
        &self,
        session_path: &str,
        parsed: &ParsedSession,
        filename_id: Option<&str>,
        size: i64,
        mtime: i64,
    ) -> DbResult<()> {
        let canonical_id = filename_id
            .map(str::to_string)
            .or_else(|| parsed.meta.session_id.clone());
        let mismatch = match (filename_id, parsed.meta.session_id.as_deref()) {
            (Some(f), Some(c)) => f != c,
            _ => false,
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM messages WHERE session_path = ?")
            .bind(session_path)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO sessions (
                path, session_id, session_id_checked, session_id_mismatch,
                cwd, repo_url, git_branch, git_commit, preview,
                started_at, ended_at, turn_count, message_count,
                thought_count, tool_call_count, meta_count, token_count_count,
                active_duration_ms
            ) VALUES (
                ?1, ?2, 1, ?3,
                ?4, ?5, ?6, ?7, ?8,
                ?9, ?10, ?11, ?12,
                ?13, ?14, ?15, ?16,
                ?17
            )
            ON CONFLICT(path) DO UPDATE SET
                session_id = excluded.session_id,
                session_id_checked = 1,
                session_id_mismatch = excluded.session_id_mismatch,
                cwd = excluded.cwd,
                repo_url = excluded.repo_url,
                git_branch = excluded.git_branch,
                git_commit = excluded.git_commit,
                preview = excluded.preview,
                started_at = excluded.started_at,
                ended_at = excluded.ended_at,
                turn_count = excluded.turn_count,
                message_count = excluded.message_count,
                thought_count = excluded.thought_count,
                tool_call_count = excluded.tool_call_count,
                meta_count = excluded.meta_count,
                token_count_count = excluded.token_count_count,
                active_duration_ms = excluded.active_duration_ms
            "#,
        )
        .bind(session_path)
        .bind(&canonical_id)
        .bind(mismatch)
        .bind(&parsed.meta.cwd)
        .bind(&parsed.meta.repo_url)
        .bind(&parsed.meta.git_branch)
        .bind(&parsed.meta.git_commit)
        .bind(&parsed.meta.preview)
        .bind(parsed.metrics.started_at)
        .bind(parsed.metrics.ended_at)
        .bind(parsed.metrics.turn_count as i64)
        .bind(parsed.metrics.message_count as i64)
        .bind(parsed.metrics.thought_count as i64)
        .bind(parsed.metrics.tool_call_count as i64)
        .bind(parsed.metrics.meta_count as i64)
        .bind(parsed.metrics.token_count_count as i64)
        .bind(parsed.metrics.active_duration_ms)
        .execute(&mut *tx)
        .await?;

        for message in &parsed.messages {
            sqlx::query(
                "INSERT INTO messages (session_path, turn_id, role, content, timestamp) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(session_path)
            .bind(message.turn_id)
            .bind(message.role.as_str())
            .bind(&message.content)
            .bind(message.timestamp)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO files (path, size, mtime, content_hash, last_indexed_at)
            VALUES (?1, ?2, ?3, ?4, strftime('%s','now') * 1000)
            ON CONFLICT(path) DO UPDATE SET
                size = excluded.size,
                mtime = excluded.mtime,
                content_hash = excluded.content_hash,
                last_indexed_at = excluded.last_indexed_at
            "#,
        )
        .bind(session_path)
        .bind(size)
        .bind(mtime)
        .bind(&parsed.content_hash)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Metadata-only fill (§4.3): sets `session_id`/`session_id_checked`
    /// without touching messages, used when size/mtime are unchanged but
    /// id extraction was never completed.
    pub async fn fill_session_id(&self, session_path: &str, session_id: Option<&str>) -> DbResult<()> {
        sqlx::query("UPDATE sessions SET session_id = COALESCE(?, session_id), session_id_checked = 1 WHERE path = ?")
            .bind(session_id)
            .bind(session_path)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Deletes a session's messages, row, and file row in one transaction.
    pub async fn remove_session(&self, session_path: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM messages WHERE session_path = ?")
            .bind(session_path)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM sessions WHERE path = ?")
            .bind(session_path)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM files WHERE path = ?")
            .bind(session_path)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    /// One pre-pass query materializing every stored file's diff-relevant
    /// state, joined against session existence and id-check status (§4.3).
    pub async fn file_snapshots(&self) -> DbResult<std::collections::HashMap<String, FileSnapshot>> {
        let rows: Vec<(String, i64, i64, Option<String>, Option<bool>)> = sqlx::query_as(
            r#"
            SELECT f.path, f.size, f.mtime, s.path, s.session_id_checked
            FROM files f
            LEFT JOIN sessions s ON s.path = f.path
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(path, size, mtime, session_path, checked)| {
                let snapshot = FileSnapshot {
                    size,
                    mtime,
                    session_exists: session_path.is_some(),
                    session_id_checked: checked.unwrap_or(false),
                };
                (path, snapshot)
            })
            .collect())
    }

    /// Lists session summaries, optionally filtered by `cwd`. Ordered most
    /// recently started first, matching the session-tree leaf ordering
    /// (§6 "Session tree shape").
    pub async fn list_sessions(&self, workspace: Option<&str>) -> DbResult<Vec<SessionRow>> {
        let rows = if let Some(cwd) = workspace {
            sqlx::query_as::<_, SessionRow>(
                "SELECT * FROM sessions WHERE cwd = ? ORDER BY started_at DESC, path DESC",
            )
            .bind(cwd)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<_, SessionRow>("SELECT * FROM sessions ORDER BY started_at DESC, path DESC")
                .fetch_all(&self.pool)
                .await?
        };
        Ok(rows)
    }

    /// Fetches one session row by its path, if present.
    pub async fn get_session(&self, session_path: &str) -> DbResult<Option<SessionRow>> {
        let row = sqlx::query_as::<_, SessionRow>("SELECT * FROM sessions WHERE path = ?")
            .bind(session_path)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    /// Distinct non-empty `cwd` values with session counts and most recent
    /// `started_at`, for `list_workspaces`.
    pub async fn list_workspaces(&self) -> DbResult<Vec<(String, i64, Option<i64>)>> {
        let rows: Vec<(String, i64, Option<i64>)> = sqlx::query_as(
            r#"
            SELECT cwd, COUNT(*) as session_count, MAX(started_at) as last_seen
            FROM sessions
            WHERE cwd IS NOT NULL AND cwd <> ''
            GROUP BY cwd
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Same aggregate as [`Self::list_workspaces`], narrowed to a specific
    /// set of `cwd` values — avoids a full-corpus scan when the caller
    /// already knows which workspaces it cares about (e.g. search result
    /// grouping, which only needs summaries for workspaces appearing in
    /// the result set).
    pub async fn list_workspaces_for(&self, cwds: &[String]) -> DbResult<Vec<(String, i64, Option<i64>)>> {
        if cwds.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = std::iter::repeat("?").take(cwds.len()).collect::<Vec<_>>().join(", ");
        let sql = format!(
            r#"
            SELECT cwd, COUNT(*) as session_count, MAX(started_at) as last_seen
            FROM sessions
            WHERE cwd IN ({placeholders})
            GROUP BY cwd
            "#
        );
        let mut query = sqlx::query_as::<_, (String, i64, Option<i64>)>(&sql);
        for cwd in cwds {
            query = query.bind(cwd);
        }
        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use turnlog_core::types::{Message, Metrics, Role, SessionMeta};

    fn sample_parsed() -> ParsedSession {
        ParsedSession {
            messages: vec![
                Message::new(0, Role::Meta, "preamble".into(), None),
                Message::new(1, Role::User, "hello".into(), Some(0)),
                Message::new(1, Role::Assistant, "hi".into(), Some(5)),
            ],
            meta: SessionMeta {
                session_id: Some("content-id".into()),
                cwd: Some("/workspace".into()),
                preview: Some("hello".into()),
                ..Default::default()
            },
            metrics: Metrics {
                started_at: Some(0),
                ended_at: Some(5),
                turn_count: 1,
                message_count: 3,
                active_duration_ms: Some(5),
                ..Default::default()
            },
            warnings: vec![],
            content_hash: Some("abc123".into()),
        }
    }

    #[tokio::test]
    async fn replace_session_writes_rows_and_fts_shadow() {
        let db = Database::new_in_memory().await.unwrap();
        let parsed = sample_parsed();
        db.replace_session("2025/07/01/s1.jsonl", &parsed, Some("filename-id"), 100, 1000)
            .await
            .unwrap();

        let row = db.get_session("2025/07/01/s1.jsonl").await.unwrap().unwrap();
        assert_eq!(row.session_id.as_deref(), Some("filename-id"));
        assert!(row.session_id_mismatch);
        assert_eq!(row.turn_count, 1);

        let fts_count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages_fts WHERE messages_fts MATCH 'hello'")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(fts_count.0, 1);
    }

    #[tokio::test]
    async fn replace_session_is_a_full_rewrite_not_an_append() {
        let db = Database::new_in_memory().await.unwrap();
        let parsed = sample_parsed();
        db.replace_session("s1.jsonl", &parsed, None, 100, 1000).await.unwrap();
        db.replace_session("s1.jsonl", &parsed, None, 150, 2000).await.unwrap();

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages WHERE session_path = 's1.jsonl'")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count.0, 3, "messages must be replaced, not duplicated");
    }

    #[tokio::test]
    async fn remove_session_deletes_messages_and_fts_rows() {
        let db = Database::new_in_memory().await.unwrap();
        let parsed = sample_parsed();
        db.replace_session("s1.jsonl", &parsed, None, 100, 1000).await.unwrap();

        db.remove_session("s1.jsonl").await.unwrap();

        let sessions: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions").fetch_one(db.pool()).await.unwrap();
        let messages: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages").fetch_one(db.pool()).await.unwrap();
        let fts: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages_fts").fetch_one(db.pool()).await.unwrap();
        assert_eq!(sessions.0, 0);
        assert_eq!(messages.0, 0);
        assert_eq!(fts.0, 0);
    }

    #[tokio::test]
    async fn fill_session_id_does_not_touch_messages() {
        let db = Database::new_in_memory().await.unwrap();
        let parsed = sample_parsed();
        db.replace_session("s1.jsonl", &parsed, None, 100, 1000).await.unwrap();

        db.fill_session_id("s1.jsonl", Some("late-fill-id")).await.unwrap();

        let row = db.get_session("s1.jsonl").await.unwrap().unwrap();
        assert_eq!(row.session_id.as_deref(), Some("late-fill-id"));
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages WHERE session_path = 's1.jsonl'")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count.0, 3);
    }

    #[tokio::test]
    async fn list_sessions_filters_by_workspace() {
        let db = Database::new_in_memory().await.unwrap();
        let mut parsed_a = sample_parsed();
        parsed_a.meta.cwd = Some("/a".into());
        let mut parsed_b = sample_parsed();
        parsed_b.meta.cwd = Some("/b".into());
        db.replace_session("a.jsonl", &parsed_a, None, 1, 1).await.unwrap();
        db.replace_session("b.jsonl", &parsed_b, None, 1, 1).await.unwrap();

        let rows = db.list_sessions(Some("/a")).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].path, "a.jsonl");
    }
}
