// crates/db/src/indexer.rs
//! Indexer module (C3): walk -> diff -> reparse pipeline.
//!
//! 1. `walk()` — recursively discover all `.jsonl` files under the root.
//! 2. `file_snapshots()` (on `Database`) — one pre-pass query of stored state.
//! 3. `reindex()` — classify each walked file into skip / metadata-only-fill
//!    / reparse (§4.3's table), apply it, then remove stale sessions.

use crate::{Database, DbError};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, error, instrument};
use turnlog_core::ids;
use turnlog_core::ParseError;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("store error: {0}")]
    Store(#[from] DbError),

    #[error("sessions root does not exist: {0}")]
    RootMissing(PathBuf),

    #[error("failed to walk sessions root: {0}")]
    Walk(#[from] std::io::Error),
}

pub type IndexResult<T> = Result<T, IndexError>;

/// One discovered `.jsonl` file under the sessions root.
#[derive(Debug, Clone)]
pub struct WalkEntry {
    /// Absolute filesystem path.
    pub abs_path: PathBuf,
    /// Root-relative path with forward-slash separators — the session's identity.
    pub session_path: String,
    pub size: i64,
    /// Milliseconds since epoch, floored.
    pub mtime: i64,
}

/// Summary counts returned by `reindex`/`reset_and_reindex` (§4.3, §6).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexSummary {
    pub scanned: usize,
    pub updated: usize,
    pub removed: usize,
    pub message_count: usize,
    pub skipped: usize,
    pub metadata_checked: usize,
}

/// Recursively enumerates `root` for regular files ending in `.jsonl`.
/// Traversal is depth-first; order within a directory is unspecified.
pub async fn walk(root: &Path) -> std::io::Result<Vec<WalkEntry>> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];

    while let Some(dir) = stack.pop() {
        let mut entries = match fs::read_dir(&dir).await {
            Ok(e) => e,
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "cannot read directory during walk");
                continue;
            }
        };

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let file_type = match entry.file_type().await {
                Ok(ft) => ft,
                Err(_) => continue,
            };

            if file_type.is_dir() {
                stack.push(path);
                continue;
            }

            if path.extension().map(|e| e != "jsonl").unwrap_or(true) {
                continue;
            }

            let metadata = match entry.metadata().await {
                Ok(m) => m,
                Err(_) => continue,
            };
            let size = metadata.len() as i64;
            let mtime = metadata
                .modified()
                .ok()
                .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
                .map(|d| d.as_millis() as i64)
                .unwrap_or(0);

            let session_path = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");

            out.push(WalkEntry { abs_path: path, session_path, size, mtime });
        }
    }

    Ok(out)
}

/// Runs one incremental index pass: walk, diff, reparse/fill/remove.
/// `on_progress(done, total)` is invoked after each walked file.
#[instrument(skip(db, on_progress))]
pub async fn reindex<F>(db: &Database, root: &Path, on_progress: F) -> IndexResult<IndexSummary>
where
    F: Fn(usize, usize),
{
    if fs::metadata(root).await.is_err() {
        return Err(IndexError::RootMissing(root.to_path_buf()));
    }

    let entries = walk(root).await?;
    let snapshots = db.file_snapshots().await?;
    let total = entries.len();
    let mut summary = IndexSummary { scanned: total, ..Default::default() };
    let mut seen_paths: HashSet<String> = HashSet::new();

    for (i, entry) in entries.iter().enumerate() {
        seen_paths.insert(entry.session_path.clone());
        let file_name = entry.abs_path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();

        let existing = snapshots.get(&entry.session_path);
        let unchanged = existing.map(|s| s.size == entry.size && s.mtime == entry.mtime).unwrap_or(false);

        if unchanged {
            let snapshot = existing.expect("unchanged implies existing snapshot");
            if snapshot.session_exists && snapshot.session_id_checked {
                summary.skipped += 1;
                on_progress(i + 1, total);
                continue;
            }
            if snapshot.session_exists {
                match metadata_only_fill(db, &entry.abs_path, &entry.session_path, &file_name).await {
                    Ok(()) => summary.metadata_checked += 1,
                    Err(e) => error!(session_path = %entry.session_path, error = %e, "metadata-only fill failed"),
                }
                on_progress(i + 1, total);
                continue;
            }
        }

        match reparse_one(db, entry, &file_name).await {
            Ok(message_count) => {
                summary.updated += 1;
                summary.message_count += message_count;
            }
            Err(e) => {
                error!(session_path = %entry.session_path, error = %e, "reparse failed, leaving prior state intact");
            }
        }
        on_progress(i + 1, total);
    }

    for stale_path in snapshots.keys().filter(|p| !seen_paths.contains(*p)) {
        db.remove_session(stale_path).await?;
        summary.removed += 1;
    }

    Ok(summary)
}

/// Drops the entire schema and reindexes from scratch.
pub async fn reset_and_reindex<F>(db: &Database, root: &Path, on_progress: F) -> IndexResult<IndexSummary>
where
    F: Fn(usize, usize),
{
    db.reset().await?;
    reindex(db, root, on_progress).await
}

async fn metadata_only_fill(
    db: &Database,
    abs_path: &Path,
    session_path: &str,
    file_name: &str,
) -> Result<(), MetadataFillError> {
    let id = match ids::extract_filename_id(file_name) {
        Some(id) => Some(id),
        None => turnlog_session_parser::probe_session_id(abs_path).await?,
    };
    db.fill_session_id(session_path, id.as_deref()).await?;
    Ok(())
}

async fn reparse_one(db: &Database, entry: &WalkEntry, file_name: &str) -> Result<usize, ReparseError> {
    let mut parsed = turnlog_session_parser::parse_session(&entry.abs_path).await?;

    if parsed.metrics.started_at.is_none() {
        if let Some(ts) = turnlog_core::timestamp::parse_filename_timestamp(file_name) {
            parsed.metrics.started_at = Some(ts);
        }
    }

    if let Some(filename_id) = ids::extract_filename_id(file_name) {
        if let Some(content_id) = parsed.meta.session_id.as_deref() {
            if content_id != filename_id {
                tracing::warn!(
                    session_path = %entry.session_path,
                    filename_id = %filename_id,
                    content_id = %content_id,
                    "session id mismatch between filename and content"
                );
            }
        }
        let message_count = parsed.messages.len();
        db.replace_session(&entry.session_path, &parsed, Some(&filename_id), entry.size, entry.mtime).await?;
        Ok(message_count)
    } else {
        let message_count = parsed.messages.len();
        db.replace_session(&entry.session_path, &parsed, None, entry.size, entry.mtime).await?;
        Ok(message_count)
    }
}

#[derive(Debug, Error)]
enum MetadataFillError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Store(#[from] DbError),
}

#[derive(Debug, Error)]
enum ReparseError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Store(#[from] DbError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::fs;

    async fn write_session(dir: &Path, name: &str, lines: &[&str]) {
        let path = dir.join(name);
        let content = lines.join("\n");
        fs::write(path, content).await.unwrap();
    }

    #[tokio::test]
    async fn walk_finds_jsonl_files_recursively() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("2025/07/01");
        fs::create_dir_all(&nested).await.unwrap();
        write_session(&nested, "a.jsonl", &[r#"{"type":"event_msg","payload":{"type":"user_message","message":"hi"}}"#]).await;
        write_session(tmp.path(), "ignored.txt", &["not jsonl"]).await;

        let entries = walk(tmp.path()).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].session_path, "2025/07/01/a.jsonl");
    }

    #[tokio::test]
    async fn reindex_twice_with_no_change_yields_zero_updates_second_run() {
        let tmp = tempfile::tempdir().unwrap();
        write_session(
            tmp.path(),
            "s1.jsonl",
            &[r#"{"type":"event_msg","payload":{"type":"user_message","message":"hi"}}"#],
        )
        .await;
        let db = Database::new_in_memory().await.unwrap();

        let first = reindex(&db, tmp.path(), |_, _| {}).await.unwrap();
        assert_eq!(first.updated, 1);
        assert_eq!(first.removed, 0);

        let second = reindex(&db, tmp.path(), |_, _| {}).await.unwrap();
        assert_eq!(second.updated, 0);
        assert_eq!(second.removed, 0);
        assert_eq!(second.skipped, 1);
    }

    #[tokio::test]
    async fn reindex_removes_sessions_for_deleted_files() {
        let tmp = tempfile::tempdir().unwrap();
        write_session(
            tmp.path(),
            "s1.jsonl",
            &[r#"{"type":"event_msg","payload":{"type":"user_message","message":"hi"}}"#],
        )
        .await;
        let db = Database::new_in_memory().await.unwrap();
        reindex(&db, tmp.path(), |_, _| {}).await.unwrap();

        fs::remove_file(tmp.path().join("s1.jsonl")).await.unwrap();
        let second = reindex(&db, tmp.path(), |_, _| {}).await.unwrap();
        assert_eq!(second.removed, 1);

        let messages: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM messages")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(messages.0, 0, "no orphaned messages after removal");
    }

    #[tokio::test]
    async fn reindex_reparses_when_only_mtime_changes() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("s1.jsonl");
        fs::write(&path, r#"{"type":"event_msg","payload":{"type":"user_message","message":"hi"}}"#).await.unwrap();
        let db = Database::new_in_memory().await.unwrap();
        reindex(&db, tmp.path(), |_, _| {}).await.unwrap();

        // Touch mtime without changing size or content.
        let now = std::time::SystemTime::now() + std::time::Duration::from_secs(5);
        let file = std::fs::File::open(&path).unwrap();
        file.set_modified(now).unwrap();

        let second = reindex(&db, tmp.path(), |_, _| {}).await.unwrap();
        assert_eq!(second.updated, 1, "mtime-only change must force a reparse");
    }

    #[tokio::test]
    async fn reindex_on_missing_root_returns_root_missing_error() {
        let db = Database::new_in_memory().await.unwrap();
        let missing = Path::new("/nonexistent/turnlog-root-for-test");
        let result = reindex(&db, missing, |_, _| {}).await;
        assert!(matches!(result, Err(IndexError::RootMissing(_))));
    }

    #[tokio::test]
    async fn scenario_f_incremental_convergence() {
        let tmp = tempfile::tempdir().unwrap();
        write_session(tmp.path(), "A.jsonl", &[&"x".repeat(10_000)]).await;
        write_session(tmp.path(), "B.jsonl", &[&"x".repeat(20_000)]).await;
        let db = Database::new_in_memory().await.unwrap();

        let first = reindex(&db, tmp.path(), |_, _| {}).await.unwrap();
        assert_eq!(first.scanned, 2);

        fs::write(tmp.path().join("A.jsonl"), format!("{}\nmore", "x".repeat(10_000))).await.unwrap();
        let second = reindex(&db, tmp.path(), |_, _| {}).await.unwrap();
        assert_eq!(second.updated, 1);
        assert_eq!(second.skipped, 1);
    }
}
