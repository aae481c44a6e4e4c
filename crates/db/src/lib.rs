// crates/db/src/lib.rs
//! The embedded store (C2): schema bootstrap, connection pool, and the
//! session/message/file CRUD the indexer and search facade sit on top of.
#![allow(clippy::too_many_arguments)]

pub mod indexer;
mod schema;
pub mod store;

pub use store::{FileRow, SessionRow};

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{ConnectOptions, SqlitePool};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("failed to determine cache directory")]
    NoCacheDir,

    #[error("failed to create database directory: {0}")]
    CreateDir(#[from] std::io::Error),
}

pub type DbResult<T> = Result<T, DbError>;

/// Main database handle wrapping a SQLite connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    db_path: PathBuf,
}

impl Database {
    /// Opens (or creates) the database at `path` and runs migrations.
    pub async fn new(path: &Path) -> DbResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(std::time::Duration::from_secs(30))
            .log_slow_statements(tracing::log::LevelFilter::Warn, std::time::Duration::from_secs(5));

        let pool = SqlitePoolOptions::new().max_connections(4).connect_with(options).await?;

        let db = Self { pool, db_path: path.to_owned() };
        db.run_migrations().await?;

        info!(path = %path.display(), "database opened");
        Ok(db)
    }

    /// Creates an in-memory database for tests.
    ///
    /// Uses `shared_cache(true)` so every pool connection sees the same
    /// in-memory database; without it, each connection would get its own,
    /// breaking concurrent reads against data written on another connection.
    pub async fn new_in_memory() -> DbResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?
            .shared_cache(true)
            .foreign_keys(true)
            .busy_timeout(std::time::Duration::from_secs(5));
        let pool = SqlitePoolOptions::new().max_connections(4).connect_with(options).await?;
        let db = Self { pool, db_path: PathBuf::new() };
        db.run_migrations().await?;
        Ok(db)
    }

    /// Opens the database at the default location (`turnlog_core::paths::db_path()`).
    pub async fn open_default() -> DbResult<Self> {
        let path = default_db_path()?;
        Self::new(&path).await
    }

    /// Bootstraps the schema on every open (spec.md:86): create tables if
    /// missing, additively add any declared `sessions` column an existing
    /// database lacks, then drop and recreate the FTS sync triggers so a
    /// changed trigger body is never left stale.
    async fn run_migrations(&self) -> DbResult<()> {
        for statement in schema::CREATE_STATEMENTS {
            sqlx::raw_sql(statement).execute(&self.pool).await?;
        }

        let existing_columns: Vec<String> = sqlx::query_as::<_, (i64, String, String, i64, Option<String>, i64)>(
            "PRAGMA table_info(sessions)",
        )
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|(_cid, name, ..)| name)
        .collect();

        for (name, definition) in schema::SESSIONS_COLUMNS {
            if !existing_columns.iter().any(|c| c == name) {
                let sql = format!("ALTER TABLE sessions ADD COLUMN {name} {definition}");
                sqlx::query(&sql).execute(&self.pool).await?;
            }
        }

        for (name, definition) in schema::TRIGGERS {
            sqlx::query(&format!("DROP TRIGGER IF EXISTS {name}")).execute(&self.pool).await?;
            sqlx::raw_sql(definition).execute(&self.pool).await?;
        }

        Ok(())
    }

    /// Full reset: drops every table and re-runs the bootstrap from scratch.
    pub async fn reset(&self) -> DbResult<()> {
        sqlx::query("DROP TABLE IF EXISTS messages_fts").execute(&self.pool).await?;
        sqlx::query("DROP TABLE IF EXISTS messages").execute(&self.pool).await?;
        sqlx::query("DROP TABLE IF EXISTS sessions").execute(&self.pool).await?;
        sqlx::query("DROP TABLE IF EXISTS files").execute(&self.pool).await?;
        self.run_migrations().await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Path to the database file. Empty for in-memory databases.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

/// Resolves the default database path (`turnlog_core::paths::db_path()`).
pub fn default_db_path() -> DbResult<PathBuf> {
    turnlog_core::paths::db_path().ok_or(DbError::NoCacheDir)
}
