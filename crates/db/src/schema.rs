// crates/db/src/schema.rs
//! Inline SQL schema bootstrap for the turnlog database (§4.2, spec.md:86).
//!
//! On every open: create tables if missing, additively apply any columns
//! declared here but absent from an existing `sessions` table, then drop
//! and recreate the FTS sync triggers so a changed trigger body never goes
//! stale on an upgrade.

/// `CREATE TABLE`/`CREATE INDEX`/`CREATE VIRTUAL TABLE` statements, each
/// safe to run against an already-up-to-date database (`IF NOT EXISTS`).
pub const CREATE_STATEMENTS: &[&str] = &[
    r#"
CREATE TABLE IF NOT EXISTS sessions (
    path TEXT PRIMARY KEY,
    session_id TEXT,
    session_id_checked INTEGER NOT NULL DEFAULT 0,
    session_id_mismatch INTEGER NOT NULL DEFAULT 0,
    cwd TEXT,
    repo_url TEXT,
    git_branch TEXT,
    git_commit TEXT,
    preview TEXT,
    started_at INTEGER,
    ended_at INTEGER,
    turn_count INTEGER NOT NULL DEFAULT 0,
    message_count INTEGER NOT NULL DEFAULT 0,
    thought_count INTEGER NOT NULL DEFAULT 0,
    tool_call_count INTEGER NOT NULL DEFAULT 0,
    meta_count INTEGER NOT NULL DEFAULT 0,
    token_count_count INTEGER NOT NULL DEFAULT 0,
    active_duration_ms INTEGER
);
"#,
    r#"CREATE INDEX IF NOT EXISTS idx_sessions_started_at ON sessions(started_at);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_sessions_cwd ON sessions(cwd);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_sessions_session_id ON sessions(session_id);"#,
    // files table (change detection only, §3 "File")
    r#"
CREATE TABLE IF NOT EXISTS files (
    path TEXT PRIMARY KEY,
    size INTEGER NOT NULL,
    mtime INTEGER NOT NULL,
    content_hash TEXT,
    last_indexed_at INTEGER NOT NULL
);
"#,
    r#"
CREATE TABLE IF NOT EXISTS messages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_path TEXT NOT NULL REFERENCES sessions(path) ON DELETE CASCADE,
    turn_id INTEGER NOT NULL,
    role TEXT NOT NULL,
    content TEXT NOT NULL,
    timestamp INTEGER
);
"#,
    r#"CREATE INDEX IF NOT EXISTS idx_messages_session_path ON messages(session_path);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_messages_session_turn ON messages(session_path, turn_id);"#,
    // FTS5 shadow table, trigger-maintained sync (§9 "Trigger-driven FTS
    // sync"). `content=messages` keeps the index external-content so the
    // indexed text lives in exactly one place.
    r#"
CREATE VIRTUAL TABLE IF NOT EXISTS messages_fts USING fts5(
    content,
    session_path UNINDEXED,
    turn_id UNINDEXED,
    role UNINDEXED,
    content='messages',
    content_rowid='id',
    tokenize='porter unicode61'
);
"#,
];

/// The declared `sessions` columns beyond the primary key, checked against
/// `PRAGMA table_info(sessions)` on every open so a database created by an
/// older schema version picks up new columns additively.
pub const SESSIONS_COLUMNS: &[(&str, &str)] = &[
    ("session_id", "TEXT"),
    ("session_id_checked", "INTEGER NOT NULL DEFAULT 0"),
    ("session_id_mismatch", "INTEGER NOT NULL DEFAULT 0"),
    ("cwd", "TEXT"),
    ("repo_url", "TEXT"),
    ("git_branch", "TEXT"),
    ("git_commit", "TEXT"),
    ("preview", "TEXT"),
    ("started_at", "INTEGER"),
    ("ended_at", "INTEGER"),
    ("turn_count", "INTEGER NOT NULL DEFAULT 0"),
    ("message_count", "INTEGER NOT NULL DEFAULT 0"),
    ("thought_count", "INTEGER NOT NULL DEFAULT 0"),
    ("tool_call_count", "INTEGER NOT NULL DEFAULT 0"),
    ("meta_count", "INTEGER NOT NULL DEFAULT 0"),
    ("token_count_count", "INTEGER NOT NULL DEFAULT 0"),
    ("active_duration_ms", "INTEGER"),
];

/// `(name, definition)` pairs, dropped and recreated on every
/// `run_migrations()` call so a changed trigger body always wins.
pub const TRIGGERS: &[(&str, &str)] = &[
    (
        "messages_ai",
        r#"
CREATE TRIGGER messages_ai AFTER INSERT ON messages BEGIN
    INSERT INTO messages_fts(rowid, content, session_path, turn_id, role)
    VALUES (new.id, new.content, new.session_path, new.turn_id, new.role);
END;
"#,
    ),
    (
        "messages_ad",
        r#"
CREATE TRIGGER messages_ad AFTER DELETE ON messages BEGIN
    INSERT INTO messages_fts(messages_fts, rowid, content, session_path, turn_id, role)
    VALUES ('delete', old.id, old.content, old.session_path, old.turn_id, old.role);
END;
"#,
    ),
    (
        "messages_au",
        r#"
CREATE TRIGGER messages_au AFTER UPDATE ON messages BEGIN
    INSERT INTO messages_fts(messages_fts, rowid, content, session_path, turn_id, role)
    VALUES ('delete', old.id, old.content, old.session_path, old.turn_id, old.role);
    INSERT INTO messages_fts(rowid, content, session_path, turn_id, role)
    VALUES (new.id, new.content, new.session_path, new.turn_id, new.role);
END;
"#,
    ),
];
