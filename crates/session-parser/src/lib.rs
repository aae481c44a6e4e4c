// crates/session-parser/src/lib.rs
//! The event parser and turn grouper (C1). Pure function: bytes in, a
//! `ParsedSession` out. No filesystem access beyond the single file it is
//! handed, no database.

mod parser;
mod probe;

pub use parser::parse_session;
pub use probe::{extract_text, probe_cwd, probe_id};

use serde_json::Value;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use turnlog_core::ids;
use turnlog_core::ParseError;

/// Reads only `session_meta`/`turn_context` lines, stopping at the first
/// extractable id (§4.3 "Metadata-only fill"). Cheaper than a full
/// `parse_session` when the indexer only needs to complete id extraction
/// for an otherwise-unchanged file.
pub async fn probe_session_id(path: &Path) -> Result<Option<String>, ParseError> {
    let file = tokio::fs::File::open(path).await.map_err(|e| ParseError::io(path, e))?;
    let mut lines = BufReader::new(file).lines();
    while let Some(line) = lines.next_line().await.map_err(|e| ParseError::io(path, e))? {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let value: Value = match serde_json::from_str(trimmed) {
            Ok(v) => v,
            Err(_) => continue,
        };
        let event_type = value.get("type").and_then(Value::as_str).unwrap_or("");
        if event_type == "session_meta" || event_type == "turn_context" {
            let payload = value.get("payload").unwrap_or(&value);
            if let Some(raw) = probe::probe_id(payload) {
                return Ok(Some(ids::normalize_candidate_id(&raw)));
            }
        }
    }
    Ok(None)
}
