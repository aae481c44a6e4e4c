// crates/session-parser/src/probe.rs
//! Ad-hoc object probing, made explicit (§9 Design Notes). Rather than a
//! generic recursive key search, this is a short accessor that tries a fixed
//! list of key paths to depth 2: the object itself, then a handful of known
//! container fields nested one level down.

use serde_json::Value;

const ID_KEYS: &[&str] = &[
    "session_id",
    "sessionId",
    "conversation_id",
    "conversationId",
    "resume_session_id",
    "resumeSessionId",
    "id",
];

const CONTAINER_KEYS: &[&str] = &["session", "session_info", "sessionInfo", "metadata", "context", "payload"];

/// Searches `value` (depth 0) and its known containers (depth 1) for the
/// first of the recognized id keys, returning the raw string found.
pub fn probe_id(value: &Value) -> Option<String> {
    if let Some(found) = probe_id_keys(value) {
        return Some(found);
    }
    for container in CONTAINER_KEYS {
        if let Some(nested) = value.get(container) {
            if let Some(found) = probe_id_keys(nested) {
                return Some(found);
            }
        }
    }
    None
}

fn probe_id_keys(value: &Value) -> Option<String> {
    let obj = value.as_object()?;
    for key in ID_KEYS {
        if let Some(v) = obj.get(*key) {
            if let Some(s) = v.as_str() {
                if !s.is_empty() {
                    return Some(s.to_string());
                }
            }
        }
    }
    None
}

/// Extracts a `cwd` field from `value` or its `session`/`session_info` containers.
pub fn probe_cwd(value: &Value) -> Option<String> {
    if let Some(s) = value.get("cwd").and_then(Value::as_str) {
        return Some(s.to_string());
    }
    for container in ["session", "session_info", "sessionInfo"] {
        if let Some(s) = value
            .get(container)
            .and_then(|v| v.get("cwd"))
            .and_then(Value::as_str)
        {
            return Some(s.to_string());
        }
    }
    None
}

/// Extracts the most useful textual content from an arbitrary event payload,
/// trying a fixed list of field names before falling back to a compact JSON
/// rendering of the whole value. Unknown shapes never panic; they degrade to
/// this fallback.
pub fn extract_text(value: &Value) -> String {
    for key in ["message", "text", "content", "output", "arguments"] {
        if let Some(v) = value.get(key) {
            if let Some(s) = v.as_str() {
                return s.to_string();
            }
            if !v.is_null() {
                return v.to_string();
            }
        }
    }
    value.to_string()
}
