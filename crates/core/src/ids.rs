// crates/core/src/ids.rs
//! Shared id-extraction helpers used by both the parser (content-embedded
//! fallback ids) and the indexer (authoritative filename ids). See §4.1
//! "Filename id extraction" and "Session-id extraction".

use regex_lite::Regex;
use std::sync::OnceLock;

fn uuid_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
        )
        .expect("static uuid regex is valid")
    })
}

fn prefixed_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"sess(?:ion)?_[A-Za-z0-9_-]+").expect("static prefixed-token regex is valid")
    })
}

/// Returns the first canonical UUID substring found in `text`, if any.
pub fn find_uuid(text: &str) -> Option<String> {
    uuid_regex().find(text).map(|m| m.as_str().to_string())
}

/// Returns the first `sess_`/`session_`-prefixed token found in `text`, if any.
pub fn find_prefixed_token(text: &str) -> Option<String> {
    prefixed_token_regex().find(text).map(|m| m.as_str().to_string())
}

/// Normalizes a raw candidate id per §4.1: a UUID substring wins, else a
/// `sess_`/`session_`-prefixed token, else the trimmed string verbatim.
pub fn normalize_candidate_id(raw: &str) -> String {
    if let Some(uuid) = find_uuid(raw) {
        return uuid;
    }
    if let Some(tok) = find_prefixed_token(raw) {
        return tok;
    }
    raw.trim().to_string()
}

/// Extracts the canonical session id from a session filename (the last path
/// component, minus `.jsonl`): UUID regex first, then the prefixed-token
/// regex. Returns `None` if neither matches.
pub fn extract_filename_id(filename: &str) -> Option<String> {
    let stem = filename.strip_suffix(".jsonl").unwrap_or(filename);
    find_uuid(stem).or_else(|| find_prefixed_token(stem))
}
