// crates/core/src/timestamp.rs
//! Filename-derived timestamp extraction, used by the indexer's late-fill
//! metadata backfill (§4.3).

use chrono::NaiveDateTime;
use regex_lite::Regex;
use std::sync::OnceLock;

fn filename_timestamp_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d{4}-\d{2}-\d{2})T(\d{2})[-:](\d{2})[-:](\d{2})")
            .expect("static filename-timestamp regex is valid")
    })
}

/// Extracts a `YYYY-MM-DDThh-mm-ss` or `YYYY-MM-DDThh:mm:ss` timestamp from a
/// filename (or any string), returning milliseconds since epoch (UTC).
pub fn parse_filename_timestamp(text: &str) -> Option<i64> {
    let caps = filename_timestamp_regex().captures(text)?;
    let normalized = format!("{}T{}:{}:{}", &caps[1], &caps[2], &caps[3], &caps[4]);
    NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|dt| dt.and_utc().timestamp_millis())
}
