// crates/session-parser/src/parser.rs
//! The event parser and turn grouper (C1 — SPEC_FULL.md §4.1).
//!
//! Consumes a single file as a lazy, line-at-a-time byte stream and emits an
//! ordered message list, best-available session metadata, and derived
//! metrics. Malformed lines never abort the file; the first few are logged
//! verbatim and the rest are silently counted.

use crate::probe;
use chrono::DateTime;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};
use turnlog_core::ids;
use turnlog_core::types::{Message, Metrics, ParsedSession, Role, SessionMeta};
use turnlog_core::ParseError;

const MAX_LOGGED_MALFORMED_LINES: usize = 3;
const PREVIEW_MAX_CHARS: usize = 1000;
const PREVIEW_MAX_LINES: usize = 50;

/// Parses one session file, streaming it line by line.
///
/// Returns `Err` only when the file itself cannot be opened or read at the
/// I/O level (§7 `ParseError`); any problem with the content is recorded as
/// a warning on the `Ok` result instead.
pub async fn parse_session(path: &Path) -> Result<ParsedSession, ParseError> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| ParseError::io(path, e))?;
    let mut lines = BufReader::new(file).lines();
    let mut hasher = blake3::Hasher::new();

    let mut messages = Vec::new();
    let mut meta = SessionMeta::default();
    let mut metrics = Metrics::default();
    let mut warnings = Vec::new();
    let mut malformed_count = 0usize;

    let mut current_turn: u32 = 0;
    let mut session_meta_seen = false;
    let mut best_id_rank: u8 = 0; // 0 = none, 1 = turn_context, 2 = session_meta
    let mut turn_user_ts: HashMap<u32, i64> = HashMap::new();
    let mut turn_last_activity_ts: HashMap<u32, i64> = HashMap::new();

    while let Some(line) = lines.next_line().await.map_err(|e| ParseError::io(path, e))? {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let value: Value = match serde_json::from_str(trimmed) {
            Ok(v) => v,
            Err(e) => {
                malformed_count += 1;
                if malformed_count <= MAX_LOGGED_MALFORMED_LINES {
                    debug!(path = %path.display(), error = %e, line = %trimmed, "malformed JSONL line");
                }
                warnings.push(format!("malformed JSON at line {malformed_count}: {e}"));
                continue;
            }
        };

        let event_type = value.get("type").and_then(Value::as_str).unwrap_or("").to_string();
        if let Some(ts) = value.get("timestamp").and_then(parse_timestamp) {
            metrics.started_at = Some(metrics.started_at.map_or(ts, |s| s.min(ts)));
            metrics.ended_at = Some(metrics.ended_at.map_or(ts, |e| e.max(ts)));
            handle_event(
                &event_type,
                &value,
                Some(ts),
                &mut current_turn,
                &mut messages,
                &mut meta,
                &mut metrics,
                &mut session_meta_seen,
                &mut best_id_rank,
                &mut turn_user_ts,
                &mut turn_last_activity_ts,
            );
        } else {
            handle_event(
                &event_type,
                &value,
                None,
                &mut current_turn,
                &mut messages,
                &mut meta,
                &mut metrics,
                &mut session_meta_seen,
                &mut best_id_rank,
                &mut turn_user_ts,
                &mut turn_last_activity_ts,
            );
        }
    }

    metrics.active_duration_ms = compute_active_duration(current_turn, &turn_user_ts, &turn_last_activity_ts);

    Ok(ParsedSession {
        messages,
        meta,
        metrics,
        warnings,
        content_hash: Some(hasher.finalize().to_hex().to_string()),
    })
}

#[allow(clippy::too_many_arguments)]
fn handle_event(
    event_type: &str,
    value: &Value,
    ts: Option<i64>,
    current_turn: &mut u32,
    messages: &mut Vec<Message>,
    meta: &mut SessionMeta,
    metrics: &mut Metrics,
    session_meta_seen: &mut bool,
    best_id_rank: &mut u8,
    turn_user_ts: &mut HashMap<u32, i64>,
    turn_last_activity_ts: &mut HashMap<u32, i64>,
) {
    match event_type {
        "session_meta" => {
            metrics.meta_count += 1;
            let payload = value.get("payload").unwrap_or(value);
            if !*session_meta_seen {
                fill_meta_first(meta, payload);
                *session_meta_seen = true;
            } else {
                fill_meta_blanks(meta, payload);
            }
            if *best_id_rank <= 2 {
                if let Some(raw) = probe::probe_id(payload) {
                    meta.session_id = Some(ids::normalize_candidate_id(&raw));
                    *best_id_rank = 2;
                }
            }
            messages.push(Message::new(*current_turn, Role::Meta, probe::extract_text(payload), ts));
        }
        "turn_context" => {
            metrics.meta_count += 1;
            let payload = value.get("payload").unwrap_or(value);
            if *best_id_rank < 1 {
                if let Some(raw) = probe::probe_id(payload) {
                    meta.session_id = Some(ids::normalize_candidate_id(&raw));
                    *best_id_rank = 1;
                }
            }
            messages.push(Message::new(*current_turn, Role::Meta, probe::extract_text(payload), ts));
        }
        "event_msg" => {
            let payload = value.get("payload").cloned().unwrap_or(Value::Null);
            let payload_type = payload.get("type").and_then(Value::as_str).unwrap_or("");
            match payload_type {
                "user_message" => {
                    *current_turn += 1;
                    metrics.turn_count += 1;
                    let content = probe::extract_text(&payload);
                    if meta.preview.is_none() {
                        meta.preview = Some(truncate_preview(&content));
                    }
                    if let Some(t) = ts {
                        turn_user_ts.insert(*current_turn, t);
                    }
                    messages.push(Message::new(*current_turn, Role::User, content, ts));
                    metrics.message_count += 1;
                }
                "agent_message" => {
                    record_activity(turn_last_activity_ts, *current_turn, ts);
                    messages.push(Message::new(*current_turn, Role::Assistant, probe::extract_text(&payload), ts));
                    metrics.message_count += 1;
                }
                "agent_reasoning" => {
                    metrics.thought_count += 1;
                    record_activity(turn_last_activity_ts, *current_turn, ts);
                    messages.push(Message::new(*current_turn, Role::Thought, probe::extract_text(&payload), ts));
                    metrics.message_count += 1;
                }
                "token_count" => {
                    metrics.token_count_count += 1;
                }
                "turn_aborted" => {}
                other => {
                    debug!(payload_type = %other, "unrecognized event_msg payload type");
                }
            }
        }
        "response_item" => {
            let inner = value.get("payload").unwrap_or(value);
            let inner_type = inner.get("type").and_then(Value::as_str).unwrap_or("");
            handle_response_item(
                inner_type,
                inner,
                *current_turn,
                ts,
                messages,
                metrics,
                turn_last_activity_ts,
            );
        }
        other => {
            handle_response_item(other, value, *current_turn, ts, messages, metrics, turn_last_activity_ts);
        }
    }
}

fn handle_response_item(
    item_type: &str,
    item: &Value,
    turn: u32,
    ts: Option<i64>,
    messages: &mut Vec<Message>,
    metrics: &mut Metrics,
    turn_last_activity_ts: &mut HashMap<u32, i64>,
) {
    match item_type {
        "function_call" | "custom_tool_call" | "web_search_call" => {
            metrics.tool_call_count += 1;
            record_activity(turn_last_activity_ts, turn, ts);
            messages.push(Message::new(turn, Role::ToolCall, probe::extract_text(item), ts));
            metrics.message_count += 1;
        }
        "function_call_output" | "custom_tool_call_output" => {
            record_activity(turn_last_activity_ts, turn, ts);
            messages.push(Message::new(turn, Role::ToolOutput, probe::extract_text(item), ts));
            metrics.message_count += 1;
        }
        "" => {}
        other => {
            debug!(item_type = %other, "unrecognized response_item/bare entry type");
        }
    }
}

fn fill_meta_first(meta: &mut SessionMeta, payload: &Value) {
    meta.cwd = probe::probe_cwd(payload).or_else(|| meta.cwd.clone());
    meta.repo_url = str_field(payload, "repo_url").or_else(|| meta.repo_url.clone());
    meta.git_branch = str_field(payload, "git_branch").or_else(|| meta.git_branch.clone());
    meta.git_commit = str_field(payload, "git_commit").or_else(|| meta.git_commit.clone());
}

/// Later `session_meta` occurrences only fill fields the first left blank —
/// branch-ancestry sessions append older metadata which must never overwrite
/// newer, already-populated values.
fn fill_meta_blanks(meta: &mut SessionMeta, payload: &Value) {
    if meta.cwd.is_none() {
        meta.cwd = probe::probe_cwd(payload);
    }
    if meta.repo_url.is_none() {
        meta.repo_url = str_field(payload, "repo_url");
    }
    if meta.git_branch.is_none() {
        meta.git_branch = str_field(payload, "git_branch");
    }
    if meta.git_commit.is_none() {
        meta.git_commit = str_field(payload, "git_commit");
    }
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn record_activity(turn_last_activity_ts: &mut HashMap<u32, i64>, turn: u32, ts: Option<i64>) {
    if let Some(t) = ts {
        turn_last_activity_ts
            .entry(turn)
            .and_modify(|existing| *existing = (*existing).max(t))
            .or_insert(t);
    }
}

/// Sums `(last_assistant_activity - user_message_start)` over turns where
/// both endpoints are present and the difference is non-negative. A turn
/// lacking either endpoint is simply skipped; if no turn ever had both, the
/// result is `None` rather than `Some(0)`.
fn compute_active_duration(
    turn_count: u32,
    turn_user_ts: &HashMap<u32, i64>,
    turn_last_activity_ts: &HashMap<u32, i64>,
) -> Option<i64> {
    let mut any_turn_had_both = false;
    let mut sum = 0i64;
    for turn in 1..=turn_count {
        if let (Some(&start), Some(&last)) = (turn_user_ts.get(&turn), turn_last_activity_ts.get(&turn)) {
            any_turn_had_both = true;
            let diff = last - start;
            if diff >= 0 {
                sum += diff;
            }
        }
    }
    any_turn_had_both.then_some(sum)
}

fn truncate_preview(content: &str) -> String {
    let trimmed = content.trim();
    let mut lines: Vec<&str> = trimmed.lines().take(PREVIEW_MAX_LINES).collect();
    let mut joined = lines.join("\n");
    if joined.chars().count() > PREVIEW_MAX_CHARS {
        joined = joined.chars().take(PREVIEW_MAX_CHARS).collect();
    }
    lines.clear();
    joined
}

/// Accepts an RFC3339 string or a bare number (seconds, or milliseconds if
/// the magnitude implies it) and returns milliseconds since epoch.
fn parse_timestamp(value: &Value) -> Option<i64> {
    if let Some(s) = value.as_str() {
        return DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.timestamp_millis());
    }
    if let Some(n) = value.as_i64() {
        return Some(if n.abs() > 10_000_000_000 { n } else { n * 1000 });
    }
    if let Some(f) = value.as_f64() {
        let n = f as i64;
        return Some(if n.abs() > 10_000_000_000 { n } else { (f * 1000.0) as i64 });
    }
    None
}
