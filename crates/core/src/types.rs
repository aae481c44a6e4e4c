// crates/core/src/types.rs
use serde::{Deserialize, Serialize};

/// Custom serializer to convert Unix timestamp (milliseconds) to ISO 8601 string.
pub mod unix_millis_to_iso {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(timestamp: &i64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let dt = DateTime::<Utc>::from_timestamp_millis(*timestamp)
            .unwrap_or_else(|| DateTime::<Utc>::from_timestamp(0, 0).unwrap());
        serializer.serialize_str(&dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum StringOrNumber {
            String(String),
            Number(i64),
        }

        match StringOrNumber::deserialize(deserializer)? {
            StringOrNumber::Number(n) => Ok(n),
            StringOrNumber::String(s) => DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.timestamp_millis())
                .map_err(serde::de::Error::custom),
        }
    }
}

/// Same as [`unix_millis_to_iso`] but for the common case of a timestamp
/// that may be absent (a session with no parseable timestamp anywhere).
pub mod unix_millis_to_iso_opt {
    use super::unix_millis_to_iso;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(timestamp: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        #[derive(Serialize)]
        #[serde(transparent)]
        struct Wrapper(#[serde(with = "unix_millis_to_iso")] i64);

        timestamp.map(Wrapper).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(transparent)]
        struct Wrapper(#[serde(with = "unix_millis_to_iso")] i64);

        Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|w| w.0))
    }
}

/// The role a message plays within a turn. Ordered roughly by where each
/// shows up in §4.1's event taxonomy: `user_message` -> User, `agent_message`
/// -> Assistant, `agent_reasoning` -> Thought, the two `*_call` response-item
/// shapes -> ToolCall/ToolOutput, `session_meta`/`turn_context` -> Meta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    Thought,
    ToolCall,
    ToolOutput,
    Meta,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Thought => "thought",
            Role::ToolCall => "tool_call",
            Role::ToolOutput => "tool_output",
            Role::Meta => "meta",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            "thought" => Some(Role::Thought),
            "tool_call" => Some(Role::ToolCall),
            "tool_output" => Some(Role::ToolOutput),
            "meta" => Some(Role::Meta),
            _ => None,
        }
    }
}

/// One emitted event, already assigned to a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub turn_id: u32,
    pub role: Role,
    pub content: String,
    /// Milliseconds since epoch, when the source line carried a parseable timestamp.
    pub timestamp: Option<i64>,
}

impl Message {
    pub fn new(turn_id: u32, role: Role, content: impl Into<String>, timestamp: Option<i64>) -> Self {
        Self {
            turn_id,
            role,
            content: content.into(),
            timestamp,
        }
    }
}

/// Workspace/git metadata harvested from `session_meta` events, plus the
/// canonical id (filename-derived, falling back to a content-embedded one).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMeta {
    pub session_id: Option<String>,
    pub cwd: Option<String>,
    pub repo_url: Option<String>,
    pub git_branch: Option<String>,
    pub git_commit: Option<String>,
    /// The first `user_message`'s body, trimmed, truncated to 1000 chars / 50 lines.
    pub preview: Option<String>,
}

/// Derived, aggregate metrics for one session. See §4.1 "Metrics computation".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub started_at: Option<i64>,
    pub ended_at: Option<i64>,
    pub turn_count: u32,
    pub message_count: u32,
    pub thought_count: u32,
    pub tool_call_count: u32,
    pub meta_count: u32,
    pub token_count_count: u32,
    pub active_duration_ms: Option<i64>,
}

/// The full result of parsing one session file: ordered messages (including
/// preamble, `turn_id = 0`), best-available metadata, derived metrics, and
/// the BLAKE3 digest of the raw bytes read. `warnings` never causes parsing
/// to fail (see §7's `parse_warning` kind) — it is purely informational.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedSession {
    pub messages: Vec<Message>,
    pub meta: SessionMeta,
    pub metrics: Metrics,
    pub warnings: Vec<String>,
    pub content_hash: Option<String>,
}

impl ParsedSession {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Messages belonging to real turns, excluding preamble (`turn_id = 0`).
    pub fn conversational_messages(&self) -> impl Iterator<Item = &Message> {
        self.messages.iter().filter(|m| m.turn_id > 0)
    }
}

/// A session row as surfaced to callers (§6), without raw message content.
/// This is the leaf shape nested into the year/month/day session tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub path: String,
    pub session_id: Option<String>,
    pub cwd: Option<String>,
    pub git_branch: Option<String>,
    #[serde(with = "unix_millis_to_iso_opt")]
    pub started_at: Option<i64>,
    pub preview: Option<String>,
    pub turn_count: i64,
    pub message_count: i64,
    pub active_duration_ms: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&Role::ToolCall).unwrap(), "\"tool_call\"");
    }

    #[test]
    fn test_role_as_str_roundtrips_through_parse() {
        for role in [Role::User, Role::Assistant, Role::Thought, Role::ToolCall, Role::ToolOutput, Role::Meta] {
            assert_eq!(Role::parse(role.as_str()), Some(role));
        }
    }

    #[test]
    fn test_message_new() {
        let m = Message::new(1, Role::User, "hi", Some(1000));
        assert_eq!(m.turn_id, 1);
        assert_eq!(m.content, "hi");
        assert_eq!(m.timestamp, Some(1000));
    }

    #[test]
    fn test_parsed_session_conversational_messages_excludes_preamble() {
        let session = ParsedSession {
            messages: vec![
                Message::new(0, Role::Meta, "meta", None),
                Message::new(1, Role::User, "hello", None),
                Message::new(1, Role::Assistant, "hi", None),
            ],
            ..Default::default()
        };
        let convo: Vec<_> = session.conversational_messages().collect();
        assert_eq!(convo.len(), 2);
        assert_eq!(convo[0].role, Role::User);
    }

    #[test]
    fn test_parsed_session_empty() {
        let session = ParsedSession::default();
        assert!(session.is_empty());
    }

    #[test]
    fn test_session_summary_started_at_serializes_as_iso_string() {
        let summary = SessionSummary {
            path: "2026/01/27/a.jsonl".to_string(),
            session_id: Some("sid".to_string()),
            cwd: None,
            git_branch: None,
            started_at: Some(1769482232000),
            preview: None,
            turn_count: 1,
            message_count: 2,
            active_duration_ms: Some(500),
        };
        let json = serde_json::to_string(&summary).unwrap();
        assert!(
            json.contains("\"startedAt\":\"2026-"),
            "startedAt should be ISO string, got: {}",
            json
        );
    }

    #[test]
    fn test_session_summary_started_at_absent_serializes_as_null() {
        let summary = SessionSummary {
            path: "loose.jsonl".to_string(),
            session_id: None,
            cwd: None,
            git_branch: None,
            started_at: None,
            preview: None,
            turn_count: 0,
            message_count: 0,
            active_duration_ms: None,
        };
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"startedAt\":null"));
    }

    #[test]
    fn test_unix_millis_to_iso_roundtrip_via_number() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper(#[serde(with = "unix_millis_to_iso")] i64);
        let original = 1700000000123i64;
        let json = serde_json::to_string(&Wrapper(original)).unwrap();
        let parsed: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.0, original);
    }
}
