//! Property-based tests for turn-grouping and ordering invariants (§8
//! properties 1-3): an `arbitrary`-derived small event-sequence generator,
//! driven through `proptest`, exercised against the real parser and an
//! independent oracle.

use arbitrary::{Arbitrary, Unstructured};
use proptest::prelude::*;
use std::collections::HashMap;
use std::io::Write;
use tempfile::NamedTempFile;
use turnlog_core::types::Role;
use turnlog_session_parser::parse_session;

#[derive(Debug, Clone, Arbitrary)]
enum EventKind {
    User,
    Agent,
    Thought,
    ToolCall,
    ToolOutput,
}

#[derive(Debug, Clone, Arbitrary)]
struct TestEvent {
    kind: EventKind,
    /// A small timestamp (seconds); `None` means the line carries none.
    ts: Option<u16>,
}

fn event_sequences() -> impl Strategy<Value = Vec<TestEvent>> {
    prop::collection::vec(any::<u8>(), 0..512).prop_filter_map("arbitrary decode", |bytes| {
        let mut u = Unstructured::new(&bytes);
        Vec::<TestEvent>::arbitrary(&mut u).ok()
    })
}

fn to_jsonl(events: &[TestEvent]) -> String {
    events
        .iter()
        .map(|e| match e.kind {
            EventKind::ToolCall | EventKind::ToolOutput => {
                let event_type = if matches!(e.kind, EventKind::ToolCall) { "function_call" } else { "function_call_output" };
                match e.ts {
                    Some(ts) => format!(r#"{{"type":"{event_type}","timestamp":{ts},"name":"x"}}"#),
                    None => format!(r#"{{"type":"{event_type}","name":"x"}}"#),
                }
            }
            _ => {
                let payload_type = match e.kind {
                    EventKind::User => "user_message",
                    EventKind::Agent => "agent_message",
                    EventKind::Thought => "agent_reasoning",
                    _ => unreachable!(),
                };
                match e.ts {
                    Some(ts) => format!(
                        r#"{{"type":"event_msg","timestamp":{ts},"payload":{{"type":"{payload_type}","message":"m"}}}}"#
                    ),
                    None => format!(r#"{{"type":"event_msg","payload":{{"type":"{payload_type}","message":"m"}}}}"#),
                }
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Independent reimplementation of §4.1's active-duration formula, computed
/// directly against the raw (pre-millisecond-scaling) timestamps rather
/// than sharing any code with the parser's own accumulator.
fn oracle_active_duration_ms(events: &[TestEvent]) -> Option<i64> {
    let mut turn = 0u32;
    let mut user_ts: HashMap<u32, i64> = HashMap::new();
    let mut last_activity: HashMap<u32, i64> = HashMap::new();

    for e in events {
        match e.kind {
            EventKind::User => {
                turn += 1;
                if let Some(ts) = e.ts {
                    user_ts.entry(turn).or_insert(ts as i64);
                }
            }
            EventKind::Agent | EventKind::Thought | EventKind::ToolCall | EventKind::ToolOutput => {
                if let Some(ts) = e.ts {
                    let entry = last_activity.entry(turn).or_insert(ts as i64);
                    *entry = (*entry).max(ts as i64);
                }
            }
        }
    }

    let mut any_turn_had_both = false;
    let mut sum = 0i64;
    for t in 1..=turn {
        if let (Some(&start), Some(&last)) = (user_ts.get(&t), last_activity.get(&t)) {
            any_turn_had_both = true;
            let diff = last - start;
            if diff >= 0 {
                sum += diff;
            }
        }
    }
    // The parser stores timestamps in milliseconds; these raw values stand
    // in for seconds, so the comparable unit is the oracle sum scaled by 1000.
    any_turn_had_both.then_some(sum * 1000)
}

async fn parse(jsonl: &str) -> turnlog_core::types::ParsedSession {
    let mut file = NamedTempFile::new().expect("create temp file");
    write!(file, "{jsonl}").expect("write temp file");
    parse_session(file.path()).await.expect("parse_session should not error on well-formed lines")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn property_1_turn_ids_contiguous_from_one(events in event_sequences()) {
        let jsonl = to_jsonl(&events);
        let session = tokio_test::block_on(parse(&jsonl));

        let expected_turns = events.iter().filter(|e| matches!(e.kind, EventKind::User)).count() as u32;
        prop_assert_eq!(session.metrics.turn_count, expected_turns);

        let mut turn_ids: Vec<u32> = session.messages.iter().map(|m| m.turn_id).filter(|&t| t > 0).collect();
        turn_ids.dedup();
        let expected: Vec<u32> = (1..=expected_turns).collect();
        prop_assert_eq!(turn_ids, expected);

        if let Some(idx) = session.messages.iter().position(|m| m.role == Role::User) {
            prop_assert!(session.messages[..idx].iter().all(|m| m.turn_id == 0));
        } else {
            prop_assert!(session.messages.iter().all(|m| m.turn_id == 0));
        }
    }

    #[test]
    fn property_2_message_order_matches_file_order(events in event_sequences()) {
        let jsonl = to_jsonl(&events);
        let session = tokio_test::block_on(parse(&jsonl));

        let expected_roles: Vec<Role> = events
            .iter()
            .map(|e| match e.kind {
                EventKind::User => Role::User,
                EventKind::Agent => Role::Assistant,
                EventKind::Thought => Role::Thought,
                EventKind::ToolCall => Role::ToolCall,
                EventKind::ToolOutput => Role::ToolOutput,
            })
            .collect();
        let actual_roles: Vec<Role> = session.messages.iter().map(|m| m.role).collect();
        prop_assert_eq!(actual_roles, expected_roles);
    }

    #[test]
    fn property_3_active_duration_matches_independent_oracle(events in event_sequences()) {
        let jsonl = to_jsonl(&events);
        let session = tokio_test::block_on(parse(&jsonl));

        prop_assert_eq!(session.metrics.active_duration_ms, oracle_active_duration_ms(&events));
    }
}
