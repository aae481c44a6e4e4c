// crates/search/tests/ranking_test.rs
//! Integration tests for cross-session ranking, grouping, and intra-session
//! match localization (§8 properties 11-13, scenarios D and E), seeded
//! against an in-memory store.

use turnlog_core::types::{Message, Metrics, ParsedSession, Role, SessionMeta};
use turnlog_db::Database;
use turnlog_search::{facade, GroupSort, ResultSort, SearchInput};

fn parsed(cwd: Option<&str>, started_at: i64, bodies: &[(u32, &str)]) -> ParsedSession {
    let messages = bodies
        .iter()
        .map(|(turn, body)| Message::new(*turn, Role::User, body.to_string(), Some(started_at)))
        .collect();
    let turn_count = bodies.iter().map(|(t, _)| *t).max().unwrap_or(0);
    ParsedSession {
        messages,
        meta: SessionMeta { cwd: cwd.map(str::to_string), ..Default::default() },
        metrics: Metrics {
            started_at: Some(started_at),
            turn_count,
            message_count: bodies.len() as u32,
            ..Default::default()
        },
        warnings: vec![],
        content_hash: None,
    }
}

#[tokio::test]
async fn property_11_preamble_only_matches_yield_zero_groups() {
    let db = Database::new_in_memory().await.unwrap();
    let mut session = parsed(Some("/w"), 0, &[]);
    session.messages.push(Message::new(0, Role::Meta, "foo lives in the preamble".into(), None));
    db.replace_session("s1.jsonl", &session, None, 1, 1).await.unwrap();

    let input = SearchInput {
        query: "foo",
        workspace: None,
        limit: 20,
        result_sort: ResultSort::Relevance,
        group_sort: GroupSort::LastSeen,
        request_id: None,
    };
    let response = facade::search(&db, input).await.unwrap();
    assert!(response.groups.is_empty());
}

#[tokio::test]
async fn property_12_tie_break_orders_by_session_id_ascending() {
    let db = Database::new_in_memory().await.unwrap();
    let same_ts = 1_000;
    db.replace_session("b.jsonl", &parsed(Some("/w"), same_ts, &[(1, "foo")]), None, 1, 1).await.unwrap();
    db.replace_session("a.jsonl", &parsed(Some("/w"), same_ts, &[(1, "foo")]), None, 1, 1).await.unwrap();

    let input = SearchInput {
        query: "foo",
        workspace: None,
        limit: 20,
        result_sort: ResultSort::Relevance,
        group_sort: GroupSort::LastSeen,
        request_id: None,
    };
    let response = facade::search(&db, input).await.unwrap();
    let sessions = &response.groups[0].sessions;
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].path, "a.jsonl", "equal timestamp+score ties break on path ascending");
}

#[tokio::test]
async fn property_13_empty_cwd_groups_under_unknown_workspace() {
    let db = Database::new_in_memory().await.unwrap();
    db.replace_session("s1.jsonl", &parsed(None, 0, &[(1, "foo")]), None, 1, 1).await.unwrap();

    let input = SearchInput {
        query: "foo",
        workspace: None,
        limit: 20,
        result_sort: ResultSort::Relevance,
        group_sort: GroupSort::LastSeen,
        request_id: None,
    };
    let response = facade::search(&db, input).await.unwrap();
    assert_eq!(response.groups.len(), 1);
    assert_eq!(response.groups[0].cwd, None);
    assert_eq!(response.groups[0].label, "Unknown workspace");
}

#[tokio::test]
async fn scenario_d_search_ordering_by_result_sort() {
    let db = Database::new_in_memory().await.unwrap();
    // Session X: 5 matches across 3 turns, older timestamp.
    let x = parsed(
        Some("/w"),
        1_735_689_600_000, // 2025-01-01
        &[(1, "foo one"), (1, "foo two"), (2, "foo three"), (2, "foo four"), (3, "foo five")],
    );
    // Session Y: 2 matches across 2 turns, newer timestamp.
    let y = parsed(Some("/w"), 1_748_736_000_000 /* 2025-06-01 */, &[(1, "foo"), (2, "foo")]);
    db.replace_session("x.jsonl", &x, None, 1, 1).await.unwrap();
    db.replace_session("y.jsonl", &y, None, 1, 1).await.unwrap();

    async fn ordered_paths(db: &Database, sort: ResultSort) -> Vec<String> {
        let input = SearchInput {
            query: "foo",
            workspace: None,
            limit: 20,
            result_sort: sort,
            group_sort: GroupSort::LastSeen,
            request_id: None,
        };
        let response = facade::search(db, input).await.unwrap();
        response.groups.into_iter().flat_map(|g| g.sessions).map(|s| s.path).collect()
    }

    let by_matches = ordered_paths(&db, ResultSort::Matches).await;
    assert_eq!(by_matches, vec!["x.jsonl".to_string(), "y.jsonl".to_string()]);

    let by_recent = ordered_paths(&db, ResultSort::Recent).await;
    assert_eq!(by_recent, vec!["y.jsonl".to_string(), "x.jsonl".to_string()]);
}

#[tokio::test]
async fn scenario_e_session_matches_agrees_with_search_first_match_turn() {
    let db = Database::new_in_memory().await.unwrap();
    let session = parsed(Some("/w"), 0, &[(1, "unrelated"), (2, "unrelated"), (3, "foo here"), (4, "foo again")]);
    db.replace_session("s.jsonl", &session, None, 1, 1).await.unwrap();

    let input = SearchInput {
        query: "foo",
        workspace: None,
        limit: 20,
        result_sort: ResultSort::Relevance,
        group_sort: GroupSort::LastSeen,
        request_id: None,
    };
    let response = facade::search(&db, input).await.unwrap();
    let row = &response.groups[0].sessions[0];
    assert_eq!(row.first_match_turn_id, Some(3));

    let matches = facade::session_matches(&db, "s.jsonl", "foo").await.unwrap();
    assert_eq!(matches.turn_ids.first().copied(), Some(3));
}

#[tokio::test]
async fn intra_session_matches_dedup_and_sort_ascending() {
    let db = Database::new_in_memory().await.unwrap();
    let session = parsed(
        Some("/w"),
        0,
        &[(1, "foo"), (3, "foo"), (5, "foo"), (5, "foo"), (7, "foo")],
    );
    db.replace_session("s.jsonl", &session, None, 1, 1).await.unwrap();

    let matches = facade::session_matches(&db, "s.jsonl", "foo").await.unwrap();
    assert_eq!(matches.turn_ids, vec![1, 3, 5, 7]);
}

#[tokio::test]
async fn resolve_session_prefers_exact_session_id_over_path_substring() {
    let db = Database::new_in_memory().await.unwrap();
    let mut target = parsed(Some("/w"), 0, &[(1, "hi")]);
    target.meta.session_id = Some("abc-123".to_string());
    db.replace_session("dir/abc-123.jsonl", &target, Some("abc-123"), 1, 1).await.unwrap();
    db.replace_session("dir/other-abc-123-suffix.jsonl", &parsed(Some("/w"), 0, &[(1, "hi")]), None, 1, 1)
        .await
        .unwrap();

    let resolved = facade::resolve_session(&db, "abc-123", None).await.unwrap();
    assert_eq!(resolved.as_deref(), Some("dir/abc-123.jsonl"));
}

#[tokio::test]
async fn resolve_session_returns_none_when_nothing_matches() {
    let db = Database::new_in_memory().await.unwrap();
    let resolved = facade::resolve_session(&db, "nonexistent", None).await.unwrap();
    assert_eq!(resolved, None);
}
