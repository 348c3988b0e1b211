#![forbid(unsafe_code)]

use dl_core::{NodeId, OpType, SessionId, sha256_hex};
use dl_storage::{HISTORY_LIMIT_MAX, InsertNodeRequest, SqliteStore, StoreError};
use serde_json::json;
use std::path::PathBuf;

fn temp_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = base.join(format!("dl_storage_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn insert_step(store: &mut SqliteStore, session: &SessionId, step: u32) -> String {
    store
        .insert_node(InsertNodeRequest {
            session_id: session.clone(),
            op_type: OpType::try_new("sql").expect("op type"),
            op_params: json!({"sql": format!("SELECT {step}")}),
            parent_node_ids: Vec::new(),
            primary_artifact_id: None,
        })
        .expect("insert node")
        .node_id
}

#[test]
fn history_returns_most_recent_first_within_the_limit() {
    let dir = temp_dir("history_returns_most_recent_first");
    let mut store = SqliteStore::open(&dir).expect("open store");
    let session = SessionId::try_new("sess-a").expect("session id");

    let ids: Vec<String> = (0..5).map(|step| insert_step(&mut store, &session, step)).collect();

    let recent = store.list_history(&session, 3).expect("history");
    assert_eq!(recent.len(), 3);
    let got: Vec<&str> = recent.iter().map(|node| node.node_id.as_str()).collect();
    assert_eq!(got, vec![ids[4].as_str(), ids[3].as_str(), ids[2].as_str()]);
}

#[test]
fn history_limit_bounds_are_validated_not_clamped() {
    let dir = temp_dir("history_limit_bounds_are_validated");
    let store = SqliteStore::open(&dir).expect("open store");
    let session = SessionId::try_new("sess-a").expect("session id");

    let too_small = store.list_history(&session, 0).expect_err("limit 0");
    assert!(
        matches!(too_small, StoreError::LimitOutOfRange { got: 0, .. }),
        "got {too_small:?}"
    );

    let too_large = store.list_history(&session, 10_000).expect_err("limit 10000");
    assert!(
        matches!(too_large, StoreError::LimitOutOfRange { got: 10_000, .. }),
        "got {too_large:?}"
    );

    assert!(store.list_history(&session, HISTORY_LIMIT_MAX).is_ok());
}

#[test]
fn checkout_moves_the_head_last_writer_wins() {
    let dir = temp_dir("checkout_moves_the_head");
    let mut store = SqliteStore::open(&dir).expect("open store");
    let session = SessionId::try_new("sess-a").expect("session id");

    assert_eq!(store.get_head(&session).expect("head"), None);

    let first = insert_step(&mut store, &session, 1);
    let second = insert_step(&mut store, &session, 2);
    let first_id = NodeId::try_new(first.clone()).expect("node id");
    let second_id = NodeId::try_new(second.clone()).expect("node id");

    let head = store.checkout(&session, &second_id).expect("checkout");
    assert_eq!(head.head_node_id.as_deref(), Some(second.as_str()));
    assert_eq!(store.get_head(&session).expect("head").as_deref(), Some(second.as_str()));

    // Rewind to the earlier node: a plain pointer move, no branch semantics.
    store.checkout(&session, &first_id).expect("checkout back");
    assert_eq!(store.get_head(&session).expect("head").as_deref(), Some(first.as_str()));
}

#[test]
fn checkout_to_an_unknown_node_leaves_the_head_unchanged() {
    let dir = temp_dir("checkout_to_an_unknown_node");
    let mut store = SqliteStore::open(&dir).expect("open store");
    let session = SessionId::try_new("sess-a").expect("session id");

    let existing = insert_step(&mut store, &session, 1);
    let existing_id = NodeId::try_new(existing.clone()).expect("node id");
    store.checkout(&session, &existing_id).expect("checkout");

    let phantom = NodeId::try_new(sha256_hex(b"no such node")).expect("node id");
    let err = store.checkout(&session, &phantom).expect_err("unknown node");
    assert!(matches!(err, StoreError::UnknownNode), "got {err:?}");
    assert_eq!(
        store.get_head(&session).expect("head").as_deref(),
        Some(existing.as_str()),
        "failed checkout must not move the head"
    );
}
