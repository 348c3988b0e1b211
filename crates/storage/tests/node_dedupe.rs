#![forbid(unsafe_code)]

use dl_core::{ArtifactFormat, ArtifactId, ArtifactKind, NodeId, OpType, SessionId, sha256_hex};
use dl_storage::{InsertArtifactRequest, InsertNodeRequest, SqliteStore, StoreError};
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

fn artifact_id(seed: &str) -> ArtifactId {
    ArtifactId::try_new(sha256_hex(seed.as_bytes())).expect("artifact id")
}

fn artifact_request(seed: &str, session: &SessionId) -> InsertArtifactRequest {
    InsertArtifactRequest {
        artifact_id: artifact_id(seed),
        kind: ArtifactKind::try_new("table").expect("kind"),
        format: ArtifactFormat::try_new("parquet").expect("format"),
        location: format!("/data/artifacts/{seed}.parquet"),
        size_bytes: 1024,
        row_count: 10,
        column_count: 3,
        creating_session: session.clone(),
    }
}

#[test]
fn artifact_insert_is_idempotent_and_keeps_the_original_row() {
    let dir = temp_dir("artifact_insert_is_idempotent");
    let mut store = SqliteStore::open(&dir).expect("open store");
    let session = SessionId::try_new("sess-a").expect("session id");

    let first = store
        .insert_artifact(artifact_request("seed", &session))
        .expect("first insert");

    // Retry with divergent descriptive fields and a different session: the
    // original row wins, unchanged.
    let mut retry = artifact_request("seed", &session);
    retry.size_bytes = 9999;
    retry.row_count = 1;
    retry.creating_session = SessionId::try_new("sess-b").expect("session id");
    let second = store.insert_artifact(retry).expect("retried insert");

    assert_eq!(first, second);
    assert_eq!(second.size_bytes, 1024);
    assert_eq!(second.creating_session, "sess-a");
    assert_eq!(second.created_at_ms, first.created_at_ms);
}

#[test]
fn node_insert_deduplicates_logically_identical_work() {
    let dir = temp_dir("node_insert_deduplicates");
    let mut store = SqliteStore::open(&dir).expect("open store");
    let session = SessionId::try_new("sess-a").expect("session id");
    let upload_artifact = store
        .insert_artifact(artifact_request("upload", &session))
        .expect("insert artifact");

    let root = store
        .insert_node(InsertNodeRequest {
            session_id: session.clone(),
            op_type: OpType::try_new("upload").expect("op type"),
            op_params: json!({"filename": "sales.csv"}),
            parent_node_ids: Vec::new(),
            primary_artifact_id: Some(artifact_id("upload")),
        })
        .expect("insert root node");
    assert_eq!(root.parent_ids(), Vec::<String>::new());
    assert_eq!(
        root.primary_artifact_id.as_deref(),
        Some(upload_artifact.artifact_id.as_str())
    );

    let parent = NodeId::try_new(root.node_id.clone()).expect("node id");
    let query = store
        .insert_node(InsertNodeRequest {
            session_id: session.clone(),
            op_type: OpType::try_new("sql").expect("op type"),
            op_params: json!({"sql": "SELECT 1", "limit": 20}),
            parent_node_ids: vec![parent.clone(), parent.clone()],
            primary_artifact_id: Some(artifact_id("query-out")),
        })
        .expect("insert query node");
    assert_eq!(query.parent_ids(), vec![root.node_id.clone()]);

    // Same logical tuple, permuted params and duplicated parents.
    let retried = store
        .insert_node(InsertNodeRequest {
            session_id: session.clone(),
            op_type: OpType::try_new("sql").expect("op type"),
            op_params: json!({"limit": 20, "sql": "SELECT 1"}),
            parent_node_ids: vec![parent.clone()],
            primary_artifact_id: Some(artifact_id("query-out")),
        })
        .expect("retried insert");

    assert_eq!(retried, query, "retry must return the existing row unchanged");
    assert_eq!(store.list_history(&session, 10).expect("history").len(), 2);
}

#[test]
fn node_ids_differ_across_sessions_for_the_same_operation() {
    let dir = temp_dir("node_ids_differ_across_sessions");
    let mut store = SqliteStore::open(&dir).expect("open store");
    let session_a = SessionId::try_new("sess-a").expect("session id");
    let session_b = SessionId::try_new("sess-b").expect("session id");

    let make = |session: &SessionId| InsertNodeRequest {
        session_id: session.clone(),
        op_type: OpType::try_new("upload").expect("op type"),
        op_params: json!({"filename": "same.csv"}),
        parent_node_ids: Vec::new(),
        primary_artifact_id: None,
    };

    let in_a = store.insert_node(make(&session_a)).expect("insert in a");
    let in_b = store.insert_node(make(&session_b)).expect("insert in b");
    assert_ne!(in_a.node_id, in_b.node_id);
}

#[test]
fn node_insert_rejects_unknown_parents() {
    let dir = temp_dir("node_insert_rejects_unknown_parents");
    let mut store = SqliteStore::open(&dir).expect("open store");
    let session = SessionId::try_new("sess-a").expect("session id");

    let phantom = NodeId::try_new(sha256_hex(b"never inserted")).expect("node id");
    let err = store
        .insert_node(InsertNodeRequest {
            session_id: session.clone(),
            op_type: OpType::try_new("sql").expect("op type"),
            op_params: json!({"sql": "SELECT 1"}),
            parent_node_ids: vec![phantom],
            primary_artifact_id: None,
        })
        .expect_err("parent must pre-exist");
    assert!(matches!(err, StoreError::UnknownNode), "got {err:?}");
    assert!(store.list_history(&session, 10).expect("history").is_empty());
}

#[test]
fn node_insert_rejects_non_object_params() {
    let dir = temp_dir("node_insert_rejects_non_object_params");
    let mut store = SqliteStore::open(&dir).expect("open store");
    let session = SessionId::try_new("sess-a").expect("session id");

    let err = store
        .insert_node(InsertNodeRequest {
            session_id: session,
            op_type: OpType::try_new("sql").expect("op type"),
            op_params: json!(["not", "a", "map"]),
            parent_node_ids: Vec::new(),
            primary_artifact_id: None,
        })
        .expect_err("params must be an object");
    assert!(matches!(err, StoreError::InvalidInput(_)), "got {err:?}");
}

#[test]
fn stored_canonical_encodings_are_key_sorted() {
    let dir = temp_dir("stored_canonical_encodings_are_key_sorted");
    let mut store = SqliteStore::open(&dir).expect("open store");
    let session = SessionId::try_new("sess-a").expect("session id");

    let node = store
        .insert_node(InsertNodeRequest {
            session_id: session,
            op_type: OpType::try_new("plot").expect("op type"),
            op_params: json!({"y": "amount", "x": "month", "kind": "bar"}),
            parent_node_ids: Vec::new(),
            primary_artifact_id: None,
        })
        .expect("insert node");
    assert_eq!(
        node.op_params_json,
        r#"{"kind":"bar","x":"month","y":"amount"}"#
    );
    assert_eq!(node.parent_ids_json, "[]");
}
