#![forbid(unsafe_code)]

/// A stored output's metadata. `artifact_id` is a pure function of the file's
/// bytes; content-identical artifacts are shared globally across sessions and
/// `creating_session` is informational only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArtifactRow {
    pub artifact_id: String,
    pub kind: String,
    pub format: String,
    pub location: String,
    pub size_bytes: i64,
    pub row_count: i64,
    pub column_count: i64,
    pub created_at_ms: i64,
    pub creating_session: String,
}

/// One immutable operation in the provenance graph. `op_params_json` and
/// `parent_ids_json` hold the canonical encodings that fed the node hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeRow {
    pub node_id: String,
    pub session_id: String,
    pub op_type: String,
    pub op_params_json: String,
    pub parent_ids_json: String,
    pub primary_artifact_id: Option<String>,
    pub created_at_ms: i64,
}

impl NodeRow {
    pub fn parent_ids(&self) -> Vec<String> {
        serde_json::from_str(&self.parent_ids_json).unwrap_or_default()
    }
}

/// The movable per-session pointer into the node graph. Not itself part of
/// the DAG; mutated only by an explicit checkout, last-writer-wins.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionHeadRow {
    pub session_id: String,
    pub head_node_id: Option<String>,
    pub updated_at_ms: i64,
}
