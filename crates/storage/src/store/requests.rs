#![forbid(unsafe_code)]

use dl_core::{ArtifactFormat, ArtifactId, ArtifactKind, NodeId, OpType, SessionId};
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InsertArtifactRequest {
    pub artifact_id: ArtifactId,
    pub kind: ArtifactKind,
    pub format: ArtifactFormat,
    pub location: String,
    pub size_bytes: i64,
    pub row_count: i64,
    pub column_count: i64,
    pub creating_session: SessionId,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InsertNodeRequest {
    pub session_id: SessionId,
    pub op_type: OpType,
    pub op_params: Value,
    pub parent_node_ids: Vec<NodeId>,
    pub primary_artifact_id: Option<ArtifactId>,
}
