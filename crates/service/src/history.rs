#![forbid(unsafe_code)]

use dl_storage::NodeRow;
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// One node rendered for display: canonical encodings decoded back into
/// structured form, timestamp in RFC 3339.
#[derive(Clone, Debug, Serialize)]
pub struct HistoryEntry {
    pub node_id: String,
    pub op_type: String,
    pub op_params: Value,
    pub parent_node_ids: Vec<String>,
    pub primary_artifact_id: Option<String>,
    pub created_at_ms: i64,
    pub created_at: String,
}

impl HistoryEntry {
    pub(crate) fn from_row(row: NodeRow) -> Self {
        Self {
            op_params: decode_params(&row.op_params_json),
            parent_node_ids: row.parent_ids(),
            created_at: ts_ms_to_rfc3339(row.created_at_ms),
            node_id: row.node_id,
            op_type: row.op_type,
            primary_artifact_id: row.primary_artifact_id,
            created_at_ms: row.created_at_ms,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct NodeDetail {
    pub node_id: String,
    pub session_id: String,
    pub op_type: String,
    pub op_params: Value,
    pub parent_node_ids: Vec<String>,
    pub primary_artifact_id: Option<String>,
    pub created_at_ms: i64,
    pub created_at: String,
}

impl NodeDetail {
    pub(crate) fn from_row(row: NodeRow) -> Self {
        Self {
            op_params: decode_params(&row.op_params_json),
            parent_node_ids: row.parent_ids(),
            created_at: ts_ms_to_rfc3339(row.created_at_ms),
            node_id: row.node_id,
            session_id: row.session_id,
            op_type: row.op_type,
            primary_artifact_id: row.primary_artifact_id,
            created_at_ms: row.created_at_ms,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CheckoutOutcome {
    pub session_id: String,
    pub head_node_id: String,
    pub updated_at: String,
}

fn decode_params(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::Object(serde_json::Map::new()))
}

pub(crate) fn ts_ms_to_rfc3339(ts_ms: i64) -> String {
    let nanos = (ts_ms as i128) * 1_000_000i128;
    let dt = OffsetDateTime::from_unix_timestamp_nanos(nanos).unwrap_or(OffsetDateTime::UNIX_EPOCH);
    dt.format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}
