#![forbid(unsafe_code)]

use crate::config::ServiceConfig;
use crate::error::ServiceError;
use crate::history::{CheckoutOutcome, HistoryEntry, NodeDetail, ts_ms_to_rfc3339};
use dl_core::{ArtifactFormat, ArtifactId, ArtifactKind, NodeId, OpType, SessionId};
use dl_storage::{
    ArtifactRow, ContentStore, InsertArtifactRequest, InsertNodeRequest, NodeRow, SqliteStore,
    StoreError,
};
use serde_json::Value;
use std::path::PathBuf;

/// What an upload/query/plot producer hands over once its output file is
/// finished: the file itself, tags and stats describing it, the operation
/// that made it, and where it hangs in the graph (explicit parent, or a seed
/// artifact to infer it from, or neither for a root).
#[derive(Clone, Debug)]
pub struct RecordRequest {
    pub session_id: SessionId,
    pub temp_path: PathBuf,
    pub kind: ArtifactKind,
    pub format: ArtifactFormat,
    pub row_count: i64,
    pub column_count: i64,
    pub op_type: OpType,
    pub op_params: Value,
    pub explicit_parent: Option<NodeId>,
    pub seed_artifact_id: Option<ArtifactId>,
}

#[derive(Clone, Debug)]
pub struct Recorded {
    pub artifact: ArtifactRow,
    pub node: NodeRow,
}

#[derive(Clone, Debug)]
pub struct ResolvedArtifact {
    pub artifact_id: String,
    pub kind: String,
    pub format: String,
    pub path: PathBuf,
}

/// Facade over the content store and the lineage graph store, explicitly
/// constructed and injected rather than held as ambient global state.
#[derive(Debug)]
pub struct Provenance {
    content: ContentStore,
    meta: SqliteStore,
}

impl Provenance {
    pub fn open(config: &ServiceConfig) -> Result<Self, ServiceError> {
        Ok(Self {
            content: ContentStore::open(&config.artifacts_dir)?,
            meta: SqliteStore::open(&config.meta_dir)?,
        })
    }

    /// Single ingest path for every producer: store the bytes, record the
    /// artifact, resolve the parent set, record the node. Each step is
    /// idempotent on its identity key, so the whole call is safe to retry
    /// after a client timeout without creating phantom duplicates.
    pub fn record(&mut self, request: RecordRequest) -> Result<Recorded, ServiceError> {
        let (artifact_id, location) = self.content.put(&request.temp_path, &request.format)?;
        let size_bytes = std::fs::metadata(&location)?.len() as i64;

        let artifact = self.meta.insert_artifact(InsertArtifactRequest {
            artifact_id: artifact_id.clone(),
            kind: request.kind.clone(),
            format: request.format.clone(),
            location: location.to_string_lossy().into_owned(),
            size_bytes,
            row_count: request.row_count,
            column_count: request.column_count,
            creating_session: request.session_id.clone(),
        })?;

        let parent_node_ids = self.resolve_parents(&request)?;
        let node = self.meta.insert_node(InsertNodeRequest {
            session_id: request.session_id,
            op_type: request.op_type,
            op_params: request.op_params,
            parent_node_ids,
            primary_artifact_id: Some(artifact_id),
        })?;

        Ok(Recorded { artifact, node })
    }

    // Parent precedence: an explicitly supplied parent always wins; only when
    // absent do we fall back to the node that most recently produced the seed
    // artifact in this session; with neither, the node is a root.
    fn resolve_parents(&self, request: &RecordRequest) -> Result<Vec<NodeId>, ServiceError> {
        if let Some(parent) = &request.explicit_parent {
            return Ok(vec![parent.clone()]);
        }
        if let Some(seed) = &request.seed_artifact_id {
            if let Some(producer) = self.meta.find_producing_node(seed, &request.session_id)? {
                let parent = NodeId::try_new(producer.node_id)
                    .map_err(|err| StoreError::InvalidInput(err.message()))?;
                return Ok(vec![parent]);
            }
        }
        Ok(Vec::new())
    }

    pub fn node_detail(&self, node_id: &NodeId) -> Result<NodeDetail, ServiceError> {
        let row = self
            .meta
            .get_node(node_id)?
            .ok_or(StoreError::UnknownNode)?;
        Ok(NodeDetail::from_row(row))
    }

    pub fn history(
        &self,
        session_id: &SessionId,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, ServiceError> {
        let rows = self.meta.list_history(session_id, limit)?;
        Ok(rows.into_iter().map(HistoryEntry::from_row).collect())
    }

    pub fn checkout(
        &mut self,
        session_id: &SessionId,
        node_id: &NodeId,
    ) -> Result<CheckoutOutcome, ServiceError> {
        let head = self.meta.checkout(session_id, node_id)?;
        Ok(CheckoutOutcome {
            session_id: head.session_id,
            head_node_id: head.head_node_id.unwrap_or_default(),
            updated_at: ts_ms_to_rfc3339(head.updated_at_ms),
        })
    }

    pub fn head(&self, session_id: &SessionId) -> Result<Option<String>, ServiceError> {
        Ok(self.meta.get_head(session_id)?)
    }

    /// Resolves an artifact to its on-disk path for the download boundary.
    /// The containment check is independent of how the content store builds
    /// paths: whatever the row says, the resolved absolute path must be a
    /// descendant of the storage root.
    pub fn resolve_artifact(
        &self,
        artifact_id: &ArtifactId,
    ) -> Result<ResolvedArtifact, ServiceError> {
        let row = self
            .meta
            .get_artifact(artifact_id)?
            .ok_or(StoreError::UnknownArtifact)?;

        let path = PathBuf::from(&row.location);
        if !path.exists() {
            return Err(ServiceError::MissingOnDisk);
        }
        let resolved = std::fs::canonicalize(&path)?;
        let root = std::fs::canonicalize(self.content.root())?;
        if !resolved.starts_with(&root) {
            return Err(ServiceError::OutsideStorageRoot);
        }

        Ok(ResolvedArtifact {
            artifact_id: row.artifact_id,
            kind: row.kind,
            format: row.format,
            path: resolved,
        })
    }
}
