#![forbid(unsafe_code)]

mod error;
mod requests;
mod types;

pub use error::StoreError;
pub use requests::*;
pub use types::*;

use dl_core::{
    ArtifactId, NodeId, SessionId, canonical_json, canonical_params, node_identity,
    normalize_parents,
};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const HISTORY_LIMIT_MIN: usize = 1;
pub const HISTORY_LIMIT_MAX: usize = 500;

const DB_FILENAME: &str = "dataline_meta.db";

/// Lineage graph store: the sole writer of Artifact/Node/SessionHead rows.
///
/// Concurrency correctness comes from idempotent identity-keyed writes, not
/// application locks: every insert on a hash-derived primary key is expressed
/// as "insert, and on identity conflict re-read", so a uniqueness violation
/// means "someone already did this" and the caller gets the existing row.
/// That makes every write safe to retry after a client timeout.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    storage_dir: PathBuf,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let db_path = storage_dir.join(DB_FILENAME);
        let conn = Connection::open(db_path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        install_schema(&conn)?;

        Ok(Self { conn, storage_dir })
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// Idempotent upsert-by-identity: if a row with this `artifact_id` exists
    /// it is returned unchanged (new descriptive fields ignored, since
    /// content-identical artifacts carry identical metadata) and the loser of
    /// a concurrent race observes the winner's row instead of erroring.
    pub fn insert_artifact(
        &mut self,
        request: InsertArtifactRequest,
    ) -> Result<ArtifactRow, StoreError> {
        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO artifacts(
              artifact_id, kind, format, location, size_bytes, row_count,
              column_count, created_at_ms, creating_session
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(artifact_id) DO NOTHING
            "#,
            params![
                request.artifact_id.as_str(),
                request.kind.as_str(),
                request.format.as_str(),
                request.location,
                request.size_bytes,
                request.row_count,
                request.column_count,
                now_ms,
                request.creating_session.as_str(),
            ],
        )?;
        let row = artifact_row_tx(&tx, request.artifact_id.as_str())?
            .ok_or(StoreError::UnknownArtifact)?;
        tx.commit()?;
        Ok(row)
    }

    /// Canonicalizes parents (dedupe + sort) and params (sorted keys), derives
    /// the node id from the logical tuple, then insert-or-read-back. Parents
    /// must pre-exist: the graph is an append-only DAG and no child may point
    /// at a node that was never recorded.
    pub fn insert_node(&mut self, request: InsertNodeRequest) -> Result<NodeRow, StoreError> {
        let parents = normalize_parents(&request.parent_node_ids);
        let params_json = canonical_params(&request.op_params)
            .map_err(|err| StoreError::InvalidInput(err.message()))?;
        let node_id = node_identity(
            &request.session_id,
            &parents,
            &request.op_type,
            &request.op_params,
        )
        .map_err(|err| StoreError::InvalidInput(err.message()))?;
        let parents_json = canonical_json(&Value::Array(
            parents
                .iter()
                .map(|parent| Value::String(parent.as_str().to_string()))
                .collect(),
        ));

        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        for parent in &parents {
            if !node_exists_tx(&tx, parent.as_str())? {
                return Err(StoreError::UnknownNode);
            }
        }
        tx.execute(
            r#"
            INSERT INTO nodes(
              node_id, session_id, op_type, op_params_json, parent_ids_json,
              primary_artifact_id, created_at_ms
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(node_id) DO NOTHING
            "#,
            params![
                node_id.as_str(),
                request.session_id.as_str(),
                request.op_type.as_str(),
                params_json,
                parents_json,
                request.primary_artifact_id.as_ref().map(|id| id.as_str()),
                now_ms,
            ],
        )?;
        let row = node_row_tx(&tx, node_id.as_str())?.ok_or(StoreError::UnknownNode)?;
        tx.commit()?;
        Ok(row)
    }

    pub fn get_node(&self, node_id: &NodeId) -> Result<Option<NodeRow>, StoreError> {
        Ok(self
            .conn
            .query_row(
                r#"
                SELECT node_id, session_id, op_type, op_params_json, parent_ids_json,
                       primary_artifact_id, created_at_ms
                FROM nodes
                WHERE node_id = ?1
                "#,
                params![node_id.as_str()],
                map_node_row,
            )
            .optional()?)
    }

    pub fn get_artifact(&self, artifact_id: &ArtifactId) -> Result<Option<ArtifactRow>, StoreError> {
        Ok(self
            .conn
            .query_row(
                r#"
                SELECT artifact_id, kind, format, location, size_bytes, row_count,
                       column_count, created_at_ms, creating_session
                FROM artifacts
                WHERE artifact_id = ?1
                "#,
                params![artifact_id.as_str()],
                map_artifact_row,
            )
            .optional()?)
    }

    /// Most recent first. Out-of-range limits are a validation error, never a
    /// silent clamp, so callers cannot accidentally page past intent.
    pub fn list_history(
        &self,
        session_id: &SessionId,
        limit: usize,
    ) -> Result<Vec<NodeRow>, StoreError> {
        if !(HISTORY_LIMIT_MIN..=HISTORY_LIMIT_MAX).contains(&limit) {
            return Err(StoreError::LimitOutOfRange {
                min: HISTORY_LIMIT_MIN,
                max: HISTORY_LIMIT_MAX,
                got: limit,
            });
        }
        let mut stmt = self.conn.prepare(
            r#"
            SELECT node_id, session_id, op_type, op_params_json, parent_ids_json,
                   primary_artifact_id, created_at_ms
            FROM nodes
            WHERE session_id = ?1
            ORDER BY created_at_ms DESC, rowid DESC
            LIMIT ?2
            "#,
        )?;
        let rows = stmt.query_map(params![session_id.as_str(), limit as i64], map_node_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// The most recently created node in the given session whose primary
    /// artifact matches. Session scoping is a hard invariant: artifact bytes
    /// are shared globally, but a provenance edge must never point at a node
    /// belonging to a different session.
    pub fn find_producing_node(
        &self,
        artifact_id: &ArtifactId,
        session_id: &SessionId,
    ) -> Result<Option<NodeRow>, StoreError> {
        Ok(self
            .conn
            .query_row(
                r#"
                SELECT node_id, session_id, op_type, op_params_json, parent_ids_json,
                       primary_artifact_id, created_at_ms
                FROM nodes
                WHERE session_id = ?1 AND primary_artifact_id = ?2
                ORDER BY created_at_ms DESC, rowid DESC
                LIMIT 1
                "#,
                params![session_id.as_str(), artifact_id.as_str()],
                map_node_row,
            )
            .optional()?)
    }

    /// Moves the session head to an existing node, creating the session row if
    /// absent. Last-writer-wins; a checkout to an unknown node fails and
    /// leaves the prior head untouched.
    pub fn checkout(
        &mut self,
        session_id: &SessionId,
        node_id: &NodeId,
    ) -> Result<SessionHeadRow, StoreError> {
        let now_ms = now_ms();
        let tx = self.conn.transaction()?;
        if !node_exists_tx(&tx, node_id.as_str())? {
            return Err(StoreError::UnknownNode);
        }
        tx.execute(
            r#"
            INSERT INTO session_heads(session_id, head_node_id, updated_at_ms)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(session_id) DO UPDATE SET
              head_node_id = excluded.head_node_id,
              updated_at_ms = excluded.updated_at_ms
            "#,
            params![session_id.as_str(), node_id.as_str(), now_ms],
        )?;
        tx.commit()?;
        Ok(SessionHeadRow {
            session_id: session_id.as_str().to_string(),
            head_node_id: Some(node_id.as_str().to_string()),
            updated_at_ms: now_ms,
        })
    }

    pub fn get_head(&self, session_id: &SessionId) -> Result<Option<String>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT head_node_id FROM session_heads WHERE session_id = ?1",
                params![session_id.as_str()],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?
            .flatten())
    }
}

fn install_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode=WAL;
        PRAGMA synchronous=NORMAL;
        PRAGMA foreign_keys=ON;

        CREATE TABLE IF NOT EXISTS artifacts (
          artifact_id TEXT PRIMARY KEY,
          kind TEXT NOT NULL,
          format TEXT NOT NULL,
          location TEXT NOT NULL,
          size_bytes INTEGER NOT NULL,
          row_count INTEGER NOT NULL,
          column_count INTEGER NOT NULL,
          created_at_ms INTEGER NOT NULL,
          creating_session TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS nodes (
          node_id TEXT PRIMARY KEY,
          session_id TEXT NOT NULL,
          op_type TEXT NOT NULL,
          op_params_json TEXT NOT NULL,
          parent_ids_json TEXT NOT NULL,
          primary_artifact_id TEXT,
          created_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS session_heads (
          session_id TEXT PRIMARY KEY,
          head_node_id TEXT,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_nodes_session_created
          ON nodes(session_id, created_at_ms);
        CREATE INDEX IF NOT EXISTS idx_nodes_session_artifact
          ON nodes(session_id, primary_artifact_id);
        "#,
    )?;
    Ok(())
}

fn now_ms() -> i64 {
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    now.as_millis() as i64
}

fn node_exists_tx(tx: &Transaction<'_>, node_id: &str) -> Result<bool, StoreError> {
    Ok(tx
        .query_row(
            "SELECT 1 FROM nodes WHERE node_id = ?1",
            params![node_id],
            |_| Ok(()),
        )
        .optional()?
        .is_some())
}

fn node_row_tx(tx: &Transaction<'_>, node_id: &str) -> Result<Option<NodeRow>, StoreError> {
    Ok(tx
        .query_row(
            r#"
            SELECT node_id, session_id, op_type, op_params_json, parent_ids_json,
                   primary_artifact_id, created_at_ms
            FROM nodes
            WHERE node_id = ?1
            "#,
            params![node_id],
            map_node_row,
        )
        .optional()?)
}

fn artifact_row_tx(tx: &Transaction<'_>, artifact_id: &str) -> Result<Option<ArtifactRow>, StoreError> {
    Ok(tx
        .query_row(
            r#"
            SELECT artifact_id, kind, format, location, size_bytes, row_count,
                   column_count, created_at_ms, creating_session
            FROM artifacts
            WHERE artifact_id = ?1
            "#,
            params![artifact_id],
            map_artifact_row,
        )
        .optional()?)
}

fn map_node_row(row: &rusqlite::Row<'_>) -> Result<NodeRow, rusqlite::Error> {
    Ok(NodeRow {
        node_id: row.get(0)?,
        session_id: row.get(1)?,
        op_type: row.get(2)?,
        op_params_json: row.get(3)?,
        parent_ids_json: row.get(4)?,
        primary_artifact_id: row.get(5)?,
        created_at_ms: row.get(6)?,
    })
}

fn map_artifact_row(row: &rusqlite::Row<'_>) -> Result<ArtifactRow, rusqlite::Error> {
    Ok(ArtifactRow {
        artifact_id: row.get(0)?,
        kind: row.get(1)?,
        format: row.get(2)?,
        location: row.get(3)?,
        size_bytes: row.get(4)?,
        row_count: row.get(5)?,
        column_count: row.get(6)?,
        created_at_ms: row.get(7)?,
        creating_session: row.get(8)?,
    })
}
