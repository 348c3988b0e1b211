#![forbid(unsafe_code)]

use crate::ids::{NodeId, OpType, SessionId};
use serde_json::Value;
use sha2::Digest as _;
use std::collections::BTreeSet;
use std::fmt::Write as _;

// Canonicalization is the crux of identity: the write path and the hash
// computation must agree byte-for-byte on how parents and parameter maps are
// normalized, or logically identical operations submitted in different field
// orders would get different ids.

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CanonicalError {
    ParamsNotObject,
}

impl CanonicalError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::ParamsNotObject => "op params must be a JSON object",
        }
    }
}

/// Parents are semantically a set: drop duplicates, sort lexicographically.
pub fn normalize_parents(parents: &[NodeId]) -> Vec<NodeId> {
    parents
        .iter()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Serializes a JSON value with sorted object keys, `,`/`:` separators and no
/// whitespace. Arrays keep their order; scalars render in serde_json's default
/// representation.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(&mut out, value);
    out
}

/// Canonical encoding of an operation's parameters. Rejects non-object values
/// so every stored `op_params` decodes back to a key-value map.
pub fn canonical_params(params: &Value) -> Result<String, CanonicalError> {
    if !params.is_object() {
        return Err(CanonicalError::ParamsNotObject);
    }
    Ok(canonical_json(params))
}

fn write_canonical(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(number) => {
            let _ = write!(out, "{number}");
        }
        Value::String(text) => write_json_string(out, text),
        Value::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_canonical(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (index, key) in keys.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_json_string(out, key);
                out.push(':');
                if let Some(item) = map.get(*key) {
                    write_canonical(out, item);
                }
            }
            out.push('}');
        }
    }
}

fn write_json_string(out: &mut String, value: &str) {
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = sha2::Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for b in digest {
        let _ = write!(&mut out, "{b:02x}");
    }
    out
}

/// Deterministic node identity: SHA-256 of the canonical JSON of
/// `{"o": params, "p": parents, "s": session, "t": op_type}`. The session id
/// participates so identical operations in different sessions do not collide.
pub fn node_identity(
    session_id: &SessionId,
    parent_node_ids: &[NodeId],
    op_type: &OpType,
    op_params: &Value,
) -> Result<NodeId, CanonicalError> {
    let params_json = canonical_params(op_params)?;
    let parents = normalize_parents(parent_node_ids);

    let mut payload = String::new();
    payload.push_str("{\"o\":");
    payload.push_str(&params_json);
    payload.push_str(",\"p\":[");
    for (index, parent) in parents.iter().enumerate() {
        if index > 0 {
            payload.push(',');
        }
        write_json_string(&mut payload, parent.as_str());
    }
    payload.push_str("],\"s\":");
    write_json_string(&mut payload, session_id.as_str());
    payload.push_str(",\"t\":");
    write_json_string(&mut payload, op_type.as_str());
    payload.push('}');

    Ok(NodeId::from_digest(sha256_hex(payload.as_bytes())))
}
