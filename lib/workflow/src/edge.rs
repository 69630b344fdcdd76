//! Edges between workflow nodes.
//!
//! An edge is an opaque source/target pair as far as this crate is
//! concerned. Presentation fields set by the canvas (`animated`, `style`,
//! `label`, ...) are carried in `extra` and written back untouched.

use jobdesk_core::{EdgeId, NodeId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A directed connection from one node to another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    /// Output handle on the source node, if the canvas uses named handles.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    /// Input handle on the target node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    /// Canvas-only fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Edge {
    /// Creates a plain edge between two nodes.
    #[must_use]
    pub fn new(id: EdgeId, source: NodeId, target: NodeId) -> Self {
        Self {
            id,
            source,
            target,
            source_handle: None,
            target_handle: None,
            extra: Map::new(),
        }
    }

    /// Whether either endpoint is `node_id`.
    #[must_use]
    pub fn touches(&self, node_id: &NodeId) -> bool {
        &self.source == node_id || &self.target == node_id
    }
}
