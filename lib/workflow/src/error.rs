//! Error types for the workflow crate.
//!
//! Errors are layered:
//! - `NodeError`: construction or reconstruction of a single node
//! - `GraphError`: node/edge bookkeeping inside one workflow
//! - `WorkflowError`: whole-record and lifecycle failures, handed to callers
//!   wrapped in a rootcause `Report`
//!
//! Node errors never abort a workflow load; they are collected into a
//! [`LoadReport`](crate::definition::LoadReport) next to the loaded workflow.

use jobdesk_core::{EdgeId, NodeId};
use std::fmt;

/// Errors from building, duplicating or decoding one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeError {
    /// The discriminant is outside the closed set of node variants.
    UnsupportedVariant { variant: String },
    /// The record declares a known variant but a field is missing or unusable.
    MalformedRecord {
        node_id: Option<String>,
        variant: String,
        field: &'static str,
        reason: String,
    },
    /// The record's `kind`/`taskType` pair is not one this build understands.
    UnknownPersistedVariant {
        node_id: Option<String>,
        kind: String,
        task_type: Option<String>,
    },
}

impl NodeError {
    /// Returns the id of the offending node, when the record carried one.
    #[must_use]
    pub fn node_id(&self) -> Option<&str> {
        match self {
            Self::UnsupportedVariant { .. } => None,
            Self::MalformedRecord { node_id, .. }
            | Self::UnknownPersistedVariant { node_id, .. } => node_id.as_deref(),
        }
    }
}

impl fmt::Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedVariant { variant } => {
                write!(f, "unsupported node variant '{variant}'")
            }
            Self::MalformedRecord {
                node_id,
                variant,
                field,
                reason,
            } => {
                let node = node_id.as_deref().unwrap_or("<no id>");
                write!(
                    f,
                    "malformed {variant} node {node}: field '{field}' {reason}"
                )
            }
            Self::UnknownPersistedVariant {
                node_id,
                kind,
                task_type,
            } => {
                let node = node_id.as_deref().unwrap_or("<no id>");
                match task_type {
                    Some(task_type) => write!(
                        f,
                        "node {node} has unknown variant kind '{kind}' / taskType '{task_type}'"
                    ),
                    None => write!(f, "node {node} has unknown variant kind '{kind}'"),
                }
            }
        }
    }
}

impl std::error::Error for NodeError {}

/// Errors from node and edge bookkeeping inside a workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Node with the given ID was not found in the workflow.
    NodeNotFound { node_id: NodeId },
    /// Edge with the given ID was not found in the workflow.
    EdgeNotFound { edge_id: EdgeId },
    /// A node with this ID is already part of the workflow.
    DuplicateNode { node_id: NodeId },
    /// An edge with this ID is already part of the workflow.
    DuplicateEdge { edge_id: EdgeId },
    /// An edge endpoint refers to a node that is not in the workflow.
    DanglingEdge { edge_id: EdgeId, node_id: NodeId },
    /// A conditional outcome or wait resume target names a missing node.
    DanglingReference {
        node_id: NodeId,
        field: &'static str,
        target: NodeId,
    },
    /// The node is opaque (unknown variant) and cannot be duplicated.
    UnsupportedVariant { node_id: NodeId },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeNotFound { node_id } => write!(f, "node not found: {node_id}"),
            Self::EdgeNotFound { edge_id } => write!(f, "edge not found: {edge_id}"),
            Self::DuplicateNode { node_id } => write!(f, "duplicate node id: {node_id}"),
            Self::DuplicateEdge { edge_id } => write!(f, "duplicate edge id: {edge_id}"),
            Self::DanglingEdge { edge_id, node_id } => {
                write!(f, "edge {edge_id} references missing node {node_id}")
            }
            Self::DanglingReference {
                node_id,
                field,
                target,
            } => {
                write!(f, "node {node_id} field '{field}' references missing node {target}")
            }
            Self::UnsupportedVariant { node_id } => {
                write!(f, "node {node_id} has an unknown variant and cannot be copied")
            }
        }
    }
}

impl std::error::Error for GraphError {}

/// Whole-workflow failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// The persisted workflow record is unusable as a whole.
    InvalidRecord { field: &'static str, reason: String },
    /// The requested status change is not allowed.
    InvalidStateTransition { from: String, to: String },
}

impl fmt::Display for WorkflowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidRecord { field, reason } => {
                write!(f, "invalid workflow record: field '{field}' {reason}")
            }
            Self::InvalidStateTransition { from, to } => {
                write!(f, "invalid state transition from {from} to {to}")
            }
        }
    }
}

impl std::error::Error for WorkflowError {}
