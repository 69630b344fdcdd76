//! Read-only graph view of a workflow using petgraph.
//!
//! The view is built from a [`Workflow`] on demand:
//! - Vertices are node ids, opaque entries included
//! - Arcs are canvas edges plus conditional outcomes and wait resume targets
//!
//! The workflow itself stays the source of truth; the view answers
//! reachability questions for editors and validation screens.

use crate::definition::Workflow;
use crate::node::NodeKind;
use crate::record::DecodedNode;
use jobdesk_core::{EdgeId, NodeId};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Bfs, EdgeRef};
use std::collections::{HashMap, HashSet};

/// Why one node leads to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// A canvas edge.
    Edge(EdgeId),
    /// The conditional's branch taken when all conditions hold.
    TrueOutcome,
    /// The conditional's branch taken otherwise.
    FalseOutcome,
    /// Where a wait continues once it elapses.
    Resume,
}

impl Transition {
    fn from_reference(field: &str) -> Self {
        match field {
            "trueOutcome" => Self::TrueOutcome,
            "falseOutcome" => Self::FalseOutcome,
            _ => Self::Resume,
        }
    }
}

/// Directed graph over a workflow's nodes.
#[derive(Debug, Clone)]
pub struct WorkflowGraph {
    graph: DiGraph<NodeId, Transition>,
    /// Map from NodeId to petgraph's NodeIndex for O(1) lookup.
    node_index_map: HashMap<NodeId, NodeIndex>,
    starts: Vec<NodeIndex>,
}

impl WorkflowGraph {
    /// Builds the view. Arcs whose endpoints are missing are skipped.
    #[must_use]
    pub fn build(workflow: &Workflow) -> Self {
        let mut graph = DiGraph::new();
        let mut node_index_map = HashMap::new();
        let mut starts = Vec::new();

        for entry in workflow.entries() {
            let Some(node_id) = entry.id() else {
                continue;
            };
            let index = graph.add_node(node_id.clone());
            node_index_map.insert(node_id.clone(), index);
            if matches!(entry, DecodedNode::Node(node) if node.kind() == NodeKind::Start) {
                starts.push(index);
            }
        }

        for edge in workflow.edges() {
            if let (Some(&source), Some(&target)) = (
                node_index_map.get(&edge.source),
                node_index_map.get(&edge.target),
            ) {
                graph.add_edge(source, target, Transition::Edge(edge.id.clone()));
            }
        }

        for node in workflow.nodes() {
            let Some(&source) = node_index_map.get(node.id()) else {
                continue;
            };
            for (field, target) in node.references() {
                if let Some(&target) = node_index_map.get(target) {
                    graph.add_edge(source, target, Transition::from_reference(field));
                }
            }
        }

        Self {
            graph,
            node_index_map,
            starts,
        }
    }

    /// Returns the number of nodes in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of arcs, outcome and resume arcs included.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Start nodes, where applicants enter the workflow.
    #[must_use]
    pub fn entry_nodes(&self) -> Vec<&NodeId> {
        self.starts
            .iter()
            .filter_map(|&idx| self.graph.node_weight(idx))
            .collect()
    }

    /// Nodes with no outgoing arcs.
    #[must_use]
    pub fn terminal_nodes(&self) -> Vec<&NodeId> {
        self.graph
            .node_indices()
            .filter(|&idx| self.graph.edges_directed(idx, Direction::Outgoing).count() == 0)
            .filter_map(|idx| self.graph.node_weight(idx))
            .collect()
    }

    /// Returns the successors (downstream nodes) of a given node.
    #[must_use]
    pub fn successors(&self, node_id: &NodeId) -> Vec<(&NodeId, &Transition)> {
        let Some(&index) = self.node_index_map.get(node_id) else {
            return Vec::new();
        };

        self.graph
            .edges_directed(index, Direction::Outgoing)
            .filter_map(|edge| {
                let target = self.graph.node_weight(edge.target())?;
                Some((target, edge.weight()))
            })
            .collect()
    }

    /// Nodes no start node can reach, in workflow order.
    #[must_use]
    pub fn unreachable_nodes(&self) -> Vec<&NodeId> {
        let mut reached = HashSet::new();
        for &start in &self.starts {
            let mut bfs = Bfs::new(&self.graph, start);
            while let Some(index) = bfs.next(&self.graph) {
                reached.insert(index);
            }
        }

        self.graph
            .node_indices()
            .filter(|index| !reached.contains(index))
            .filter_map(|index| self.graph.node_weight(index))
            .collect()
    }

    /// Whether any path loops back on itself.
    #[must_use]
    pub fn has_cycle(&self) -> bool {
        petgraph::algo::is_cyclic_directed(&self.graph)
    }
}
