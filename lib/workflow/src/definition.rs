//! Workflow definition types.
//!
//! A workflow is a named hiring pipeline owned by an employer:
//! - Metadata (name, description, owner, status, template flag, tags)
//! - An ordered list of nodes, each a typed node or an opaque pass-through
//! - Edges between those nodes
//!
//! The aggregate keeps edges consistent with the node list at all times:
//! edges can only be added between present nodes, and removing a node
//! removes its edges and clears conditional/wait references to it.

use crate::edge::Edge;
use crate::error::{GraphError, NodeError, WorkflowError};
use crate::factory::{NodeFactory, PaletteItem};
use crate::graph::WorkflowGraph;
use crate::history::WorkflowSnapshot;
use crate::node::{NodeData, Position, WorkflowNode};
use crate::record::{DecodedNode, NodeDecoder, OpaqueNode};
use chrono::{DateTime, Utc};
use jobdesk_core::{EdgeId, NodeId, UserId, WorkflowId};
use rootcause::Report;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt;

/// Publication state of a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    #[default]
    Draft,
    Active,
    Archived,
}

impl WorkflowStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::Archived => "archived",
        }
    }

    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "draft" => Some(Self::Draft),
            "active" => Some(Self::Active),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }

    /// Archived workflows must go back to draft before they can run again.
    #[must_use]
    pub const fn can_transition_to(self, to: Self) -> bool {
        !matches!((self, to), (Self::Archived, Self::Active))
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node record that could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedNode {
    /// Position of the record in the persisted `nodes` array.
    pub index: usize,
    pub node_id: Option<String>,
    pub error: NodeError,
}

/// An edge record that was dropped during load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedEdge {
    /// Position of the record in the persisted `edges` array.
    pub index: usize,
    pub edge_id: Option<String>,
    pub reason: String,
}

/// Per-node outcome of a workflow load.
///
/// Rejected nodes are left out of the workflow; opaque nodes are kept but
/// listed so callers know parts of the graph cannot be rendered.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoadReport {
    pub rejected_nodes: Vec<RejectedNode>,
    pub opaque_nodes: Vec<NodeError>,
    pub dropped_edges: Vec<DroppedEdge>,
}

impl LoadReport {
    /// True when every node and edge was loaded as a known variant.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.rejected_nodes.is_empty()
            && self.opaque_nodes.is_empty()
            && self.dropped_edges.is_empty()
    }

    /// Ids of all nodes that were rejected or kept opaque.
    #[must_use]
    pub fn problem_node_ids(&self) -> Vec<&str> {
        self.rejected_nodes
            .iter()
            .filter_map(|r| r.node_id.as_deref())
            .chain(self.opaque_nodes.iter().filter_map(NodeError::node_id))
            .collect()
    }
}

/// A complete workflow definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    /// Unique identifier for this workflow.
    pub id: WorkflowId,
    /// Human-readable name.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    nodes: Vec<DecodedNode>,
    edges: Vec<Edge>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Owning employer account.
    pub created_by: UserId,
    pub is_template: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_category: Option<String>,
    status: WorkflowStatus,
    pub tags: BTreeSet<String>,
}

impl Workflow {
    /// Creates an empty draft workflow.
    #[must_use]
    pub fn new(name: impl Into<String>, created_by: UserId, now: DateTime<Utc>) -> Self {
        Self::with_id(WorkflowId::generate(), name, created_by, now)
    }

    /// Creates an empty draft workflow with a specific ID.
    #[must_use]
    pub fn with_id(
        id: WorkflowId,
        name: impl Into<String>,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            description: None,
            nodes: Vec::new(),
            edges: Vec::new(),
            created_at: now,
            updated_at: now,
            created_by,
            is_template: false,
            template_category: None,
            status: WorkflowStatus::Draft,
            tags: BTreeSet::new(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    /// Marks this workflow as a reusable template.
    #[must_use]
    pub fn as_template(mut self, category: impl Into<String>) -> Self {
        self.is_template = true;
        self.template_category = Some(category.into());
        self
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub fn status(&self) -> WorkflowStatus {
        self.status
    }

    /// Moves the workflow to `to`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidStateTransition` for `archived -> active`.
    pub fn set_status(&mut self, to: WorkflowStatus) -> jobdesk_core::Result<(), WorkflowError> {
        if !self.status.can_transition_to(to) {
            return Err(WorkflowError::InvalidStateTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            }
            .into());
        }
        self.status = to;
        Ok(())
    }

    /// Bumps `updated_at`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    /// Number of node entries, opaque ones included.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Typed (renderable) nodes in list order.
    pub fn nodes(&self) -> impl Iterator<Item = &WorkflowNode> {
        self.nodes.iter().filter_map(DecodedNode::as_node)
    }

    /// Opaque entries kept for round-tripping.
    pub fn opaque_nodes(&self) -> impl Iterator<Item = &OpaqueNode> {
        self.nodes.iter().filter_map(|entry| match entry {
            DecodedNode::Opaque(opaque) => Some(opaque),
            DecodedNode::Node(_) => None,
        })
    }

    /// All node entries in list order.
    #[must_use]
    pub fn entries(&self) -> &[DecodedNode] {
        &self.nodes
    }

    /// Edges in list order.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Whether any entry, typed or opaque, has this id.
    #[must_use]
    pub fn contains_node(&self, node_id: &NodeId) -> bool {
        self.nodes.iter().any(|entry| entry.id() == Some(node_id))
    }

    /// Looks up a typed node by ID.
    #[must_use]
    pub fn node(&self, node_id: &NodeId) -> Option<&WorkflowNode> {
        self.nodes().find(|node| node.id() == node_id)
    }

    /// Live node for in-place edits (position, label, task fields).
    pub fn node_mut(&mut self, node_id: &NodeId) -> Option<&mut WorkflowNode> {
        self.nodes
            .iter_mut()
            .filter_map(DecodedNode::as_node_mut)
            .find(|node| node.id() == node_id)
    }

    /// Looks up an edge by ID.
    #[must_use]
    pub fn edge(&self, edge_id: &EdgeId) -> Option<&Edge> {
        self.edges.iter().find(|edge| &edge.id == edge_id)
    }

    /// Appends a node.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateNode` if the id is already taken.
    pub fn add_node(&mut self, node: WorkflowNode) -> Result<NodeId, GraphError> {
        let node_id = node.id().clone();
        if self.contains_node(&node_id) {
            return Err(GraphError::DuplicateNode { node_id });
        }
        self.nodes.push(DecodedNode::Node(node));
        Ok(node_id)
    }

    /// Palette drop: builds a node through `factory` and appends it.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateNode` if the id source handed out a taken id.
    pub fn place_node(
        &mut self,
        factory: &NodeFactory,
        item: PaletteItem,
        data: NodeData,
        position: Position,
    ) -> Result<NodeId, GraphError> {
        self.add_node(factory.create(item, data, position))
    }

    /// Duplicate action: appends a copy of `node_id` under a fresh id.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` for an unknown id and `UnsupportedVariant`
    /// for opaque entries.
    pub fn duplicate_node(
        &mut self,
        factory: &NodeFactory,
        node_id: &NodeId,
    ) -> Result<NodeId, GraphError> {
        let entry = self
            .nodes
            .iter()
            .find(|entry| entry.id() == Some(node_id))
            .ok_or_else(|| GraphError::NodeNotFound {
                node_id: node_id.clone(),
            })?;
        let copy = factory
            .duplicate_entry(entry)
            .map_err(|_| GraphError::UnsupportedVariant {
                node_id: node_id.clone(),
            })?;
        self.add_node(copy)
    }

    /// Removes a node, its edges, and any outcome/resume references to it.
    pub fn remove_node(&mut self, node_id: &NodeId) -> Option<DecodedNode> {
        let index = self
            .nodes
            .iter()
            .position(|entry| entry.id() == Some(node_id))?;
        let removed = self.nodes.remove(index);

        let before = self.edges.len();
        self.edges.retain(|edge| !edge.touches(node_id));
        for node in self.nodes.iter_mut().filter_map(DecodedNode::as_node_mut) {
            node.remap_references(|target| (target != node_id).then(|| target.clone()));
        }

        tracing::debug!(
            node_id = %node_id,
            removed_edges = before - self.edges.len(),
            "removed node"
        );
        Some(removed)
    }

    /// Adds an edge between two present nodes.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateEdge` for a taken edge id and `DanglingEdge` when
    /// either endpoint is missing.
    pub fn add_edge(&mut self, edge: Edge) -> Result<EdgeId, GraphError> {
        if self.edge(&edge.id).is_some() {
            return Err(GraphError::DuplicateEdge { edge_id: edge.id });
        }
        for end in [&edge.source, &edge.target] {
            if !self.contains_node(end) {
                return Err(GraphError::DanglingEdge {
                    edge_id: edge.id.clone(),
                    node_id: end.clone(),
                });
            }
        }
        let edge_id = edge.id.clone();
        self.edges.push(edge);
        Ok(edge_id)
    }

    /// Connects two nodes with a plain edge whose id comes from `factory`.
    ///
    /// # Errors
    ///
    /// As [`add_edge`](Self::add_edge).
    pub fn connect(
        &mut self,
        factory: &NodeFactory,
        source: &NodeId,
        target: &NodeId,
    ) -> Result<EdgeId, GraphError> {
        self.add_edge(Edge::new(
            factory.next_edge_id(),
            source.clone(),
            target.clone(),
        ))
    }

    /// Removes an edge.
    ///
    /// # Errors
    ///
    /// Returns `EdgeNotFound` for an unknown id.
    pub fn remove_edge(&mut self, edge_id: &EdgeId) -> Result<Edge, GraphError> {
        let index = self
            .edges
            .iter()
            .position(|edge| &edge.id == edge_id)
            .ok_or_else(|| GraphError::EdgeNotFound {
                edge_id: edge_id.clone(),
            })?;
        Ok(self.edges.remove(index))
    }

    /// Checks referential integrity of edges, conditional outcomes and
    /// wait resume targets.
    ///
    /// # Errors
    ///
    /// Returns the first dangling reference found.
    pub fn validate(&self) -> Result<(), GraphError> {
        let ids: HashSet<&NodeId> = self.nodes.iter().filter_map(DecodedNode::id).collect();

        for edge in &self.edges {
            for end in [&edge.source, &edge.target] {
                if !ids.contains(end) {
                    return Err(GraphError::DanglingEdge {
                        edge_id: edge.id.clone(),
                        node_id: end.clone(),
                    });
                }
            }
        }

        for node in self.nodes() {
            for (field, target) in node.references() {
                if !ids.contains(target) {
                    return Err(GraphError::DanglingReference {
                        node_id: node.id().clone(),
                        field,
                        target: target.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    /// Graph view for reachability questions.
    #[must_use]
    pub fn graph(&self) -> WorkflowGraph {
        WorkflowGraph::build(self)
    }

    /// Identity-preserving copy of the node and edge lists.
    #[must_use]
    pub fn snapshot(&self) -> WorkflowSnapshot {
        WorkflowSnapshot {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }

    /// Puts back a previously taken snapshot.
    pub fn restore(&mut self, snapshot: WorkflowSnapshot) {
        self.nodes = snapshot.nodes;
        self.edges = snapshot.edges;
    }

    /// Copies this workflow (usually a template) into a new draft owned by
    /// `owner`. Every node and edge gets a fresh id; edges and
    /// conditional/wait references are rewired to the new ids.
    #[must_use]
    pub fn instantiate_template(
        &self,
        factory: &NodeFactory,
        name: impl Into<String>,
        owner: UserId,
        now: DateTime<Utc>,
    ) -> Workflow {
        let mapping: HashMap<NodeId, NodeId> = self
            .nodes
            .iter()
            .filter_map(DecodedNode::id)
            .map(|id| (id.clone(), factory.next_node_id()))
            .collect();

        let nodes = self
            .nodes
            .iter()
            .map(|entry| match entry {
                DecodedNode::Node(node) => {
                    let new_id = mapping
                        .get(node.id())
                        .cloned()
                        .unwrap_or_else(|| factory.next_node_id());
                    let mut copy = node.snapshot().reidentified(new_id);
                    copy.remap_references(|target| mapping.get(target).cloned());
                    copy.selected = false;
                    DecodedNode::Node(copy)
                }
                DecodedNode::Opaque(opaque) => match opaque.id().and_then(|id| mapping.get(id)) {
                    Some(new_id) => {
                        DecodedNode::Opaque(opaque.clone().reidentified(new_id.clone()))
                    }
                    None => DecodedNode::Opaque(opaque.clone()),
                },
            })
            .collect();

        let edges = self
            .edges
            .iter()
            .filter_map(|edge| {
                Some(Edge {
                    id: factory.next_edge_id(),
                    source: mapping.get(&edge.source)?.clone(),
                    target: mapping.get(&edge.target)?.clone(),
                    ..edge.clone()
                })
            })
            .collect();

        Workflow {
            id: WorkflowId::generate(),
            name: name.into(),
            description: self.description.clone(),
            nodes,
            edges,
            created_at: now,
            updated_at: now,
            created_by: owner,
            is_template: false,
            template_category: None,
            status: WorkflowStatus::Draft,
            tags: self.tags.clone(),
        }
    }

    /// Loads a persisted workflow record.
    ///
    /// Node problems never fail the load: malformed nodes are left out,
    /// unknown variants are kept opaque, and edges that would dangle are
    /// dropped, all of it listed in the returned [`LoadReport`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidRecord` if the workflow-level fields are unusable.
    pub fn load(
        record: &Value,
        decoder: &NodeDecoder,
    ) -> jobdesk_core::Result<(Workflow, LoadReport), WorkflowError> {
        let map = record
            .as_object()
            .ok_or_else(|| invalid("record", "is not an object"))?;

        let id: WorkflowId = required_text(map, "id")?
            .parse()
            .map_err(|e: jobdesk_core::ParseIdError| invalid("id", e.to_string()))?;
        let name = required_text(map, "name")?;
        let created_by: UserId = required_text(map, "createdBy")?
            .parse()
            .map_err(|e: jobdesk_core::ParseIdError| invalid("createdBy", e.to_string()))?;
        let now = decoder.now();
        let created_at = timestamp(map, "createdAt")?.unwrap_or(now);
        let updated_at = timestamp(map, "updatedAt")?.unwrap_or(created_at);
        let status = match optional_text(map, "status")? {
            None => WorkflowStatus::Draft,
            Some(tag) => WorkflowStatus::from_tag(&tag)
                .ok_or_else(|| invalid("status", format!("has unknown value '{tag}'")))?,
        };
        let is_template = match map.get("isTemplate") {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(_) => return Err(invalid("isTemplate", "is not a boolean")),
        };
        let tags: BTreeSet<String> = match map.get("tags") {
            None | Some(Value::Null) => BTreeSet::new(),
            Some(value) => BTreeSet::<String>::deserialize(value)
                .map_err(|e| invalid("tags", format!("is invalid: {e}")))?,
        };

        let mut report = LoadReport::default();
        let (nodes, node_ids) = load_nodes(list(map, "nodes")?, decoder, &mut report);
        let edges = load_edges(list(map, "edges")?, &node_ids, &mut report);

        let workflow = Workflow {
            id,
            name,
            description: optional_text(map, "description")?,
            nodes,
            edges,
            created_at,
            updated_at,
            created_by,
            is_template,
            template_category: optional_text(map, "templateCategory")?,
            status,
            tags,
        };

        if !report.is_clean() {
            tracing::warn!(
                workflow_id = %workflow.id,
                rejected_nodes = report.rejected_nodes.len(),
                opaque_nodes = report.opaque_nodes.len(),
                dropped_edges = report.dropped_edges.len(),
                "workflow loaded with problems"
            );
        }
        Ok((workflow, report))
    }
}

fn load_nodes(
    records: &[Value],
    decoder: &NodeDecoder,
    report: &mut LoadReport,
) -> (Vec<DecodedNode>, HashSet<NodeId>) {
    let mut nodes = Vec::with_capacity(records.len());
    let mut seen = HashSet::new();

    for (index, record) in records.iter().enumerate() {
        let entry = match decoder.decode(record) {
            Ok(entry) => entry,
            Err(error) => {
                let node_id = error.node_id().map(str::to_string).or_else(|| {
                    record.get("id").and_then(Value::as_str).map(str::to_string)
                });
                tracing::warn!(index, node_id = ?node_id, error = %error, "dropping node");
                report.rejected_nodes.push(RejectedNode {
                    index,
                    node_id,
                    error,
                });
                continue;
            }
        };

        if let Some(node_id) = entry.id()
            && !seen.insert(node_id.clone())
        {
            tracing::warn!(index, node_id = %node_id, "dropping node with duplicate id");
            report.rejected_nodes.push(RejectedNode {
                index,
                node_id: Some(node_id.to_string()),
                error: NodeError::MalformedRecord {
                    node_id: Some(node_id.to_string()),
                    variant: variant_tag(&entry),
                    field: "id",
                    reason: "duplicates an earlier node".to_string(),
                },
            });
            continue;
        }

        if let DecodedNode::Opaque(opaque) = &entry {
            report.opaque_nodes.push(opaque.as_error());
        }
        nodes.push(entry);
    }

    (nodes, seen)
}

fn load_edges(records: &[Value], node_ids: &HashSet<NodeId>, report: &mut LoadReport) -> Vec<Edge> {
    let mut edges: Vec<Edge> = Vec::with_capacity(records.len());

    for (index, record) in records.iter().enumerate() {
        let edge_id = record.get("id").and_then(Value::as_str).map(str::to_string);
        let reason = match Edge::deserialize(record) {
            Err(e) => Some(format!("invalid edge: {e}")),
            Ok(edge) => {
                if edges.iter().any(|existing| existing.id == edge.id) {
                    Some(GraphError::DuplicateEdge { edge_id: edge.id }.to_string())
                } else if let Some(missing) = [&edge.source, &edge.target]
                    .into_iter()
                    .find(|end| !node_ids.contains(*end))
                {
                    Some(
                        GraphError::DanglingEdge {
                            edge_id: edge.id.clone(),
                            node_id: missing.clone(),
                        }
                        .to_string(),
                    )
                } else {
                    edges.push(edge);
                    None
                }
            }
        };

        if let Some(reason) = reason {
            tracing::warn!(index, edge_id = ?edge_id, reason = %reason, "dropping edge");
            report.dropped_edges.push(DroppedEdge {
                index,
                edge_id,
                reason,
            });
        }
    }

    edges
}

fn variant_tag(entry: &DecodedNode) -> String {
    match entry {
        DecodedNode::Node(node) => node
            .task_type()
            .map_or_else(|| node.kind().to_string(), |t| t.to_string()),
        DecodedNode::Opaque(opaque) => opaque.kind().to_string(),
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> Report<WorkflowError> {
    WorkflowError::InvalidRecord {
        field,
        reason: reason.into(),
    }
    .into()
}

fn optional_text(
    map: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, Report<WorkflowError>> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(invalid(field, "is not a string")),
    }
}

fn required_text(
    map: &Map<String, Value>,
    field: &'static str,
) -> Result<String, Report<WorkflowError>> {
    optional_text(map, field)?.ok_or_else(|| invalid(field, "is required"))
}

fn timestamp(
    map: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<DateTime<Utc>>, Report<WorkflowError>> {
    optional_text(map, field)?
        .map(|text| {
            DateTime::parse_from_rfc3339(&text)
                .map(|at| at.with_timezone(&Utc))
                .map_err(|e| invalid(field, format!("is not an RFC 3339 timestamp: {e}")))
        })
        .transpose()
}

fn list<'a>(
    map: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a [Value], Report<WorkflowError>> {
    match map.get(field) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(invalid(field, "is not an array")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{Condition, ConditionOperator, ValueType};
    use crate::factory::SequentialIds;
    use crate::node::{NodeKind, TaskConfig, TaskConfigMut, WaitUnit};
    use chrono::TimeZone;
    use jobdesk_core::FixedClock;
    use serde_json::json;
    use std::sync::Arc;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 12, 0, 0).unwrap()
    }

    fn factory() -> NodeFactory {
        NodeFactory::new(Arc::new(SequentialIds::new()), Arc::new(FixedClock::new(now())))
    }

    fn owner() -> UserId {
        "usr_employer".parse().expect("user id")
    }

    /// start -> screen (conditional) -> end, with both outcomes wired.
    fn screening(factory: &NodeFactory) -> (Workflow, NodeId, NodeId, NodeId) {
        let mut workflow = Workflow::new("Backend hiring", owner(), now());
        let start = workflow
            .place_node(
                factory,
                PaletteItem::Start,
                NodeData::new("Applied"),
                Position::new(0.0, 0.0),
            )
            .expect("start");
        let screen = workflow
            .place_node(
                factory,
                PaletteItem::Conditional,
                NodeData::new("Screen"),
                Position::new(200.0, 0.0),
            )
            .expect("screen");
        let end = workflow
            .place_node(factory, PaletteItem::End, NodeData::new("Done"), Position::new(400.0, 0.0))
            .expect("end");

        if let Some(TaskConfigMut::Conditional(c)) =
            workflow.node_mut(&screen).and_then(WorkflowNode::task_mut)
        {
            c.conditions.push(Condition::new(
                "score",
                ConditionOperator::GreaterOrEqual,
                "70",
                ValueType::Number,
            ));
            c.true_outcome = Some(end.clone());
            c.false_outcome = Some(end.clone());
        }
        workflow.connect(factory, &start, &screen).expect("edge");
        workflow.connect(factory, &screen, &end).expect("edge");
        (workflow, start, screen, end)
    }

    #[test]
    fn conditional_outcomes_resolve_in_three_node_workflow() {
        let factory = factory();
        let (workflow, _, screen, end) = screening(&factory);
        assert!(workflow.validate().is_ok());

        let Some(TaskConfig::Conditional(c)) = workflow.node(&screen).and_then(WorkflowNode::task)
        else {
            panic!("expected conditional");
        };
        for outcome in [&c.true_outcome, &c.false_outcome] {
            let target = outcome.as_ref().expect("wired");
            assert_eq!(target, &end);
            assert!(workflow.contains_node(target));
        }
    }

    #[test]
    fn validate_reports_dangling_outcome() {
        let factory = factory();
        let (mut workflow, _, screen, _) = screening(&factory);
        if let Some(TaskConfigMut::Conditional(c)) =
            workflow.node_mut(&screen).and_then(WorkflowNode::task_mut)
        {
            c.false_outcome = Some("node_ghost".parse().expect("id"));
        }
        assert!(matches!(
            workflow.validate(),
            Err(GraphError::DanglingReference { field: "falseOutcome", .. })
        ));
    }

    #[test]
    fn remove_node_cascades_edges_and_references() {
        let factory = factory();
        let (mut workflow, _, screen, end) = screening(&factory);
        let removed = workflow.remove_node(&end).expect("removed");
        assert_eq!(removed.id(), Some(&end));
        assert_eq!(workflow.edge_count(), 1);
        assert!(workflow.edges().iter().all(|e| !e.touches(&end)));

        let Some(TaskConfig::Conditional(c)) = workflow.node(&screen).and_then(WorkflowNode::task)
        else {
            panic!("expected conditional");
        };
        assert_eq!(c.true_outcome, None);
        assert_eq!(c.false_outcome, None);
        assert!(workflow.validate().is_ok());
        assert!(workflow.remove_node(&end).is_none());
    }

    #[test]
    fn add_edge_requires_both_endpoints() {
        let factory = factory();
        let (mut workflow, start, _, _) = screening(&factory);
        let ghost: NodeId = "node_ghost".parse().expect("id");
        assert!(matches!(
            workflow.connect(&factory, &start, &ghost),
            Err(GraphError::DanglingEdge { .. })
        ));

        let existing = workflow.edges()[0].clone();
        assert!(matches!(
            workflow.add_edge(existing.clone()),
            Err(GraphError::DuplicateEdge { .. })
        ));

        assert_eq!(workflow.remove_edge(&existing.id), Ok(existing.clone()));
        assert_eq!(
            workflow.remove_edge(&existing.id),
            Err(GraphError::EdgeNotFound { edge_id: existing.id })
        );
    }

    #[test]
    fn duplicate_node_gets_new_identity() {
        let factory = factory();
        let (mut workflow, _, screen, _) = screening(&factory);
        let copy_id = workflow.duplicate_node(&factory, &screen).expect("duplicate");
        assert_ne!(copy_id, screen);
        assert_eq!(workflow.node_count(), 4);
        assert_eq!(
            workflow.node(&copy_id).map(WorkflowNode::variant),
            workflow.node(&screen).map(WorkflowNode::variant)
        );

        let missing: NodeId = "node_missing".parse().expect("id");
        assert!(matches!(
            workflow.duplicate_node(&factory, &missing),
            Err(GraphError::NodeNotFound { .. })
        ));
    }

    #[test]
    fn add_node_rejects_duplicate_id() {
        let factory = factory();
        let (mut workflow, start, _, _) = screening(&factory);
        let clone = workflow.node(&start).expect("start").snapshot();
        assert!(matches!(
            workflow.add_node(clone),
            Err(GraphError::DuplicateNode { .. })
        ));
    }

    #[test]
    fn status_transitions() {
        let mut workflow = Workflow::new("Pipeline", owner(), now());
        assert_eq!(workflow.status(), WorkflowStatus::Draft);
        workflow.set_status(WorkflowStatus::Active).expect("activate");
        workflow.set_status(WorkflowStatus::Archived).expect("archive");
        assert!(workflow.set_status(WorkflowStatus::Active).is_err());
        workflow.set_status(WorkflowStatus::Draft).expect("reopen");
        workflow.set_status(WorkflowStatus::Active).expect("activate again");
    }

    #[test]
    fn persisted_round_trip_is_lossless() {
        let factory = factory();
        let (mut workflow, _, _, _) = screening(&factory);
        workflow.description = Some("Senior backend role".to_string());
        workflow.tags.insert("engineering".to_string());
        for item in [
            PaletteItem::Notification,
            PaletteItem::Assignment,
            PaletteItem::Interview,
            PaletteItem::Wait,
        ] {
            let data = NodeData::new(item.default_label());
            workflow
                .place_node(&factory, item, data, Position::default())
                .expect("place");
        }

        let record = serde_json::to_value(&workflow).expect("serialize");
        let (loaded, report) = Workflow::load(&record, &factory.decoder()).expect("load");
        assert!(report.is_clean());
        assert_eq!(loaded, workflow);
    }

    #[test]
    fn wait_exact_time_and_duration_survive_round_trip() {
        let factory = factory();
        let mut workflow = Workflow::new("Cool-off", owner(), now());
        let wait = workflow
            .place_node(&factory, PaletteItem::Wait, NodeData::new("Hold"), Position::default())
            .expect("wait");
        let exact = Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap();
        if let Some(TaskConfigMut::Wait(w)) =
            workflow.node_mut(&wait).and_then(WorkflowNode::task_mut)
        {
            w.duration = 3;
            w.unit = WaitUnit::Weeks;
            w.exact_date_time = Some(exact);
        }

        let snapshot = workflow.node(&wait).expect("wait").snapshot();
        let record = serde_json::to_value(&workflow).expect("serialize");
        let (loaded, _) = Workflow::load(&record, &factory.decoder()).expect("load");

        for node in [&snapshot, loaded.node(&wait).expect("wait")] {
            let Some(TaskConfig::Wait(w)) = node.task() else {
                panic!("expected wait");
            };
            assert_eq!(w.duration, 3);
            assert_eq!(w.unit, WaitUnit::Weeks);
            assert_eq!(w.exact_date_time, Some(exact));
            assert_eq!(w.resume_at(now()), Some(exact));
        }
    }

    #[test]
    fn load_reports_partial_failures() {
        let record = json!({
            "id": "wf_1",
            "name": "Imported",
            "createdBy": "usr_1",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-02T00:00:00Z",
            "status": "active",
            "isTemplate": true,
            "templateCategory": "engineering",
            "tags": ["backend", "backend", "remote"],
            "nodes": [
                { "id": "a", "kind": "start",
                  "position": { "x": 0, "y": 0 }, "data": { "label": "Start" } },
                { "id": "b", "kind": "task", "taskType": "assignment", "deadline": "soon",
                  "position": { "x": 0, "y": 0 }, "data": { "label": "Task" } },
                { "id": "c", "kind": "task", "taskType": "survey",
                  "position": { "x": 0, "y": 0 }, "data": { "label": "Survey" } },
                { "id": "a", "kind": "end",
                  "position": { "x": 0, "y": 0 }, "data": { "label": "Dup" } },
                { "id": "d", "kind": "end",
                  "position": { "x": 0, "y": 0 }, "data": { "label": "End" } }
            ],
            "edges": [
                { "id": "e1", "source": "a", "target": "b" },
                { "id": "e2", "source": "a", "target": "c" },
                { "id": "e3", "source": "c", "target": "d" },
                { "id": "e3", "source": "a", "target": "d" },
                { "id": "e4", "source": "a" }
            ]
        });

        let (workflow, report) = Workflow::load(&record, &factory().decoder()).expect("load");
        assert_eq!(workflow.status(), WorkflowStatus::Active);
        assert!(workflow.is_template);
        assert_eq!(workflow.tags.len(), 2);
        assert_eq!(workflow.node_count(), 3);
        assert_eq!(workflow.nodes().count(), 2);
        assert_eq!(workflow.opaque_nodes().count(), 1);
        assert_eq!(workflow.edge_count(), 2);

        assert_eq!(report.rejected_nodes.len(), 2);
        assert_eq!(report.rejected_nodes[0].index, 1);
        assert!(matches!(
            report.rejected_nodes[0].error,
            NodeError::MalformedRecord { field: "deadline", .. }
        ));
        assert_eq!(report.rejected_nodes[1].index, 3);
        assert_eq!(report.opaque_nodes.len(), 1);
        assert_eq!(report.dropped_edges.len(), 3);
        assert_eq!(report.problem_node_ids(), vec!["b", "a", "c"]);

        let saved = serde_json::to_value(&workflow).expect("serialize");
        let survey = saved["nodes"]
            .as_array()
            .expect("nodes")
            .iter()
            .find(|n| n["id"] == "c")
            .expect("opaque node kept");
        assert_eq!(survey["taskType"], "survey");
    }

    #[test]
    fn load_rejects_unusable_workflow_record() {
        let decoder = factory().decoder();
        assert!(Workflow::load(&json!([]), &decoder).is_err());
        assert!(Workflow::load(&json!({ "id": "wf_1", "createdBy": "usr_1" }), &decoder).is_err());
        assert!(
            Workflow::load(
                &json!({ "id": "wf_1", "name": "x", "createdBy": "usr_1", "status": "paused" }),
                &decoder
            )
            .is_err()
        );
        assert!(
            Workflow::load(
                &json!({ "id": "wf_1", "name": "x", "createdBy": "usr_1", "createdAt": 17 }),
                &decoder
            )
            .is_err()
        );

        let (minimal, report) = Workflow::load(
            &json!({ "id": "wf_1", "name": "x", "createdBy": "usr_1" }),
            &decoder,
        )
        .expect("load");
        assert!(report.is_clean());
        assert_eq!(minimal.created_at, now());
        assert_eq!(minimal.status(), WorkflowStatus::Draft);
    }

    #[test]
    fn template_instantiation_rewires_ids() {
        let factory = factory();
        let (template, start, screen, end) = screening(&factory);
        let template = template.as_template("engineering");

        let copy =
            template.instantiate_template(&factory, "Backend hiring (Berlin)", owner(), now());
        assert!(!copy.is_template);
        assert_ne!(copy.id, template.id);
        assert_eq!(copy.node_count(), 3);
        assert_eq!(copy.edge_count(), 2);
        for old in [&start, &screen, &end] {
            assert!(!copy.contains_node(old));
        }
        assert!(copy.validate().is_ok());

        let conditional = copy
            .nodes()
            .find(|n| n.task_type().is_some())
            .expect("conditional");
        let end_copy = copy
            .nodes()
            .find(|n| n.kind() == NodeKind::End)
            .expect("end");
        let Some(TaskConfig::Conditional(c)) = conditional.task() else {
            panic!("expected conditional");
        };
        assert_eq!(c.true_outcome.as_ref(), Some(end_copy.id()));
    }
}
