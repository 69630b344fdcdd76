//! Node construction.
//!
//! The factory is the single owner of node identity: palette drops and
//! duplicate actions both draw ids from its [`IdSource`]. Variant defaults
//! (deadlines, interview slots, wait durations) are computed per call from
//! its [`Clock`], so no two nodes ever share a default value.

use crate::error::NodeError;
use crate::node::{HandleSide, NodeData, NodeVariant, Position, TaskConfig, TaskType, WorkflowNode};
use crate::record::{DecodedNode, Fields, NodeDecoder, read_task};
use jobdesk_core::{Clock, EdgeId, NodeId, SystemClock};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of fresh node and edge identifiers.
///
/// Implementations must be safe to call from concurrent editing sessions.
pub trait IdSource: Send + Sync {
    fn node_id(&self) -> NodeId;
    fn edge_id(&self) -> EdgeId;
}

/// ULID-backed ids (`node_01hv...`).
#[derive(Debug, Clone, Copy, Default)]
pub struct UlidIds;

impl IdSource for UlidIds {
    fn node_id(&self) -> NodeId {
        NodeId::generate()
    }

    fn edge_id(&self) -> EdgeId {
        EdgeId::generate()
    }
}

/// Deterministic ids (`node_1`, `edge_2`, ...) for tests and replays.
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed) + 1
    }
}

impl IdSource for SequentialIds {
    fn node_id(&self) -> NodeId {
        NodeId::try_from(format!("{}_{}", NodeId::prefix(), self.bump()))
            .unwrap_or_else(|_| NodeId::generate())
    }

    fn edge_id(&self) -> EdgeId {
        EdgeId::try_from(format!("{}_{}", EdgeId::prefix(), self.bump()))
            .unwrap_or_else(|_| EdgeId::generate())
    }
}

/// One of the seven items an editor can drop onto the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaletteItem {
    Start,
    End,
    Notification,
    Assignment,
    Interview,
    Conditional,
    Wait,
}

impl PaletteItem {
    /// All palette items, in display order.
    pub const ALL: [PaletteItem; 7] = [
        Self::Start,
        Self::Notification,
        Self::Assignment,
        Self::Interview,
        Self::Conditional,
        Self::Wait,
        Self::End,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
            Self::Notification => "notification",
            Self::Assignment => "assignment",
            Self::Interview => "interview",
            Self::Conditional => "conditional",
            Self::Wait => "wait",
        }
    }

    /// Label suggested when the editor has none.
    #[must_use]
    pub const fn default_label(self) -> &'static str {
        match self {
            Self::Start => "Application Received",
            Self::End => "Process Complete",
            Self::Notification => "Notify Candidate",
            Self::Assignment => "Send Assignment",
            Self::Interview => "Schedule Interview",
            Self::Conditional => "Check Condition",
            Self::Wait => "Wait",
        }
    }

    /// The task type this item creates, if it is a task.
    #[must_use]
    pub const fn task_type(self) -> Option<TaskType> {
        match self {
            Self::Start | Self::End => None,
            Self::Notification => Some(TaskType::Notification),
            Self::Assignment => Some(TaskType::Assignment),
            Self::Interview => Some(TaskType::Interview),
            Self::Conditional => Some(TaskType::Conditional),
            Self::Wait => Some(TaskType::Wait),
        }
    }
}

impl fmt::Display for PaletteItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaletteItem {
    type Err = NodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|item| item.as_str() == s)
            .ok_or_else(|| NodeError::UnsupportedVariant {
                variant: s.to_string(),
            })
    }
}

/// A palette drop as received from an editor.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNode {
    /// Palette tag; anything outside the seven items is rejected.
    pub variant: String,
    pub data: NodeData,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub source_position: Option<HandleSide>,
    #[serde(default)]
    pub target_position: Option<HandleSide>,
    /// Variant field overrides, in persisted (camelCase) shape.
    #[serde(default)]
    pub fields: Map<String, Value>,
}

/// Builds new nodes and fresh-identity copies.
#[derive(Clone)]
pub struct NodeFactory {
    ids: Arc<dyn IdSource>,
    clock: Arc<dyn Clock>,
}

impl NodeFactory {
    #[must_use]
    pub fn new(ids: Arc<dyn IdSource>, clock: Arc<dyn Clock>) -> Self {
        Self { ids, clock }
    }

    /// A decoder sharing this factory's id source and clock.
    #[must_use]
    pub fn decoder(&self) -> NodeDecoder {
        NodeDecoder::new(Arc::clone(&self.ids), Arc::clone(&self.clock))
    }

    #[must_use]
    pub fn next_node_id(&self) -> NodeId {
        self.ids.node_id()
    }

    #[must_use]
    pub fn next_edge_id(&self) -> EdgeId {
        self.ids.edge_id()
    }

    /// Creates a node of `item` with all variant fields defaulted.
    #[must_use]
    pub fn create(&self, item: PaletteItem, data: NodeData, position: Position) -> WorkflowNode {
        let variant = match item.task_type() {
            None if item == PaletteItem::Start => NodeVariant::Start,
            None => NodeVariant::End,
            Some(task_type) => NodeVariant::Task(TaskConfig::defaults(task_type, self.clock.now())),
        };
        let node = WorkflowNode::new(self.ids.node_id(), variant, data, position);
        tracing::debug!(node_id = %node.id(), variant = %item, "created node");
        node
    }

    /// Creates a node from a palette tag.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedVariant` if `tag` is not one of the seven items.
    pub fn create_from_tag(
        &self,
        tag: &str,
        data: NodeData,
        position: Position,
    ) -> Result<WorkflowNode, NodeError> {
        let item: PaletteItem = tag.parse()?;
        Ok(self.create(item, data, position))
    }

    /// Creates a node from an editor request, applying field overrides with
    /// the same default policy used when decoding records.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedVariant` for an unknown tag and `MalformedRecord`
    /// for an override of the wrong shape. No node is produced in either case.
    pub fn build(&self, request: NewNode) -> Result<WorkflowNode, NodeError> {
        let item: PaletteItem = request.variant.parse()?;
        let variant = match item.task_type() {
            Some(task_type) => {
                let fields = Fields::new(&request.fields, None, task_type.as_str());
                NodeVariant::Task(read_task(task_type, &fields, self.clock.now())?)
            }
            None if item == PaletteItem::Start => NodeVariant::Start,
            None => NodeVariant::End,
        };
        let node = WorkflowNode::new(self.ids.node_id(), variant, request.data, request.position)
            .with_handles(request.source_position, request.target_position);
        tracing::debug!(node_id = %node.id(), variant = %item, "built node");
        Ok(node)
    }

    /// Deep copy of `node` under a fresh id. Everything else, outcome and
    /// resume references included, is kept as is.
    #[must_use]
    pub fn duplicate(&self, node: &WorkflowNode) -> WorkflowNode {
        node.snapshot().reidentified(self.ids.node_id())
    }

    /// Duplicates a decoded entry.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedVariant` for opaque entries, whose shape is unknown.
    pub fn duplicate_entry(&self, entry: &DecodedNode) -> Result<WorkflowNode, NodeError> {
        match entry {
            DecodedNode::Node(node) => Ok(self.duplicate(node)),
            DecodedNode::Opaque(opaque) => Err(NodeError::UnsupportedVariant {
                variant: match opaque.task_type() {
                    Some(task_type) => format!("{}/{}", opaque.kind(), task_type),
                    None => opaque.kind().to_string(),
                },
            }),
        }
    }
}

impl Default for NodeFactory {
    fn default() -> Self {
        Self::new(Arc::new(UlidIds), Arc::new(SystemClock))
    }
}

impl fmt::Debug for NodeFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeFactory").finish_non_exhaustive()
    }
}
