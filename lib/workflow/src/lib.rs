//! Hiring workflow model for the jobdesk platform.
//!
//! This crate provides the workflow builder's domain model, including:
//!
//! - **Nodes**: Start, End and five task variants (notification, assignment,
//!   interview, conditional, wait) as one closed sum type
//! - **Factory**: Palette-driven node creation with injected id and clock
//!   sources
//! - **Records**: Validated decoding of persisted node records, with
//!   unknown variants passed through untouched
//! - **Workflows**: The editable aggregate with referential integrity,
//!   status transitions, templates and undo history
//! - **Graph**: A petgraph view for reachability checks

pub mod condition;
pub mod definition;
pub mod delay;
pub mod edge;
pub mod error;
pub mod factory;
pub mod graph;
pub mod history;
pub mod node;
pub mod record;

pub use condition::{Condition, ConditionOperator, ValueType};
pub use definition::{DroppedEdge, LoadReport, RejectedNode, Workflow, WorkflowStatus};
pub use edge::Edge;
pub use error::{GraphError, NodeError, WorkflowError};
pub use factory::{IdSource, NewNode, NodeFactory, PaletteItem, SequentialIds, UlidIds};
pub use graph::{Transition, WorkflowGraph};
pub use history::{DEFAULT_HISTORY_LIMIT, EditHistory, WorkflowSnapshot};
pub use node::{
    AssignmentTask, ConditionalTask, EmailConfig, HandleSide, InterviewTask, MessageConfig,
    NodeData, NodeKind, NodeVariant, NotificationChannel, NotificationTask, Position, TaskConfig,
    TaskConfigMut, TaskType, WaitTask, WaitUnit, WorkflowNode,
};
pub use record::{DecodedNode, NodeDecoder, OpaqueNode};
