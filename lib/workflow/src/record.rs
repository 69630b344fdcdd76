//! Reconstruction of typed nodes from untyped records.
//!
//! Records come back from storage or over the wire as plain JSON objects,
//! with the variant identity reduced to the `kind` and `taskType` strings.
//! Decoding is a validated parse:
//! - `kind`, `taskType` (task nodes), `position` and `data.label` are required
//! - a missing `id` is generated; a present one is kept verbatim
//! - missing variant fields take the same defaults the factory applies,
//!   timestamps included; present timestamps must be RFC 3339 text
//! - an unknown `kind`/`taskType` pair yields an [`OpaqueNode`] that keeps
//!   the record untouched, so newer node kinds survive a load/save cycle

use crate::error::NodeError;
use crate::factory::{IdSource, UlidIds};
use crate::node::{
    AssignmentTask, ConditionalTask, HandleSide, InterviewTask, NodeData, NodeKind, NodeVariant,
    NotificationTask, Position, TaskConfig, TaskType, WaitTask, WorkflowNode,
};
use chrono::{DateTime, Utc};
use jobdesk_core::{Clock, NodeId, SystemClock};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

/// A node whose variant this build does not recognize.
///
/// Kept verbatim so that saving the workflow again does not lose it. It is
/// not renderable and cannot be duplicated.
#[derive(Debug, Clone, PartialEq)]
pub struct OpaqueNode {
    id: Option<NodeId>,
    kind: String,
    task_type: Option<String>,
    record: Map<String, Value>,
}

impl OpaqueNode {
    /// Returns the record's ID, if it carried a usable one.
    #[must_use]
    pub fn id(&self) -> Option<&NodeId> {
        self.id.as_ref()
    }

    /// The `kind` tag as received.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The unrecognized `taskType` tag, if any.
    #[must_use]
    pub fn task_type(&self) -> Option<&str> {
        self.task_type.as_deref()
    }

    /// The record exactly as it was received.
    #[must_use]
    pub fn record(&self) -> &Map<String, Value> {
        &self.record
    }

    /// The matching `UnknownPersistedVariant` condition, for reporting.
    #[must_use]
    pub fn as_error(&self) -> NodeError {
        NodeError::UnknownPersistedVariant {
            node_id: self.id.as_ref().map(ToString::to_string),
            kind: self.kind.clone(),
            task_type: self.task_type.clone(),
        }
    }

    /// Same record under a different identity.
    pub(crate) fn reidentified(mut self, id: NodeId) -> Self {
        self.record.insert("id".to_string(), Value::String(id.to_string()));
        self.id = Some(id);
        self
    }
}

/// Result of decoding one record.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedNode {
    /// A node of a known variant.
    Node(WorkflowNode),
    /// An unknown variant, passed through untouched.
    Opaque(OpaqueNode),
}

impl DecodedNode {
    /// Returns the entry's ID, typed or opaque.
    #[must_use]
    pub fn id(&self) -> Option<&NodeId> {
        match self {
            Self::Node(node) => Some(node.id()),
            Self::Opaque(opaque) => opaque.id(),
        }
    }

    /// Returns the typed node; `None` for opaque entries.
    #[must_use]
    pub fn as_node(&self) -> Option<&WorkflowNode> {
        match self {
            Self::Node(node) => Some(node),
            Self::Opaque(_) => None,
        }
    }

    pub fn as_node_mut(&mut self) -> Option<&mut WorkflowNode> {
        match self {
            Self::Node(node) => Some(node),
            Self::Opaque(_) => None,
        }
    }

    /// Whether an editor can draw this entry.
    #[must_use]
    pub fn is_renderable(&self) -> bool {
        matches!(self, Self::Node(_))
    }
}

impl From<WorkflowNode> for DecodedNode {
    fn from(node: WorkflowNode) -> Self {
        Self::Node(node)
    }
}

impl Serialize for DecodedNode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Node(node) => node.serialize(serializer),
            Self::Opaque(opaque) => opaque.record.serialize(serializer),
        }
    }
}

/// Decodes node records, generating missing ids and defaulting missing
/// timestamps from the injected sources.
#[derive(Clone)]
pub struct NodeDecoder {
    ids: Arc<dyn IdSource>,
    clock: Arc<dyn Clock>,
}

impl NodeDecoder {
    #[must_use]
    pub fn new(ids: Arc<dyn IdSource>, clock: Arc<dyn Clock>) -> Self {
        Self { ids, clock }
    }

    /// The instant used for defaulted timestamps.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Decodes one node record.
    ///
    /// # Errors
    ///
    /// Returns `MalformedRecord` when the record is not an object, lacks a
    /// required field, or carries a field of the wrong shape.
    pub fn decode(&self, record: &Value) -> Result<DecodedNode, NodeError> {
        let Some(map) = record.as_object() else {
            return Err(NodeError::MalformedRecord {
                node_id: None,
                variant: "unknown".to_string(),
                field: "record",
                reason: "is not an object".to_string(),
            });
        };

        let raw_id = map.get("id").and_then(Value::as_str).map(str::to_string);
        let mut fields = Fields::new(map, raw_id, "unknown");

        let kind_tag = fields.required_string("kind")?;
        let task_tag = fields.string("taskType")?;

        let Some(kind) = NodeKind::from_tag(&kind_tag) else {
            return Ok(DecodedNode::Opaque(self.opaque(map, kind_tag, task_tag)));
        };

        let variant = match kind {
            NodeKind::Start | NodeKind::End => {
                fields.variant = kind.as_str().to_string();
                if task_tag.is_some() {
                    return Err(fields.malformed("taskType", "is not allowed on start/end nodes"));
                }
                if kind == NodeKind::Start {
                    NodeVariant::Start
                } else {
                    NodeVariant::End
                }
            }
            NodeKind::Task => {
                let Some(task_tag) = task_tag else {
                    fields.variant = "task".to_string();
                    return Err(fields.malformed("taskType", "is required on task nodes"));
                };
                let Some(task_type) = TaskType::from_tag(&task_tag) else {
                    return Ok(DecodedNode::Opaque(self.opaque(
                        map,
                        kind_tag,
                        Some(task_tag),
                    )));
                };
                fields.variant = task_type.as_str().to_string();
                NodeVariant::Task(read_task(task_type, &fields, self.clock.now())?)
            }
        };

        let id = match map.get("id") {
            None | Some(Value::Null) => self.ids.node_id(),
            Some(_) => fields.node_ref("id")?.ok_or_else(|| fields.malformed("id", "is blank"))?,
        };
        let position: Position = fields
            .parse("position")?
            .ok_or_else(|| fields.malformed("position", "is required"))?;
        let data: NodeData = fields
            .parse("data")?
            .ok_or_else(|| fields.malformed("data", "is required"))?;

        let mut node = WorkflowNode::new(id, variant, data, position).with_handles(
            fields.parse::<HandleSide>("sourcePosition")?,
            fields.parse::<HandleSide>("targetPosition")?,
        );
        node.selected = fields.bool("selected")?.unwrap_or(false);
        Ok(DecodedNode::Node(node))
    }

    /// Decodes a record that must be a known variant.
    ///
    /// # Errors
    ///
    /// As [`decode`](Self::decode), plus `UnknownPersistedVariant` for
    /// records that would otherwise be passed through opaquely.
    pub fn decode_known(&self, record: &Value) -> Result<WorkflowNode, NodeError> {
        match self.decode(record)? {
            DecodedNode::Node(node) => Ok(node),
            DecodedNode::Opaque(opaque) => Err(opaque.as_error()),
        }
    }

    fn opaque(
        &self,
        map: &Map<String, Value>,
        kind: String,
        task_type: Option<String>,
    ) -> OpaqueNode {
        let id = map
            .get("id")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok());
        tracing::debug!(
            kind = %kind,
            task_type = ?task_type,
            "passing unknown node variant through"
        );
        OpaqueNode {
            id,
            kind,
            task_type,
            record: map.clone(),
        }
    }
}

impl Default for NodeDecoder {
    fn default() -> Self {
        Self::new(Arc::new(UlidIds), Arc::new(SystemClock))
    }
}

impl std::fmt::Debug for NodeDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeDecoder").finish_non_exhaustive()
    }
}

/// Strict deserialization: unknown variants are an error here. Missing ids
/// and timestamps are filled from wall-clock sources.
impl<'de> Deserialize<'de> for WorkflowNode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let record = Value::deserialize(deserializer)?;
        NodeDecoder::default()
            .decode_known(&record)
            .map_err(serde::de::Error::custom)
    }
}

/// Reads variant fields for `task_type` from `fields`, defaulting whatever
/// is absent. Shared by the decoder and by factory overrides so both follow
/// one default policy.
pub(crate) fn read_task(
    task_type: TaskType,
    fields: &Fields<'_>,
    now: DateTime<Utc>,
) -> Result<TaskConfig, NodeError> {
    Ok(match task_type {
        TaskType::Notification => TaskConfig::Notification(NotificationTask {
            notification_options: fields.parse("notificationOptions")?.unwrap_or_default(),
        }),
        TaskType::Assignment => {
            let defaults = AssignmentTask::due_from(now);
            TaskConfig::Assignment(AssignmentTask {
                url: fields.string("url")?.unwrap_or(defaults.url),
                deadline: fields.timestamp("deadline")?.unwrap_or(defaults.deadline),
                description: fields.string("description")?.unwrap_or(defaults.description),
                attachments: fields.string_list("attachments")?.unwrap_or(defaults.attachments),
            })
        }
        TaskType::Interview => {
            let defaults = InterviewTask::slotted_from(now);
            TaskConfig::Interview(InterviewTask {
                link: fields.string("link")?.unwrap_or(defaults.link),
                description: fields.string("description")?.unwrap_or(defaults.description),
                attachments: fields.string_list("attachments")?.unwrap_or(defaults.attachments),
                time: fields.timestamp("time")?.unwrap_or(defaults.time),
                duration: fields.parse("duration")?,
                participants: fields.string_list("participants")?,
            })
        }
        TaskType::Conditional => TaskConfig::Conditional(ConditionalTask {
            conditions: fields.parse("conditions")?.unwrap_or_default(),
            true_outcome: fields.node_ref("trueOutcome")?,
            false_outcome: fields.node_ref("falseOutcome")?,
        }),
        TaskType::Wait => {
            let defaults = WaitTask::default();
            TaskConfig::Wait(WaitTask {
                duration: fields.parse("duration")?.unwrap_or(defaults.duration),
                unit: fields.parse("unit")?.unwrap_or(defaults.unit),
                working_days_only: fields
                    .bool("workingDaysOnly")?
                    .unwrap_or(defaults.working_days_only),
                exact_date_time: fields.timestamp("exactDateTime")?,
                resume_on: fields.node_ref("resumeOn")?,
            })
        }
    })
}

/// Typed access to the fields of one record. Absent and `null` fields read
/// as `None`; wrongly shaped fields are `MalformedRecord`.
pub(crate) struct Fields<'a> {
    map: &'a Map<String, Value>,
    node_id: Option<String>,
    pub(crate) variant: String,
}

impl<'a> Fields<'a> {
    pub(crate) fn new(
        map: &'a Map<String, Value>,
        node_id: Option<String>,
        variant: impl Into<String>,
    ) -> Self {
        Self {
            map,
            node_id,
            variant: variant.into(),
        }
    }

    pub(crate) fn malformed(&self, field: &'static str, reason: impl Into<String>) -> NodeError {
        NodeError::MalformedRecord {
            node_id: self.node_id.clone(),
            variant: self.variant.clone(),
            field,
            reason: reason.into(),
        }
    }

    fn get(&self, field: &str) -> Option<&'a Value> {
        self.map.get(field).filter(|v| !v.is_null())
    }

    fn string(&self, field: &'static str) -> Result<Option<String>, NodeError> {
        match self.get(field) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(self.malformed(field, "is not a string")),
        }
    }

    fn required_string(&self, field: &'static str) -> Result<String, NodeError> {
        self.string(field)?
            .ok_or_else(|| self.malformed(field, "is required"))
    }

    fn bool(&self, field: &'static str) -> Result<Option<bool>, NodeError> {
        match self.get(field) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(_) => Err(self.malformed(field, "is not a boolean")),
        }
    }

    fn string_list(&self, field: &'static str) -> Result<Option<Vec<String>>, NodeError> {
        self.parse(field)
    }

    fn timestamp(&self, field: &'static str) -> Result<Option<DateTime<Utc>>, NodeError> {
        let Some(text) = self.string(field)? else {
            return Ok(None);
        };
        DateTime::parse_from_rfc3339(&text)
            .map(|at| Some(at.with_timezone(&Utc)))
            .map_err(|e| self.malformed(field, format!("is not an RFC 3339 timestamp: {e}")))
    }

    /// Node reference; the empty string means "not wired".
    fn node_ref(&self, field: &'static str) -> Result<Option<NodeId>, NodeError> {
        match self.string(field)? {
            None => Ok(None),
            Some(s) if s.trim().is_empty() => Ok(None),
            Some(s) => s
                .parse::<NodeId>()
                .map(Some)
                .map_err(|e| self.malformed(field, e.to_string())),
        }
    }

    fn parse<T: DeserializeOwned>(&self, field: &'static str) -> Result<Option<T>, NodeError> {
        self.get(field)
            .map(|v| {
                T::deserialize(v).map_err(|e| self.malformed(field, format!("is invalid: {e}")))
            })
            .transpose()
    }
}
