//! Workflow node variants.
//!
//! Every node exposes the same base surface (id, kind, canvas position,
//! label) and carries exactly one variant:
//! - `Start` and `End` control-flow markers, which never have a task type
//! - `Task` nodes, each with one of five task payloads (notification,
//!   assignment, interview, conditional branch, wait)
//!
//! The id and the variant are fixed once a node is built. Editors mutate the
//! position, the label data and the fields *inside* a task payload, but
//! cannot swap one payload for another.

use crate::condition::Condition;
use chrono::{DateTime, TimeDelta, Utc};
use jobdesk_core::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Days an assignment stays open when no deadline is given.
pub const DEFAULT_ASSIGNMENT_DAYS: i64 = 7;

/// Days ahead an interview is slotted when no time is given.
pub const DEFAULT_INTERVIEW_DAYS: i64 = 1;

/// Top-level node discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Entry point of a workflow.
    Start,
    /// Terminal marker.
    End,
    /// A node that performs or schedules an action.
    Task,
}

impl NodeKind {
    /// Returns the persisted tag for this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::End => "end",
            Self::Task => "task",
        }
    }

    /// Parses a persisted tag, returning `None` for tags this build does not know.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "start" => Some(Self::Start),
            "end" => Some(Self::End),
            "task" => Some(Self::Task),
            _ => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Second-level discriminant for task nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    Notification,
    Assignment,
    Interview,
    Conditional,
    Wait,
}

impl TaskType {
    /// All task types, in palette order.
    pub const ALL: [TaskType; 5] = [
        Self::Notification,
        Self::Assignment,
        Self::Interview,
        Self::Conditional,
        Self::Wait,
    ];

    /// Returns the persisted tag for this task type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Notification => "notification",
            Self::Assignment => "assignment",
            Self::Interview => "interview",
            Self::Conditional => "conditional",
            Self::Wait => "wait",
        }
    }

    /// Parses a persisted tag, returning `None` for tags this build does not know.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == tag)
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canvas coordinate of a node.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Side of a node an edge anchors to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandleSide {
    Top,
    Right,
    Bottom,
    Left,
}

/// Templated email sent to the applicant (accept/reject notices and the like).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmailConfig {
    pub subject: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
}

/// Short text message for SMS or WhatsApp delivery.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MessageConfig {
    pub body: String,
}

/// Display data shared by every variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    /// Display name on the canvas.
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_config: Option<EmailConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_config: Option<MessageConfig>,
}

impl NodeData {
    /// Creates label-only data.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            email_config: None,
            message_config: None,
        }
    }

    /// Attaches an email payload.
    #[must_use]
    pub fn with_email(mut self, email: EmailConfig) -> Self {
        self.email_config = Some(email);
        self
    }

    /// Attaches a text message payload.
    #[must_use]
    pub fn with_message(mut self, message: MessageConfig) -> Self {
        self.message_config = Some(message);
        self
    }
}

/// Delivery channel for a notification task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
    Email,
    Sms,
    Whatsapp,
}

/// Notify the applicant over one or more channels.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationTask {
    pub notification_options: BTreeSet<NotificationChannel>,
}

/// Take-home assignment handed to the applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentTask {
    pub url: String,
    pub deadline: DateTime<Utc>,
    pub description: String,
    pub attachments: Vec<String>,
}

impl AssignmentTask {
    /// An empty assignment due [`DEFAULT_ASSIGNMENT_DAYS`] after `now`.
    #[must_use]
    pub fn due_from(now: DateTime<Utc>) -> Self {
        Self {
            url: String::new(),
            deadline: now + TimeDelta::days(DEFAULT_ASSIGNMENT_DAYS),
            description: String::new(),
            attachments: Vec::new(),
        }
    }
}

/// Interview slot with the applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewTask {
    pub link: String,
    pub description: String,
    pub attachments: Vec<String>,
    pub time: DateTime<Utc>,
    /// Length in minutes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participants: Option<Vec<String>>,
}

impl InterviewTask {
    /// An empty interview slotted [`DEFAULT_INTERVIEW_DAYS`] after `now`.
    #[must_use]
    pub fn slotted_from(now: DateTime<Utc>) -> Self {
        Self {
            link: String::new(),
            description: String::new(),
            attachments: Vec::new(),
            time: now + TimeDelta::days(DEFAULT_INTERVIEW_DAYS),
            duration: None,
            participants: None,
        }
    }
}

/// Two-way branch on applicant facts.
///
/// The outcome ids are checked against the owning workflow's node list by
/// [`Workflow::validate`](crate::definition::Workflow::validate), not here.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionalTask {
    pub conditions: Vec<Condition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub true_outcome: Option<NodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub false_outcome: Option<NodeId>,
}

/// Unit of a relative wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitUnit {
    Minutes,
    Hours,
    #[default]
    Days,
    Weeks,
}

/// Pause before continuing to `resume_on`.
///
/// When `exact_date_time` is set it takes precedence over the relative
/// `duration`/`unit` pair; both are still stored independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitTask {
    pub duration: u32,
    pub unit: WaitUnit,
    pub working_days_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exact_date_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_on: Option<NodeId>,
}

impl Default for WaitTask {
    fn default() -> Self {
        Self {
            duration: 1,
            unit: WaitUnit::Days,
            working_days_only: false,
            exact_date_time: None,
            resume_on: None,
        }
    }
}

/// Payload of a task node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TaskConfig {
    Notification(NotificationTask),
    Assignment(AssignmentTask),
    Interview(InterviewTask),
    Conditional(ConditionalTask),
    Wait(WaitTask),
}

impl TaskConfig {
    /// Builds the default payload for `task_type`, with relative
    /// timestamps computed from `now`.
    #[must_use]
    pub fn defaults(task_type: TaskType, now: DateTime<Utc>) -> Self {
        match task_type {
            TaskType::Notification => Self::Notification(NotificationTask::default()),
            TaskType::Assignment => Self::Assignment(AssignmentTask::due_from(now)),
            TaskType::Interview => Self::Interview(InterviewTask::slotted_from(now)),
            TaskType::Conditional => Self::Conditional(ConditionalTask::default()),
            TaskType::Wait => Self::Wait(WaitTask::default()),
        }
    }

    /// Returns the task type of this payload.
    #[must_use]
    pub const fn task_type(&self) -> TaskType {
        match self {
            Self::Notification(_) => TaskType::Notification,
            Self::Assignment(_) => TaskType::Assignment,
            Self::Interview(_) => TaskType::Interview,
            Self::Conditional(_) => TaskType::Conditional,
            Self::Wait(_) => TaskType::Wait,
        }
    }
}

/// Mutable view into a task payload that cannot change its task type.
#[derive(Debug)]
pub enum TaskConfigMut<'a> {
    Notification(&'a mut NotificationTask),
    Assignment(&'a mut AssignmentTask),
    Interview(&'a mut InterviewTask),
    Conditional(&'a mut ConditionalTask),
    Wait(&'a mut WaitTask),
}

/// The closed set of node shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeVariant {
    Start,
    End,
    Task(TaskConfig),
}

impl NodeVariant {
    #[must_use]
    pub const fn kind(&self) -> NodeKind {
        match self {
            Self::Start => NodeKind::Start,
            Self::End => NodeKind::End,
            Self::Task(_) => NodeKind::Task,
        }
    }

    /// Returns the task type; `None` for start and end markers.
    #[must_use]
    pub const fn task_type(&self) -> Option<TaskType> {
        match self {
            Self::Task(task) => Some(task.task_type()),
            Self::Start | Self::End => None,
        }
    }
}

/// A node in a workflow graph.
///
/// `Clone` is the identity-preserving deep copy: every nested list and
/// timestamp is owned, so a clone never aliases its source. Use
/// [`NodeFactory::duplicate`](crate::factory::NodeFactory::duplicate) for a
/// copy that gets a fresh id.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowNode {
    id: NodeId,
    variant: NodeVariant,
    /// Canvas position, updated while dragging.
    pub position: Position,
    /// Label and optional message payloads.
    pub data: NodeData,
    /// Side outgoing edges anchor to.
    pub source_position: Option<HandleSide>,
    /// Side incoming edges anchor to.
    pub target_position: Option<HandleSide>,
    /// Transient editor selection flag.
    pub selected: bool,
}

impl WorkflowNode {
    /// Creates a node with the given identity and variant.
    #[must_use]
    pub fn new(id: NodeId, variant: NodeVariant, data: NodeData, position: Position) -> Self {
        Self {
            id,
            variant,
            position,
            data,
            source_position: None,
            target_position: None,
            selected: false,
        }
    }

    /// Sets the edge anchor sides.
    #[must_use]
    pub fn with_handles(mut self, source: Option<HandleSide>, target: Option<HandleSide>) -> Self {
        self.source_position = source;
        self.target_position = target;
        self
    }

    /// Returns the node's unique ID.
    #[must_use]
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    /// Returns the node kind.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.variant.kind()
    }

    /// Task type, `None` for start and end nodes.
    #[must_use]
    pub fn task_type(&self) -> Option<TaskType> {
        self.variant.task_type()
    }

    /// Returns the node variant with its task payload.
    #[must_use]
    pub fn variant(&self) -> &NodeVariant {
        &self.variant
    }

    /// Display label shown on the canvas.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.data.label
    }

    /// Returns the task payload, if this is a task node.
    #[must_use]
    pub fn task(&self) -> Option<&TaskConfig> {
        match &self.variant {
            NodeVariant::Task(task) => Some(task),
            NodeVariant::Start | NodeVariant::End => None,
        }
    }

    /// Returns a mutable view of the task payload, if this is a task node.
    pub fn task_mut(&mut self) -> Option<TaskConfigMut<'_>> {
        let NodeVariant::Task(task) = &mut self.variant else {
            return None;
        };
        Some(match task {
            TaskConfig::Notification(t) => TaskConfigMut::Notification(t),
            TaskConfig::Assignment(t) => TaskConfigMut::Assignment(t),
            TaskConfig::Interview(t) => TaskConfigMut::Interview(t),
            TaskConfig::Conditional(t) => TaskConfigMut::Conditional(t),
            TaskConfig::Wait(t) => TaskConfigMut::Wait(t),
        })
    }

    /// Identity-preserving deep copy, used for undo/redo snapshots.
    #[must_use]
    pub fn snapshot(&self) -> Self {
        self.clone()
    }

    /// Node ids this node points at outside of edges: conditional outcomes
    /// and the wait resume target, paired with their field names.
    #[must_use]
    pub fn references(&self) -> Vec<(&'static str, &NodeId)> {
        match self.task() {
            Some(TaskConfig::Conditional(c)) => [
                ("trueOutcome", c.true_outcome.as_ref()),
                ("falseOutcome", c.false_outcome.as_ref()),
            ]
            .into_iter()
            .filter_map(|(field, target)| target.map(|t| (field, t)))
            .collect(),
            Some(TaskConfig::Wait(w)) => w
                .resume_on
                .as_ref()
                .map(|t| vec![("resumeOn", t)])
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Rewrites outcome/resume references through `map`; references for
    /// which `map` returns `None` are cleared.
    pub fn remap_references(&mut self, mut map: impl FnMut(&NodeId) -> Option<NodeId>) {
        match self.task_mut() {
            Some(TaskConfigMut::Conditional(c)) => {
                c.true_outcome = c.true_outcome.as_ref().and_then(&mut map);
                c.false_outcome = c.false_outcome.as_ref().and_then(&mut map);
            }
            Some(TaskConfigMut::Wait(w)) => {
                w.resume_on = w.resume_on.as_ref().and_then(&mut map);
            }
            _ => {}
        }
    }

    /// Same node under a different identity.
    pub(crate) fn reidentified(mut self, id: NodeId) -> Self {
        self.id = id;
        self
    }
}

/// Flat persisted shape: base fields plus the task payload's fields at the
/// top level, discriminated by `kind` and `taskType`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NodeWire<'a> {
    id: &'a NodeId,
    kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    task_type: Option<TaskType>,
    position: &'a Position,
    data: &'a NodeData,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_position: Option<HandleSide>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target_position: Option<HandleSide>,
    selected: bool,
    #[serde(flatten)]
    task: Option<&'a TaskConfig>,
}

impl Serialize for WorkflowNode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        NodeWire {
            id: &self.id,
            kind: self.kind(),
            task_type: self.task_type(),
            position: &self.position,
            data: &self.data,
            source_position: self.source_position,
            target_position: self.target_position,
            selected: self.selected,
            task: self.task(),
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 12, 0, 0).unwrap()
    }

    fn node_id(s: &str) -> NodeId {
        s.parse().expect("node id")
    }

    #[test]
    fn start_and_end_have_no_task_type() {
        let start = WorkflowNode::new(
            node_id("n1"),
            NodeVariant::Start,
            NodeData::new("Start"),
            Position::default(),
        );
        assert_eq!(start.kind(), NodeKind::Start);
        assert_eq!(start.task_type(), None);
        assert!(start.task().is_none());

        let mut end = WorkflowNode::new(
            node_id("n2"),
            NodeVariant::End,
            NodeData::new("End"),
            Position::default(),
        );
        assert_eq!(end.kind(), NodeKind::End);
        assert!(end.task_mut().is_none());
    }

    #[test]
    fn task_defaults_follow_variant_table() {
        let TaskConfig::Assignment(a) = TaskConfig::defaults(TaskType::Assignment, now()) else {
            panic!("expected assignment");
        };
        assert_eq!(a.deadline, now() + TimeDelta::days(7));
        assert!(a.url.is_empty() && a.description.is_empty() && a.attachments.is_empty());

        let TaskConfig::Interview(i) = TaskConfig::defaults(TaskType::Interview, now()) else {
            panic!("expected interview");
        };
        assert_eq!(i.time, now() + TimeDelta::days(1));
        assert_eq!(i.duration, None);
        assert_eq!(i.participants, None);

        let TaskConfig::Wait(w) = TaskConfig::defaults(TaskType::Wait, now()) else {
            panic!("expected wait");
        };
        assert_eq!((w.duration, w.unit, w.working_days_only), (1, WaitUnit::Days, false));
    }

    #[test]
    fn task_mut_edits_in_place_without_changing_type() {
        let mut node = WorkflowNode::new(
            node_id("n1"),
            NodeVariant::Task(TaskConfig::defaults(TaskType::Notification, now())),
            NodeData::new("Notify"),
            Position::default(),
        );
        if let Some(TaskConfigMut::Notification(n)) = node.task_mut() {
            n.notification_options.insert(NotificationChannel::Sms);
        }
        assert_eq!(node.task_type(), Some(TaskType::Notification));
        let Some(TaskConfig::Notification(n)) = node.task() else {
            panic!("expected notification");
        };
        assert!(n.notification_options.contains(&NotificationChannel::Sms));
    }

    #[test]
    fn snapshot_is_independent() {
        let mut original = WorkflowNode::new(
            node_id("n1"),
            NodeVariant::Task(TaskConfig::defaults(TaskType::Assignment, now())),
            NodeData::new("Take-home"),
            Position::new(10.0, 20.0),
        );
        let mut copy = original.snapshot();
        assert_eq!(copy, original);

        copy.position.x = 99.0;
        if let Some(TaskConfigMut::Assignment(a)) = copy.task_mut() {
            a.attachments.push("brief.pdf".to_string());
        }
        assert_eq!(original.position.x, 10.0);
        let Some(TaskConfig::Assignment(a)) = original.task() else {
            panic!("expected assignment");
        };
        assert!(a.attachments.is_empty());

        original.data.label = "Renamed".to_string();
        assert_eq!(copy.label(), "Take-home");
        assert_eq!(copy.id(), original.id());
    }

    #[test]
    fn serializes_flat_with_discriminants() {
        let node = WorkflowNode::new(
            node_id("n9"),
            NodeVariant::Task(TaskConfig::defaults(TaskType::Wait, now())),
            NodeData::new("Cool-off"),
            Position::new(1.0, 2.0),
        )
        .with_handles(Some(HandleSide::Right), Some(HandleSide::Left));

        let value = serde_json::to_value(&node).expect("serialize");
        assert_eq!(value["id"], "n9");
        assert_eq!(value["kind"], "task");
        assert_eq!(value["taskType"], "wait");
        assert_eq!(value["unit"], "days");
        assert_eq!(value["duration"], 1);
        assert_eq!(value["workingDaysOnly"], false);
        assert_eq!(value["sourcePosition"], "right");
        assert_eq!(value["data"]["label"], "Cool-off");
        assert!(value.get("exactDateTime").is_none());
    }

    #[test]
    fn start_node_serializes_without_task_fields() {
        let node = WorkflowNode::new(
            node_id("s"),
            NodeVariant::Start,
            NodeData::new("Applied"),
            Position::default(),
        );
        let value = serde_json::to_value(&node).expect("serialize");
        assert_eq!(value["kind"], "start");
        assert!(value.get("taskType").is_none());
        assert!(value.get("sourcePosition").is_none());
    }

    #[test]
    fn references_and_remap() {
        let mut node = WorkflowNode::new(
            node_id("c"),
            NodeVariant::Task(TaskConfig::Conditional(ConditionalTask {
                conditions: Vec::new(),
                true_outcome: Some(node_id("yes")),
                false_outcome: Some(node_id("no")),
            })),
            NodeData::new("Screen"),
            Position::default(),
        );
        assert_eq!(node.references().len(), 2);

        node.remap_references(|id| (id.as_str() == "yes").then(|| node_id("yes_2")));
        let Some(TaskConfig::Conditional(c)) = node.task() else {
            panic!("expected conditional");
        };
        assert_eq!(c.true_outcome, Some(node_id("yes_2")));
        assert_eq!(c.false_outcome, None);
    }

    #[test]
    fn tags_parse() {
        assert_eq!(NodeKind::from_tag("task"), Some(NodeKind::Task));
        assert_eq!(NodeKind::from_tag("Task"), None);
        assert_eq!(TaskType::from_tag("wait"), Some(TaskType::Wait));
        assert_eq!(TaskType::from_tag("survey"), None);
    }
}
