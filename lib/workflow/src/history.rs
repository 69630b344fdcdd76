//! Bounded undo/redo for workflow edits.
//!
//! Editors call [`EditHistory::record`] before each change. Snapshots are
//! identity-preserving copies, so undoing puts back the exact nodes,
//! ids included.

use crate::definition::Workflow;
use crate::edge::Edge;
use crate::record::DecodedNode;
use std::collections::VecDeque;

/// Default number of undo steps kept.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Node and edge lists of a workflow at one point in time.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowSnapshot {
    pub(crate) nodes: Vec<DecodedNode>,
    pub(crate) edges: Vec<Edge>,
}

impl WorkflowSnapshot {
    #[must_use]
    pub fn nodes(&self) -> &[DecodedNode] {
        &self.nodes
    }

    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }
}

/// Undo and redo stacks for one workflow.
#[derive(Debug, Clone)]
pub struct EditHistory {
    undo: VecDeque<WorkflowSnapshot>,
    redo: Vec<WorkflowSnapshot>,
    limit: usize,
}

impl EditHistory {
    /// Keeps at most `limit` undo steps; the oldest fall off first.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Saves the current state ahead of an edit. Clears the redo stack.
    pub fn record(&mut self, workflow: &Workflow) {
        self.redo.clear();
        self.push_undo(workflow.snapshot());
    }

    /// Reverts the last recorded edit. Returns false when there is nothing
    /// to undo.
    pub fn undo(&mut self, workflow: &mut Workflow) -> bool {
        let Some(previous) = self.undo.pop_back() else {
            return false;
        };
        self.redo.push(workflow.snapshot());
        workflow.restore(previous);
        true
    }

    /// Re-applies the last undone edit.
    pub fn redo(&mut self, workflow: &mut Workflow) -> bool {
        let Some(next) = self.redo.pop() else {
            return false;
        };
        self.push_undo(workflow.snapshot());
        workflow.restore(next);
        true
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Number of undo steps held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.undo.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.undo.is_empty()
    }

    fn push_undo(&mut self, snapshot: WorkflowSnapshot) {
        if self.undo.len() == self.limit {
            self.undo.pop_front();
        }
        self.undo.push_back(snapshot);
    }
}

impl Default for EditHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::{NodeFactory, PaletteItem, SequentialIds};
    use crate::node::{NodeData, Position};
    use chrono::{DateTime, TimeZone, Utc};
    use jobdesk_core::{FixedClock, UserId};
    use std::sync::Arc;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 12, 0, 0).unwrap()
    }

    fn setup() -> (NodeFactory, Workflow) {
        let factory =
            NodeFactory::new(Arc::new(SequentialIds::new()), Arc::new(FixedClock::new(now())));
        let owner: UserId = "usr_1".parse().expect("user id");
        (factory, Workflow::new("Hiring", owner, now()))
    }

    fn place(workflow: &mut Workflow, factory: &NodeFactory) {
        workflow
            .place_node(factory, PaletteItem::Wait, NodeData::new("Hold"), Position::default())
            .expect("place");
    }

    #[test]
    fn undo_restores_exact_nodes() {
        let (factory, mut workflow) = setup();
        let mut history = EditHistory::default();
        place(&mut workflow, &factory);
        let before = workflow.snapshot();

        history.record(&workflow);
        place(&mut workflow, &factory);
        assert_eq!(workflow.node_count(), 2);

        assert!(history.undo(&mut workflow));
        assert_eq!(workflow.snapshot(), before);
        assert!(history.can_redo());

        assert!(history.redo(&mut workflow));
        assert_eq!(workflow.node_count(), 2);
        assert!(!history.can_redo());
    }

    #[test]
    fn new_edit_clears_redo() {
        let (factory, mut workflow) = setup();
        let mut history = EditHistory::default();
        history.record(&workflow);
        place(&mut workflow, &factory);
        assert!(history.undo(&mut workflow));

        history.record(&workflow);
        place(&mut workflow, &factory);
        assert!(!history.can_redo());
        assert!(!history.redo(&mut workflow));
    }

    #[test]
    fn oldest_steps_fall_off() {
        let (factory, mut workflow) = setup();
        let mut history = EditHistory::new(2);
        for _ in 0..3 {
            history.record(&workflow);
            place(&mut workflow, &factory);
        }
        assert_eq!(history.len(), 2);
        assert!(history.undo(&mut workflow));
        assert!(history.undo(&mut workflow));
        assert!(!history.undo(&mut workflow));
        assert_eq!(workflow.node_count(), 1);
        assert!(history.is_empty());
    }
}
