use crate::graph::WorkflowGraph;
use std::collections::VecDeque;

/// A deep copy of the graph taken before an undoable edit.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub label: &'static str,
    pub(crate) graph: WorkflowGraph,
}

/// Bounded undo stack. The oldest snapshot is dropped once `capacity` is reached.
#[derive(Debug, Clone)]
pub struct History {
    snapshots: VecDeque<Snapshot>,
    capacity: usize,
}

impl History {
    pub fn new(capacity: usize) -> Self {
        Self {
            snapshots: VecDeque::new(),
            capacity,
        }
    }

    pub(crate) fn push(&mut self, label: &'static str, graph: WorkflowGraph) {
        if self.capacity == 0 {
            return;
        }
        if self.snapshots.len() == self.capacity {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(Snapshot { label, graph });
    }

    pub(crate) fn pop(&mut self) -> Option<Snapshot> {
        self.snapshots.pop_back()
    }

    /// Label of the edit `undo` would revert.
    pub fn peek_label(&self) -> Option<&'static str> {
        self.snapshots.back().map(|s| s.label)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }
}
