//! Undo/redo history using whole-graph snapshots
//!
//! Every committed mutation pushes an immutable `(nodes, edges)` snapshot.
//! A cursor marks the live snapshot; undo and redo only move the cursor,
//! and a new commit drops whatever lay ahead of it.
//!
//! # Design Choice: Snapshots vs Command Pattern
//!
//! Graphs here hold tens of nodes, so copying the whole state is cheap and
//! needs no inverse operation per mutation. Snapshots are shared through
//! `Arc`, so reading one back never copies it.
//!
//! # Eviction
//!
//! The stack is bounded. Once it holds `capacity` snapshots, each commit
//! evicts the oldest one, which permanently moves the undo floor forward.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::types::GraphSnapshot;

/// Default number of snapshots kept
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Bounded linear undo/redo stack
#[derive(Debug, Clone)]
pub struct HistoryManager {
    snapshots: VecDeque<Arc<GraphSnapshot>>,
    /// Index of the live snapshot
    cursor: usize,
    capacity: usize,
}

impl HistoryManager {
    /// Create a history rooted at `initial`
    ///
    /// The root snapshot is the floor that undo cannot go below.
    pub fn new(initial: GraphSnapshot, capacity: usize) -> Self {
        let mut snapshots = VecDeque::new();
        snapshots.push_back(Arc::new(initial));
        Self {
            snapshots,
            cursor: 0,
            capacity: capacity.max(1), // At least the live snapshot
        }
    }

    /// Record the state produced by a committed mutation
    ///
    /// This truncates any redo history (snapshots after the cursor).
    pub fn commit(&mut self, snapshot: GraphSnapshot) {
        self.snapshots.truncate(self.cursor + 1);
        self.snapshots.push_back(Arc::new(snapshot));
        self.cursor = self.snapshots.len() - 1;

        while self.snapshots.len() > self.capacity {
            self.snapshots.pop_front();
            self.cursor -= 1;
            log::debug!("History full, evicted oldest snapshot");
        }
    }

    /// Move back one snapshot
    ///
    /// Returns the snapshot to adopt, or `None` at the oldest snapshot.
    pub fn undo(&mut self) -> Option<Arc<GraphSnapshot>> {
        if self.cursor > 0 {
            self.cursor -= 1;
            Some(Arc::clone(&self.snapshots[self.cursor]))
        } else {
            None
        }
    }

    /// Move forward one snapshot
    ///
    /// Returns the snapshot to adopt, or `None` when there is no redo tail.
    pub fn redo(&mut self) -> Option<Arc<GraphSnapshot>> {
        if self.cursor + 1 < self.snapshots.len() {
            self.cursor += 1;
            Some(Arc::clone(&self.snapshots[self.cursor]))
        } else {
            None
        }
    }

    /// The live snapshot
    pub fn current(&self) -> Arc<GraphSnapshot> {
        Arc::clone(&self.snapshots[self.cursor])
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    /// Number of snapshots held (including the live one)
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Always false: the live snapshot is never evicted
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Cursor position, 0 being the oldest snapshot kept
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop all history and re-root it at `snapshot`
    pub fn reset(&mut self, snapshot: GraphSnapshot) {
        self.snapshots.clear();
        self.snapshots.push_back(Arc::new(snapshot));
        self.cursor = 0;
    }
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(GraphSnapshot::default(), DEFAULT_HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{GenericPayload, NodePayload};
    use crate::types::{Node, Position};

    fn make_snapshot(name: &str) -> GraphSnapshot {
        let payload = NodePayload::Source(GenericPayload {
            label: name.to_string(),
            ..Default::default()
        });
        GraphSnapshot {
            nodes: vec![Node::new("node1", Position::default(), payload)],
            edges: Vec::new(),
        }
    }

    fn label(snapshot: &GraphSnapshot) -> &str {
        snapshot.nodes[0].payload().label()
    }

    #[test]
    fn test_commit_and_undo() {
        let mut history = HistoryManager::new(make_snapshot("first"), 10);
        history.commit(make_snapshot("second"));
        history.commit(make_snapshot("third"));

        assert_eq!(label(&history.current()), "third");

        let undone = history.undo().unwrap();
        assert_eq!(label(&undone), "second");

        let undone = history.undo().unwrap();
        assert_eq!(label(&undone), "first");

        // Can't undo further
        assert!(history.undo().is_none());
        assert_eq!(label(&history.current()), "first");
    }

    #[test]
    fn test_redo() {
        let mut history = HistoryManager::new(make_snapshot("first"), 10);
        history.commit(make_snapshot("second"));

        history.undo();

        let redone = history.redo().unwrap();
        assert_eq!(label(&redone), "second");

        // Can't redo further
        assert!(history.redo().is_none());
    }

    #[test]
    fn test_commit_truncates_redo() {
        let mut history = HistoryManager::new(make_snapshot("first"), 10);
        history.commit(make_snapshot("second"));
        history.undo();

        history.commit(make_snapshot("third"));

        assert!(!history.can_redo());
        assert_eq!(history.len(), 2);
        assert_eq!(label(&history.current()), "third");
        assert_eq!(label(&history.undo().unwrap()), "first");
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut history = HistoryManager::new(make_snapshot("graph_0"), 3);
        for i in 1..5 {
            history.commit(make_snapshot(&format!("graph_{}", i)));
        }

        assert_eq!(history.len(), 3);
        assert_eq!(label(&history.current()), "graph_4");

        // Only graph_3 and graph_2 remain behind the cursor
        history.undo();
        assert_eq!(label(&history.undo().unwrap()), "graph_2");
        assert!(!history.can_undo());
    }

    #[test]
    fn test_can_undo_redo() {
        let mut history = HistoryManager::default();
        assert!(!history.can_undo());
        assert!(!history.can_redo());

        history.commit(make_snapshot("first"));
        assert!(history.can_undo());
        assert!(!history.can_redo());

        history.undo();
        assert!(!history.can_undo());
        assert!(history.can_redo());
        assert_eq!(history.position(), 0);
    }

    #[test]
    fn test_reset() {
        let mut history = HistoryManager::new(make_snapshot("first"), 10);
        history.commit(make_snapshot("second"));
        history.reset(make_snapshot("loaded"));

        assert_eq!(history.len(), 1);
        assert!(!history.can_undo());
        assert_eq!(label(&history.current()), "loaded");
    }
}
