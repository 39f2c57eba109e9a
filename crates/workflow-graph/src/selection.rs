//! Selection/focus tracking
//!
//! Tracks at most one active node for inspector display. The tracker keeps
//! a cached copy of the selected node for cheap reads, and must be resynced
//! after every store change so it never exposes a deleted or stale node.

use crate::store::GraphStore;
use crate::types::Node;

#[derive(Debug, Clone, Default)]
pub struct SelectionTracker {
    selected: Option<Node>,
}

impl SelectionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a node, or clear the selection with `None`
    ///
    /// Selecting an id that is not in the store clears the selection.
    pub fn select(&mut self, node_id: Option<&str>, store: &GraphStore) -> Option<&Node> {
        self.selected = node_id.and_then(|id| store.node(id)).cloned();
        self.selected.as_ref()
    }

    /// Re-resolve the cached node against the store
    pub fn resync(&mut self, store: &GraphStore) {
        if let Some(current) = self.selected.take() {
            self.selected = store.node(current.id()).cloned();
            if self.selected.is_none() {
                log::debug!("Selected node '{}' no longer exists", current.id());
            }
        }
    }

    pub fn selected(&self) -> Option<&Node> {
        self.selected.as_ref()
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected.as_ref().map(|n| n.id())
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }
}
