//! Graph store
//!
//! Owns the nodes and edges of one workflow document and enforces
//! referential integrity. Every operation is all-or-nothing: a failed call
//! leaves the store exactly as it was.
//!
//! The store does not record history itself; callers (normally
//! [`WorkflowEditor`](crate::editor::WorkflowEditor)) commit a snapshot
//! after each call that reports a change.

use std::sync::Arc;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{GraphError, Result};
use crate::payload::NodeKind;
use crate::registry::NodeTypeRegistry;
use crate::types::{Edge, GraphSnapshot, Handles, Node, Position, RunState};
use crate::validation::ensure_integrity;

/// In-memory nodes and edges of one document
#[derive(Debug, Clone)]
pub struct GraphStore {
    registry: Arc<NodeTypeRegistry>,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl GraphStore {
    /// Create an empty store backed by `registry`
    pub fn new(registry: Arc<NodeTypeRegistry>) -> Self {
        Self {
            registry,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn registry(&self) -> &NodeTypeRegistry {
        &self.registry
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Find a node by ID
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id() == id)
    }

    /// Find an edge by ID
    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id() == id)
    }

    /// Edges touching a node on either end
    pub fn incident_edges<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.touches(node_id))
    }

    /// Append a new node with a fresh id and the default payload for `kind`
    pub fn add_node(&mut self, kind: NodeKind, position: Position) -> Node {
        let node = self.registry.create_node(kind, position);
        log::debug!("Added {} node '{}'", kind, node.id());
        self.nodes.push(node.clone());
        node
    }

    /// Shallow-merge `patch` into a node's payload
    ///
    /// Returns `Ok(false)` without touching anything if the node does not
    /// exist: an async callback may legitimately target a node that was
    /// deleted after the call started. Fails if the merged payload no
    /// longer matches the node's kind.
    pub fn update_node_payload(
        &mut self,
        node_id: &str,
        patch: &Map<String, Value>,
    ) -> Result<bool> {
        let Some(node) = self.node_mut(node_id) else {
            log::debug!("Ignoring payload update for missing node '{}'", node_id);
            return Ok(false);
        };

        let merged = node
            .payload()
            .merged(patch)
            .map_err(|e| GraphError::InvalidPayload {
                node_id: node_id.to_string(),
                reason: e.to_string(),
            })?;

        if &merged == node.payload() {
            return Ok(false);
        }
        // merged() decodes with the node's own kind, so this cannot be rejected
        let _ = node.set_payload(merged);
        Ok(true)
    }

    /// Replace a node's run state; `false` if the node is missing or unchanged
    pub fn set_run_state(&mut self, node_id: &str, run_state: RunState) -> bool {
        match self.node_mut(node_id) {
            Some(node) if node.run_state != run_state => {
                node.run_state = run_state;
                true
            }
            _ => false,
        }
    }

    /// Move a node on the canvas; `false` if missing, unchanged or not finite
    pub fn move_node(&mut self, node_id: &str, position: Position) -> bool {
        if !position.is_finite() {
            log::warn!("Ignoring non-finite position for node '{}'", node_id);
            return false;
        }
        match self.node_mut(node_id) {
            Some(node) if node.position != position => {
                node.position = position;
                true
            }
            _ => false,
        }
    }

    /// Remove a node and every edge touching it
    ///
    /// Returns the removed node and edges, or `None` if the node is missing.
    pub fn delete_node(&mut self, node_id: &str) -> Option<(Node, Vec<Edge>)> {
        let index = self.nodes.iter().position(|n| n.id() == node_id)?;
        let node = self.nodes.remove(index);

        let (removed, kept): (Vec<Edge>, Vec<Edge>) =
            std::mem::take(&mut self.edges).into_iter().partition(|e| e.touches(node_id));
        self.edges = kept;

        log::debug!(
            "Deleted node '{}' and {} incident edge(s)",
            node_id,
            removed.len()
        );
        Some((node, removed))
    }

    /// Connect two nodes
    ///
    /// Fails with [`GraphError::InvalidConnection`] if either endpoint is
    /// missing or an edge between the same ports already exists. Parallel
    /// edges on distinct handles are allowed.
    pub fn connect(&mut self, source: &str, target: &str, handles: Handles) -> Result<Edge> {
        for endpoint in [source, target] {
            if self.node(endpoint).is_none() {
                return Err(GraphError::invalid_connection(format!(
                    "node '{}' does not exist",
                    endpoint
                )));
            }
        }
        if self.edges.iter().any(|e| e.same_ports(source, target, &handles)) {
            return Err(GraphError::invalid_connection(format!(
                "'{}' is already connected to '{}' on these handles",
                source, target
            )));
        }

        let edge = Edge {
            id: Uuid::new_v4().to_string(),
            source_node_id: source.to_string(),
            target_node_id: target.to_string(),
            source_handle: handles.source,
            target_handle: handles.target,
        };
        self.edges.push(edge.clone());
        Ok(edge)
    }

    /// Remove a single edge; `None` if it does not exist
    pub fn delete_edge(&mut self, edge_id: &str) -> Option<Edge> {
        let index = self.edges.iter().position(|e| e.id == edge_id)?;
        Some(self.edges.remove(index))
    }

    /// Replace everything after checking integrity
    ///
    /// On failure the current nodes and edges are retained.
    pub fn replace_all(&mut self, nodes: Vec<Node>, edges: Vec<Edge>) -> Result<()> {
        ensure_integrity(&nodes, &edges)?;
        self.nodes = nodes;
        self.edges = edges;
        Ok(())
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
        }
    }

    /// Adopt a snapshot verbatim (used by undo/redo)
    pub fn restore(&mut self, snapshot: &GraphSnapshot) {
        self.nodes = snapshot.nodes.clone();
        self.edges = snapshot.edges.clone();
    }
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new(Arc::new(NodeTypeRegistry::with_builtins()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patch(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_connect_requires_existing_endpoints() {
        let mut store = GraphStore::default();
        let a = store.add_node(NodeKind::Source, Position::default());

        let err = store.connect(a.id(), "ghost", Handles::default()).unwrap_err();
        assert!(matches!(err, GraphError::InvalidConnection(_)));
        assert!(store.edges().is_empty());
    }

    #[test]
    fn test_connect_allows_parallel_edges_on_distinct_handles() {
        let mut store = GraphStore::default();
        let a = store.add_node(NodeKind::DatasetLoader, Position::default());
        let m = store.add_node(NodeKind::DataMerger, Position::default());

        store.connect(a.id(), m.id(), Handles::new("data", "left")).unwrap();
        store.connect(a.id(), m.id(), Handles::new("data", "right")).unwrap();
        assert!(store.connect(a.id(), m.id(), Handles::new("data", "left")).is_err());
        assert_eq!(store.edges().len(), 2);
    }

    #[test]
    fn test_delete_node_cascades_exactly_incident_edges() {
        let mut store = GraphStore::default();
        let a = store.add_node(NodeKind::Source, Position::default());
        let b = store.add_node(NodeKind::Transform, Position::default());
        let c = store.add_node(NodeKind::Analysis, Position::default());
        store.connect(a.id(), b.id(), Handles::default()).unwrap();
        store.connect(b.id(), c.id(), Handles::default()).unwrap();
        store.connect(b.id(), b.id(), Handles::default()).unwrap();
        let survivor = store.connect(a.id(), c.id(), Handles::default()).unwrap();

        let (_, removed) = store.delete_node(b.id()).unwrap();
        assert_eq!(removed.len(), 3);
        assert_eq!(store.edges(), &[survivor]);
        assert!(store.delete_node(b.id()).is_none());
    }

    #[test]
    fn test_update_payload_is_noop_for_missing_node() {
        let mut store = GraphStore::default();
        store.add_node(NodeKind::Source, Position::default());
        let before = store.snapshot();

        let changed = store
            .update_node_payload("ghost", &patch(json!({"label": "x"})))
            .unwrap();
        assert!(!changed);
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_update_payload_rejects_shape_change() {
        let mut store = GraphStore::default();
        let node = store.add_node(NodeKind::BinaryClassifier, Position::default());
        let before = store.snapshot();

        let err = store
            .update_node_payload(node.id(), &patch(json!({"model": "svm"})))
            .unwrap_err();
        assert!(matches!(err, GraphError::InvalidPayload { .. }));
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_update_payload_merges() {
        let mut store = GraphStore::default();
        let node = store.add_node(NodeKind::DataBinning, Position::default());

        let changed = store
            .update_node_payload(node.id(), &patch(json!({"column": "age", "binCount": 4})))
            .unwrap();
        assert!(changed);

        let updated = store.node(node.id()).unwrap().payload().to_value().unwrap();
        assert_eq!(updated["column"], json!("age"));
        assert_eq!(updated["binCount"], json!(4));
        assert_eq!(updated["strategy"], json!("equalWidth"));
    }

    #[test]
    fn test_replace_all_keeps_state_on_violation() {
        let mut store = GraphStore::default();
        let a = store.add_node(NodeKind::Source, Position::default());
        let before = store.snapshot();

        let dangling = Edge {
            id: "e1".to_string(),
            source_node_id: a.id().to_string(),
            target_node_id: "ghost".to_string(),
            source_handle: None,
            target_handle: None,
        };
        let err = store.replace_all(vec![a.clone()], vec![dangling]).unwrap_err();
        assert!(err.is_integrity_violation());
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_delete_edge_missing_is_none() {
        let mut store = GraphStore::default();
        assert!(store.delete_edge("nope").is_none());
    }

    #[test]
    fn test_move_ignores_non_finite_position() {
        let mut store = GraphStore::default();
        let a = store.add_node(NodeKind::Source, Position::new(1.0, 2.0));

        assert!(!store.move_node(a.id(), Position::new(f64::INFINITY, 0.0)));
        assert!(store.move_node(a.id(), Position::new(3.0, 4.0)));
        assert_eq!(store.node(a.id()).unwrap().position, Position::new(3.0, 4.0));
    }
}
