//! Workflow editor
//!
//! One editor owns one open document: its metadata, the graph store, the
//! history and the selection. All consumers receive the editor (or a
//! reference to it) explicitly; there is no global instance, so several
//! documents can be open side by side.
//!
//! Each mutating call that changes the graph commits exactly one history
//! snapshot, taken after the change is fully applied, then resyncs the
//! selection. Run-state and result updates coming from execution or preview
//! are not history entries.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::Result;
use crate::history::{HistoryManager, DEFAULT_HISTORY_CAPACITY};
use crate::payload::NodeKind;
use crate::registry::NodeTypeRegistry;
use crate::selection::SelectionTracker;
use crate::store::GraphStore;
use crate::types::{
    Edge, GraphSnapshot, Handles, Node, Position, RunState, WorkflowDocument, WorkflowId,
};

/// Editing session state for a single workflow document
#[derive(Debug, Clone)]
pub struct WorkflowEditor {
    id: Option<WorkflowId>,
    name: String,
    description: String,
    store: GraphStore,
    history: HistoryManager,
    selection: SelectionTracker,
}

impl WorkflowEditor {
    /// Create an editor for a new, empty, unsaved document
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_registry(
            name,
            Arc::new(NodeTypeRegistry::with_builtins()),
            DEFAULT_HISTORY_CAPACITY,
        )
    }

    /// Create an editor with a custom registry and history capacity
    pub fn with_registry(
        name: impl Into<String>,
        registry: Arc<NodeTypeRegistry>,
        history_capacity: usize,
    ) -> Self {
        let store = GraphStore::new(registry);
        let history = HistoryManager::new(store.snapshot(), history_capacity);
        Self {
            id: None,
            name: name.into(),
            description: String::new(),
            store,
            history,
            selection: SelectionTracker::new(),
        }
    }

    // ─── DOCUMENT METADATA ──────────────────────────────────────────

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Record the id assigned by the first successful save
    pub fn set_id(&mut self, id: impl Into<WorkflowId>) {
        self.id = Some(id.into());
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    // ─── READ ACCESS ────────────────────────────────────────────────

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn nodes(&self) -> &[Node] {
        self.store.nodes()
    }

    pub fn edges(&self) -> &[Edge] {
        self.store.edges()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.store.node(id)
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn snapshot(&self) -> GraphSnapshot {
        self.store.snapshot()
    }

    /// Full document, as it would be persisted
    pub fn document(&self) -> WorkflowDocument {
        WorkflowDocument {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            nodes: self.store.nodes().to_vec(),
            edges: self.store.edges().to_vec(),
        }
    }

    // ─── MUTATIONS ──────────────────────────────────────────────────

    fn commit(&mut self) {
        self.history.commit(self.store.snapshot());
        self.selection.resync(&self.store);
    }

    /// Add a node of `kind` with its default payload
    pub fn add_node(&mut self, kind: NodeKind, position: Position) -> Node {
        let node = self.store.add_node(kind, position);
        self.commit();
        node
    }

    /// Shallow-merge `patch` into a node's payload
    ///
    /// Silently does nothing if the node no longer exists.
    pub fn update_node_payload(&mut self, node_id: &str, patch: &Map<String, Value>) -> Result<()> {
        if self.store.update_node_payload(node_id, patch)? {
            self.commit();
        }
        Ok(())
    }

    /// Move a node on the canvas
    pub fn move_node(&mut self, node_id: &str, position: Position) {
        if self.store.move_node(node_id, position) {
            self.commit();
        }
    }

    /// Delete a node together with its incident edges
    ///
    /// Clears the selection if the node was selected.
    pub fn delete_node(&mut self, node_id: &str) -> Option<Node> {
        let (node, _) = self.store.delete_node(node_id)?;
        self.commit();
        Some(node)
    }

    /// Connect two nodes, optionally on named handles
    pub fn connect(
        &mut self,
        source: &str,
        target: &str,
        handles: Option<Handles>,
    ) -> Result<Edge> {
        let edge = self
            .store
            .connect(source, target, handles.unwrap_or_default())
            .inspect_err(|e| log::warn!("Rejected connection: {}", e))?;
        self.commit();
        Ok(edge)
    }

    /// Delete an edge; no-op if it does not exist
    pub fn delete_edge(&mut self, edge_id: &str) -> Option<Edge> {
        let edge = self.store.delete_edge(edge_id)?;
        self.commit();
        Some(edge)
    }

    /// Replace all nodes and edges after an integrity check
    pub fn replace_all(&mut self, nodes: Vec<Node>, edges: Vec<Edge>) -> Result<()> {
        self.store
            .replace_all(nodes, edges)
            .inspect_err(|e| log::warn!("Rejected bulk replace: {}", e))?;
        self.commit();
        Ok(())
    }

    /// Adopt a loaded document as the live one
    ///
    /// The graph goes through [`replace_all`](Self::replace_all)'s integrity
    /// check; on success the history is re-rooted at the loaded state and
    /// the selection cleared. On failure nothing changes.
    pub fn load_document(&mut self, document: WorkflowDocument) -> Result<()> {
        self.store.replace_all(document.nodes, document.edges)?;
        self.id = document.id;
        self.name = document.name;
        self.description = document.description;
        self.history.reset(self.store.snapshot());
        self.selection.clear();
        log::info!(
            "Loaded workflow '{}' ({} nodes, {} edges)",
            self.name,
            self.store.nodes().len(),
            self.store.edges().len()
        );
        Ok(())
    }

    // ─── HISTORY ────────────────────────────────────────────────────

    /// Step back one snapshot; `false` if already at the oldest
    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(snapshot) => {
                self.store.restore(&snapshot);
                self.selection.resync(&self.store);
                true
            }
            None => false,
        }
    }

    /// Step forward one snapshot; `false` if there is nothing to redo
    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(snapshot) => {
                self.store.restore(&snapshot);
                self.selection.resync(&self.store);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    // ─── SELECTION ──────────────────────────────────────────────────

    /// Select a node for the inspector, or clear with `None`
    pub fn select(&mut self, node_id: Option<&str>) -> Option<&Node> {
        self.selection.select(node_id, &self.store)
    }

    pub fn selected(&self) -> Option<&Node> {
        self.selection.selected()
    }

    // ─── RUN UPDATES ────────────────────────────────────────────────

    /// Apply a run-state change from execution or preview
    ///
    /// Missing nodes are ignored. Not recorded in history.
    pub fn apply_run_state(&mut self, node_id: &str, run_state: RunState) -> bool {
        let changed = self.store.set_run_state(node_id, run_state);
        if changed {
            self.selection.resync(&self.store);
        }
        changed
    }

    /// Merge result fields from execution or preview into a node's payload
    ///
    /// Missing nodes are ignored. Not recorded in history.
    pub fn apply_results(&mut self, node_id: &str, fragment: &Map<String, Value>) -> Result<bool> {
        let changed = self.store.update_node_payload(node_id, fragment)?;
        if changed {
            self.selection.resync(&self.store);
        }
        Ok(changed)
    }

    /// Reset every node's run state to idle
    pub fn reset_run_states(&mut self) {
        let ids: Vec<String> = self.store.nodes().iter().map(|n| n.id().to_string()).collect();
        for id in ids {
            self.store.set_run_state(&id, RunState::default());
        }
        self.selection.resync(&self.store);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;
    use crate::types::RunStatus;
    use crate::validation::validate_graph;
    use serde_json::json;

    fn patch(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn assert_integrity(editor: &WorkflowEditor) {
        assert!(validate_graph(editor.nodes(), editor.edges()).is_empty());
        for node in editor.nodes() {
            assert_eq!(node.payload().kind(), node.kind());
        }
    }

    #[test]
    fn test_delete_source_leaves_single_node() {
        let mut editor = WorkflowEditor::new("Scenario");
        let a = editor.add_node(NodeKind::DatasetLoader, Position::new(0.0, 0.0));
        let b = editor.add_node(NodeKind::QualityChecker, Position::new(200.0, 0.0));
        editor.connect(a.id(), b.id(), None).unwrap();

        editor.delete_node(a.id());

        assert_eq!(editor.nodes().len(), 1);
        assert_eq!(editor.nodes()[0].id(), b.id());
        assert!(editor.edges().is_empty());
    }

    #[test]
    fn test_duplicate_self_loop_rejected() {
        let mut editor = WorkflowEditor::new("Scenario");
        let a = editor.add_node(NodeKind::Transform, Position::default());

        editor.connect(a.id(), a.id(), None).unwrap();
        let err = editor.connect(a.id(), a.id(), None).unwrap_err();

        assert!(matches!(err, GraphError::InvalidConnection(_)));
        assert_eq!(editor.edges().len(), 1);
    }

    #[test]
    fn test_undo_twice_redo_once() {
        let mut editor = WorkflowEditor::new("Scenario");
        let a = editor.add_node(NodeKind::Source, Position::default());
        let b = editor.add_node(NodeKind::Transform, Position::default());
        let after_second = editor.snapshot();
        editor.connect(a.id(), b.id(), None).unwrap();

        assert!(editor.undo());
        assert!(editor.undo());
        assert!(editor.redo());

        assert_eq!(editor.snapshot(), after_second);
    }

    #[test]
    fn test_undo_redo_inverse() {
        let mut editor = WorkflowEditor::new("Inverse");
        let a = editor.add_node(NodeKind::DatasetLoader, Position::default());
        let b = editor.add_node(NodeKind::DataMerger, Position::default());
        editor.connect(a.id(), b.id(), Some(Handles::target("left"))).unwrap();

        let before = editor.snapshot();
        editor.delete_node(a.id());
        let after = editor.snapshot();

        editor.undo();
        assert_eq!(editor.snapshot(), before);
        editor.redo();
        assert_eq!(editor.snapshot(), after);
    }

    #[test]
    fn test_new_mutation_truncates_redo_tail() {
        let mut editor = WorkflowEditor::new("Truncate");
        editor.add_node(NodeKind::Source, Position::default());
        editor.add_node(NodeKind::Transform, Position::default());

        editor.undo();
        assert!(editor.can_redo());
        editor.add_node(NodeKind::Analysis, Position::default());

        assert!(!editor.can_redo());
        assert!(!editor.redo());
        let kinds: Vec<NodeKind> = editor.nodes().iter().map(|n| n.kind()).collect();
        assert_eq!(kinds, vec![NodeKind::Source, NodeKind::Analysis]);
    }

    #[test]
    fn test_undo_at_floor_is_noop() {
        let mut editor = WorkflowEditor::new("Floor");
        assert!(!editor.undo());
        assert!(!editor.redo());
        assert!(editor.nodes().is_empty());
    }

    #[test]
    fn test_noop_updates_leave_document_unchanged() {
        let mut editor = WorkflowEditor::new("Noop");
        let a = editor.add_node(NodeKind::Source, Position::default());
        let b = editor.add_node(NodeKind::Transform, Position::default());
        editor.connect(a.id(), b.id(), None).unwrap();

        let before = serde_json::to_vec(&editor.document()).unwrap();
        let history_len = editor.history().len();

        editor.update_node_payload("ghost", &patch(json!({"label": "x"}))).unwrap();
        assert!(editor.delete_edge("ghost").is_none());
        assert!(editor.delete_node("ghost").is_none());

        assert_eq!(serde_json::to_vec(&editor.document()).unwrap(), before);
        assert_eq!(editor.history().len(), history_len);
    }

    #[test]
    fn test_each_mutation_commits_one_snapshot() {
        let mut editor = WorkflowEditor::new("Commits");
        assert_eq!(editor.history().len(), 1);

        let a = editor.add_node(NodeKind::Source, Position::default());
        let b = editor.add_node(NodeKind::Transform, Position::default());
        let edge = editor.connect(a.id(), b.id(), None).unwrap();
        editor.update_node_payload(a.id(), &patch(json!({"label": "Raw"}))).unwrap();
        editor.delete_edge(&edge.id);
        assert_eq!(editor.history().len(), 6);

        assert!(editor.connect(a.id(), "ghost", None).is_err());
        assert_eq!(editor.history().len(), 6);
    }

    #[test]
    fn test_integrity_holds_across_operation_sequence() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut editor = WorkflowEditor::new("Sequence");
        let kinds = NodeKind::all();
        let mut ids: Vec<String> = Vec::new();

        for step in 0..60usize {
            match step % 5 {
                0 | 1 => {
                    let kind = kinds[step % kinds.len()];
                    ids.push(editor.add_node(kind, Position::default()).id().to_string());
                }
                2 | 3 if ids.len() >= 2 => {
                    let source = &ids[step % ids.len()];
                    let target = &ids[(step * 7 + 1) % ids.len()];
                    let _ = editor.connect(source, target, None);
                }
                4 if !ids.is_empty() => {
                    let victim = ids.remove((step * 3) % ids.len());
                    let incident = editor.store().incident_edges(&victim).count();
                    let edges_before = editor.edges().len();
                    editor.delete_node(&victim);
                    assert_eq!(editor.edges().len(), edges_before - incident);
                }
                _ => {}
            }
            assert_integrity(&editor);
        }
    }

    #[test]
    fn test_delete_clears_selection() {
        let mut editor = WorkflowEditor::new("Selection");
        let a = editor.add_node(NodeKind::Source, Position::default());
        editor.select(Some(a.id()));
        assert_eq!(editor.selected().map(|n| n.id()), Some(a.id()));

        editor.delete_node(a.id());
        assert!(editor.selected().is_none());

        // Undo brings the node back but not the selection
        editor.undo();
        assert!(editor.selected().is_none());
    }

    #[test]
    fn test_run_updates_skip_history_and_tolerate_missing_nodes() {
        let mut editor = WorkflowEditor::new("Run");
        let a = editor.add_node(NodeKind::StructuralAnalysis, Position::default());
        let history_len = editor.history().len();

        assert!(editor.apply_run_state(a.id(), RunState::completed()));
        assert!(!editor.apply_run_state("ghost", RunState::completed()));
        assert!(!editor
            .apply_results("ghost", &patch(json!({"results": {"rowCount": 3}})))
            .unwrap());
        assert!(editor
            .apply_results(a.id(), &patch(json!({"results": {"rowCount": 3}})))
            .unwrap());

        assert_eq!(editor.history().len(), history_len);
        assert_eq!(editor.node(a.id()).unwrap().run_state.status, RunStatus::Completed);
        assert!(editor.node(a.id()).unwrap().payload().has_results());

        editor.reset_run_states();
        assert_eq!(editor.node(a.id()).unwrap().run_state, RunState::default());
    }

    #[test]
    fn test_load_document_resets_history() {
        let mut source = WorkflowEditor::new("Original");
        let a = source.add_node(NodeKind::Source, Position::default());
        let b = source.add_node(NodeKind::Visualization, Position::default());
        source.connect(a.id(), b.id(), None).unwrap();
        source.set_id("wf-1");

        let mut editor = WorkflowEditor::new("Blank");
        editor.add_node(NodeKind::Transform, Position::default());
        editor.load_document(source.document()).unwrap();

        assert_eq!(editor.id(), Some("wf-1"));
        assert_eq!(editor.name(), "Original");
        assert_eq!(editor.snapshot(), source.snapshot());
        assert!(!editor.can_undo());
    }

    #[test]
    fn test_load_document_rejects_dangling_edges() {
        let mut doc = WorkflowDocument::new("Broken");
        doc.edges.push(Edge {
            id: "e1".to_string(),
            source_node_id: "a".to_string(),
            target_node_id: "b".to_string(),
            source_handle: None,
            target_handle: None,
        });

        let mut editor = WorkflowEditor::new("Live");
        let node = editor.add_node(NodeKind::Source, Position::default());
        let err = editor.load_document(doc).unwrap_err();

        assert!(err.is_integrity_violation());
        assert_eq!(editor.name(), "Live");
        assert_eq!(editor.nodes()[0].id(), node.id());
    }

    #[test]
    fn test_document_round_trip() {
        let mut editor = WorkflowEditor::new("Round trip");
        editor.set_description("loader into checker");
        let a = editor.add_node(NodeKind::DatasetLoader, Position::new(10.0, 20.0));
        let b = editor.add_node(NodeKind::QualityChecker, Position::new(200.0, 0.0));
        editor.connect(a.id(), b.id(), Some(Handles::new("data", "data"))).unwrap();
        editor.apply_run_state(b.id(), RunState::failed("no input"));

        let json = serde_json::to_string(&editor.document()).unwrap();
        let decoded: WorkflowDocument = serde_json::from_str(&json).unwrap();

        let mut reloaded = WorkflowEditor::new("");
        reloaded.load_document(decoded.clone()).unwrap();
        assert_eq!(decoded, editor.document());
        assert_eq!(reloaded.document(), editor.document());
    }
}
