//! Workflow Graph - editable workflow documents for the data-science canvas
//!
//! This crate owns everything about a workflow that lives in memory while a
//! user edits it. It supports:
//!
//! - A closed set of node kinds, each with a typed payload
//! - Referential integrity between nodes and edges
//! - Snapshot-based undo/redo with bounded history
//! - Single-node selection that never points at a deleted node
//!
//! # Architecture
//!
//! - `NodeTypeRegistry`: descriptors and default payloads for every kind
//! - `GraphStore`: the nodes and edges of one document
//! - `HistoryManager`: linear snapshot history with a cursor
//! - `SelectionTracker`: the node shown in the inspector
//! - `WorkflowEditor`: ties the above together so each edit commits exactly
//!   one snapshot
//!
//! Persistence and execution live in the `workflow-gateway` crate.
//!
//! # Example
//!
//! ```ignore
//! use workflow_graph::{NodeKind, Position, WorkflowEditor};
//!
//! let mut editor = WorkflowEditor::new("Churn model");
//! let loader = editor.add_node(NodeKind::DatasetLoader, Position::new(0.0, 0.0));
//! let checker = editor.add_node(NodeKind::QualityChecker, Position::new(240.0, 0.0));
//! editor.connect(loader.id(), checker.id(), None)?;
//! editor.undo();
//! ```

pub mod builder;
pub mod editor;
pub mod error;
pub mod events;
pub mod history;
pub mod payload;
pub mod registry;
pub mod selection;
pub mod store;
pub mod types;
pub mod validation;

// Re-export key types
pub use builder::WorkflowBuilder;
pub use editor::WorkflowEditor;
pub use error::{GraphError, Result};
pub use events::{EventError, EventSink, NullEventSink, RunOutcome, VecEventSink, WorkflowEvent};
pub use history::{HistoryManager, DEFAULT_HISTORY_CAPACITY};
pub use payload::{NodeKind, NodePayload};
pub use registry::{NodeCategory, NodeDescriptor, NodeTypeRegistry};
pub use selection::SelectionTracker;
pub use store::GraphStore;
pub use types::{
    Edge, EdgeId, GraphSnapshot, Handles, Node, NodeId, Position, RunState, RunStatus,
    WorkflowDocument, WorkflowId,
};
pub use validation::{
    execution_order, upstream_subgraph, validate_document, validate_graph, IntegrityIssue,
};
