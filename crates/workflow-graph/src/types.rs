//! Core types for workflow documents
//!
//! These types define the structure of a workflow document: nodes, edges,
//! per-node run state and the document envelope. Their serde form is the
//! wire/storage format and round-trips exactly.

use serde::{Deserialize, Serialize, Serializer};

use crate::error::GraphError;
use crate::payload::{NodeKind, NodePayload};

/// Unique identifier for a node
pub type NodeId = String;

/// Unique identifier for an edge
pub type EdgeId = String;

/// Unique identifier for a persisted workflow document
pub type WorkflowId = String;

/// Position on the canvas (owned by the UI, persisted with the node)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f64, f64)> for Position {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Execution status of a single node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Error,
}

impl RunStatus {
    /// Whether the status is a terminal state of a run
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

/// Per-node execution status, progress and last error
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    pub status: RunStatus,
    /// Progress in percent (0-100)
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl RunState {
    /// A node that has started but not finished
    pub fn running(progress: u8) -> Self {
        Self {
            status: RunStatus::Running,
            progress: progress.min(100),
            last_error: None,
        }
    }

    /// A node that finished successfully
    pub fn completed() -> Self {
        Self {
            status: RunStatus::Completed,
            progress: 100,
            last_error: None,
        }
    }

    /// A node that finished with an error
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: RunStatus::Error,
            progress: 100,
            last_error: Some(error.into()),
        }
    }
}

/// A node instance in a workflow document
///
/// The kind is derived from the payload, so the two can never disagree.
/// Construct nodes through the [`NodeTypeRegistry`](crate::registry::NodeTypeRegistry)
/// or decode them from the wire form.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawNode")]
pub struct Node {
    id: NodeId,
    /// Position in the UI
    pub position: Position,
    payload: NodePayload,
    /// Last known execution state
    pub run_state: RunState,
}

impl Node {
    /// Build a node from an already-typed payload
    pub fn new(id: impl Into<NodeId>, position: Position, payload: NodePayload) -> Self {
        Self {
            id: id.into(),
            position,
            payload,
            run_state: RunState::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.payload.kind()
    }

    pub fn payload(&self) -> &NodePayload {
        &self.payload
    }

    /// Replace the payload, keeping the kind fixed
    ///
    /// Returns the rejected payload if its kind differs from this node's.
    pub fn set_payload(&mut self, payload: NodePayload) -> std::result::Result<(), NodePayload> {
        if payload.kind() != self.kind() {
            return Err(payload);
        }
        self.payload = payload;
        Ok(())
    }
}

/// Wire form of a node: `{id, kind, position, payload, runState}`
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNode {
    id: NodeId,
    kind: NodeKind,
    position: Position,
    payload: serde_json::Value,
    #[serde(default)]
    run_state: RunState,
}

impl TryFrom<RawNode> for Node {
    type Error = GraphError;

    fn try_from(raw: RawNode) -> Result<Self, Self::Error> {
        let payload =
            NodePayload::from_value(raw.kind, raw.payload).map_err(|e| GraphError::InvalidPayload {
                node_id: raw.id.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            id: raw.id,
            position: raw.position,
            payload,
            run_state: raw.run_state,
        })
    }
}

impl TryFrom<&Node> for RawNode {
    type Error = GraphError;

    fn try_from(node: &Node) -> Result<Self, Self::Error> {
        let invalid = |reason: String| GraphError::InvalidPayload {
            node_id: node.id.clone(),
            reason,
        };
        if !node.position.is_finite() {
            return Err(invalid("position must be finite".to_string()));
        }
        Ok(Self {
            id: node.id.clone(),
            kind: node.kind(),
            position: node.position,
            payload: node.payload.to_wire_value().map_err(invalid)?,
            run_state: node.run_state.clone(),
        })
    }
}

// Serialization fails instead of writing something that would not load back.
impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        RawNode::try_from(self)
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

/// Optional port names on either end of an edge
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Handles {
    pub source: Option<String>,
    pub target: Option<String>,
}

impl Handles {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: Some(source.into()),
            target: Some(target.into()),
        }
    }

    /// Only a target handle (e.g. the `right` input of a merger)
    pub fn target(target: impl Into<String>) -> Self {
        Self {
            source: None,
            target: Some(target.into()),
        }
    }
}

/// A directed connection between two nodes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: EdgeId,
    pub source_node_id: NodeId,
    pub target_node_id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

impl Edge {
    /// Whether the edge touches the given node on either end
    pub fn touches(&self, node_id: &str) -> bool {
        self.source_node_id == node_id || self.target_node_id == node_id
    }

    /// Whether two edges join the same pair of ports
    pub fn same_ports(&self, source: &str, target: &str, handles: &Handles) -> bool {
        self.source_node_id == source
            && self.target_node_id == target
            && self.source_handle == handles.source
            && self.target_handle == handles.target
    }
}

/// Immutable copy of the graph state, used by the history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// A complete workflow document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDocument {
    /// `None` until the first successful save
    pub id: Option<WorkflowId>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl WorkflowDocument {
    /// Create a new, unsaved, empty document
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: String::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Whether the document has been assigned an id by a save
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Find a node by ID
    pub fn find_node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id() == id)
    }

    /// Get edges coming into a node
    pub fn incoming_edges<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.edges.iter().filter(move |e| e.target_node_id == node_id)
    }

    /// Get the IDs of nodes that this node depends on (upstream nodes)
    pub fn get_dependencies(&self, node_id: &str) -> Vec<NodeId> {
        self.incoming_edges(node_id)
            .map(|e| e.source_node_id.clone())
            .collect()
    }
}
