//! Fluent builder for workflow documents
//!
//! Provides a compact API for constructing documents programmatically,
//! mainly for tests, fixtures and seeding storage backends.

use serde_json::Value;

use crate::error::{GraphError, Result};
use crate::payload::NodeKind;
use crate::registry::NodeTypeRegistry;
use crate::types::{Edge, Node, Position, WorkflowDocument};
use crate::validation::ensure_integrity;

/// Fluent builder for constructing workflow documents
///
/// # Example
///
/// ```ignore
/// let doc = WorkflowBuilder::new("Churn model")
///     .add_node("load", NodeKind::DatasetLoader, (0.0, 0.0))
///     .with_payload(serde_json::json!({"source": {"location": "churn.csv"}}))
///     .add_node("check", NodeKind::QualityChecker, (200.0, 0.0))
///     .add_edge("load", "check")
///     .build()?;
/// ```
pub struct WorkflowBuilder {
    registry: NodeTypeRegistry,
    document: WorkflowDocument,
    edge_counter: usize,
    error: Option<GraphError>,
}

impl WorkflowBuilder {
    /// Create a new builder for an unsaved document
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            registry: NodeTypeRegistry::with_builtins(),
            document: WorkflowDocument::new(name),
            edge_counter: 0,
            error: None,
        }
    }

    /// Give the document a persisted id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.document.id = Some(id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.document.description = description.into();
        self
    }

    /// Add a node with the default payload for its kind
    pub fn add_node(mut self, id: impl Into<String>, kind: NodeKind, position: (f64, f64)) -> Self {
        let payload = self.registry.empty_payload(kind);
        self.document
            .nodes
            .push(Node::new(id, Position::from(position), payload));
        self
    }

    /// Merge fields into the payload of the most recently added node
    ///
    /// Must be called immediately after `add_node`. A patch that does not
    /// fit the node's kind is reported by `build`.
    pub fn with_payload(mut self, patch: Value) -> Self {
        if self.error.is_some() {
            return self;
        }
        let Some(node) = self.document.nodes.last_mut() else {
            return self;
        };
        let Value::Object(patch) = patch else {
            self.error = Some(GraphError::InvalidPayload {
                node_id: node.id().to_string(),
                reason: "payload patch must be an object".to_string(),
            });
            return self;
        };
        match node.payload().merged(&patch) {
            Ok(merged) => {
                let _ = node.set_payload(merged);
            }
            Err(e) => {
                self.error = Some(GraphError::InvalidPayload {
                    node_id: node.id().to_string(),
                    reason: e.to_string(),
                });
            }
        }
        self
    }

    /// Add an edge between two nodes without handles (auto-generates edge ID)
    pub fn add_edge(self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.push_edge(source.into(), None, target.into(), None)
    }

    /// Add an edge between two named ports (auto-generates edge ID)
    pub fn add_edge_on(
        self,
        source: impl Into<String>,
        source_handle: impl Into<String>,
        target: impl Into<String>,
        target_handle: impl Into<String>,
    ) -> Self {
        self.push_edge(
            source.into(),
            Some(source_handle.into()),
            target.into(),
            Some(target_handle.into()),
        )
    }

    fn push_edge(
        mut self,
        source: String,
        source_handle: Option<String>,
        target: String,
        target_handle: Option<String>,
    ) -> Self {
        self.edge_counter += 1;
        self.document.edges.push(Edge {
            id: format!("edge-{}", self.edge_counter),
            source_node_id: source,
            target_node_id: target,
            source_handle,
            target_handle,
        });
        self
    }

    /// Finish the document, checking payload patches and integrity
    pub fn build(self) -> Result<WorkflowDocument> {
        if let Some(error) = self.error {
            return Err(error);
        }
        ensure_integrity(&self.document.nodes, &self.document.edges)?;
        Ok(self.document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::NodePayload;
    use serde_json::json;

    #[test]
    fn test_build_document() {
        let doc = WorkflowBuilder::new("Churn")
            .with_id("wf-1")
            .add_node("load", NodeKind::DatasetLoader, (0.0, 0.0))
            .with_payload(json!({"source": {"location": "churn.csv"}}))
            .add_node("merge", NodeKind::DataMerger, (200.0, 0.0))
            .add_edge_on("load", "data", "merge", "left")
            .add_edge_on("load", "data", "merge", "right")
            .build()
            .unwrap();

        assert_eq!(doc.id.as_deref(), Some("wf-1"));
        assert_eq!(doc.nodes.len(), 2);
        assert_eq!(doc.edges[1].id, "edge-2");
        assert_eq!(doc.edges[1].target_handle.as_deref(), Some("right"));
        match doc.nodes[0].payload() {
            NodePayload::DatasetLoader(p) => assert_eq!(p.source.location, "churn.csv"),
            other => panic!("unexpected payload kind {}", other.kind()),
        }
    }

    #[test]
    fn test_build_rejects_dangling_edge() {
        let result = WorkflowBuilder::new("Broken")
            .add_node("a", NodeKind::Source, (0.0, 0.0))
            .add_edge("a", "missing")
            .build();
        assert!(matches!(result, Err(GraphError::IntegrityViolation { .. })));
    }

    #[test]
    fn test_build_rejects_bad_payload() {
        let result = WorkflowBuilder::new("Broken")
            .add_node("a", NodeKind::DataBinning, (0.0, 0.0))
            .with_payload(json!({"binCount": "many"}))
            .build();
        assert!(matches!(result, Err(GraphError::InvalidPayload { .. })));
    }
}
