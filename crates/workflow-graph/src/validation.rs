//! Integrity checks and traversal helpers for workflow graphs
//!
//! Validates referential integrity (every edge endpoint exists, ids are
//! unique) and provides the orderings used by execution and preview.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::GraphError;
use crate::types::{Edge, Node, NodeId, WorkflowDocument};

/// Integrity problem found in a set of nodes and edges
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrityIssue {
    /// An edge references a non-existent node
    DanglingEdge { edge_id: String, node_id: String },
    /// Two nodes share an id
    DuplicateNode { node_id: String },
    /// Two edges share an id
    DuplicateEdge { edge_id: String },
}

impl From<IntegrityIssue> for GraphError {
    fn from(issue: IntegrityIssue) -> Self {
        match issue {
            IntegrityIssue::DanglingEdge { edge_id, node_id } => {
                GraphError::IntegrityViolation { edge_id, node_id }
            }
            IntegrityIssue::DuplicateNode { node_id } => GraphError::DuplicateId {
                item: "node",
                id: node_id,
            },
            IntegrityIssue::DuplicateEdge { edge_id } => GraphError::DuplicateId {
                item: "edge",
                id: edge_id,
            },
        }
    }
}

/// Validate nodes and edges
///
/// Returns all problems found (not just the first).
pub fn validate_graph(nodes: &[Node], edges: &[Edge]) -> Vec<IntegrityIssue> {
    let mut issues = Vec::new();

    let mut node_ids: HashSet<&str> = HashSet::with_capacity(nodes.len());
    for node in nodes {
        if !node_ids.insert(node.id()) {
            issues.push(IntegrityIssue::DuplicateNode {
                node_id: node.id().to_string(),
            });
        }
    }

    let mut edge_ids: HashSet<&str> = HashSet::with_capacity(edges.len());
    for edge in edges {
        if !edge_ids.insert(edge.id.as_str()) {
            issues.push(IntegrityIssue::DuplicateEdge {
                edge_id: edge.id.clone(),
            });
        }
        for endpoint in [&edge.source_node_id, &edge.target_node_id] {
            if !node_ids.contains(endpoint.as_str()) {
                issues.push(IntegrityIssue::DanglingEdge {
                    edge_id: edge.id.clone(),
                    node_id: endpoint.clone(),
                });
            }
        }
    }

    issues
}

/// Validate a whole document
pub fn validate_document(document: &WorkflowDocument) -> Vec<IntegrityIssue> {
    validate_graph(&document.nodes, &document.edges)
}

/// Validate and fail on the first problem
pub fn ensure_integrity(nodes: &[Node], edges: &[Edge]) -> Result<(), GraphError> {
    match validate_graph(nodes, edges).into_iter().next() {
        Some(issue) => Err(issue.into()),
        None => Ok(()),
    }
}

/// Compute an execution order using Kahn's algorithm
///
/// Nodes that sit on a cycle never reach in-degree zero; they are appended
/// afterwards in document order so every node appears exactly once.
pub fn execution_order(nodes: &[Node], edges: &[Edge]) -> Vec<NodeId> {
    let mut in_degree: HashMap<&str, usize> = nodes.iter().map(|n| (n.id(), 0)).collect();
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();

    for edge in edges {
        if edge.source_node_id == edge.target_node_id {
            continue;
        }
        if !in_degree.contains_key(edge.source_node_id.as_str()) {
            continue;
        }
        if let Some(degree) = in_degree.get_mut(edge.target_node_id.as_str()) {
            *degree += 1;
            adjacency
                .entry(edge.source_node_id.as_str())
                .or_default()
                .push(edge.target_node_id.as_str());
        }
    }

    // Seed in document order so the result is deterministic
    let mut queue: VecDeque<&str> = nodes
        .iter()
        .map(|n| n.id())
        .filter(|id| in_degree.get(id) == Some(&0))
        .collect();

    let mut order: Vec<NodeId> = Vec::with_capacity(nodes.len());
    let mut placed: HashSet<&str> = HashSet::with_capacity(nodes.len());

    while let Some(node) = queue.pop_front() {
        order.push(node.to_string());
        placed.insert(node);

        if let Some(neighbors) = adjacency.get(node) {
            for &neighbor in neighbors {
                if let Some(degree) = in_degree.get_mut(neighbor) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(neighbor);
                    }
                }
            }
        }
    }

    for node in nodes {
        if !placed.contains(node.id()) {
            order.push(node.id().to_string());
        }
    }

    order
}

/// Collect a node and everything upstream of it
///
/// The result is ordered for execution (dependencies first).
pub fn upstream_subgraph(nodes: &[Node], edges: &[Edge], node_id: &str) -> Vec<NodeId> {
    let mut wanted: HashSet<&str> = HashSet::new();
    let mut stack = vec![node_id];

    while let Some(current) = stack.pop() {
        if !wanted.insert(current) {
            continue;
        }
        for edge in edges.iter().filter(|e| e.target_node_id == current) {
            stack.push(edge.source_node_id.as_str());
        }
    }

    execution_order(nodes, edges)
        .into_iter()
        .filter(|id| wanted.contains(id.as_str()))
        .collect()
}
