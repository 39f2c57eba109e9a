//! Error types for the workflow graph engine

use thiserror::Error;

/// Result type alias using GraphError
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors that can occur while mutating or decoding a workflow graph
#[derive(Debug, Error)]
pub enum GraphError {
    /// Attempted edge violates the connection rules
    #[error("Invalid connection: {0}")]
    InvalidConnection(String),

    /// A bulk replace would leave an edge pointing at a missing node
    #[error("Integrity violation: edge '{edge_id}' references missing node '{node_id}'")]
    IntegrityViolation { edge_id: String, node_id: String },

    /// A bulk replace contains two nodes or two edges with the same id
    #[error("Integrity violation: duplicate {item} id '{id}'")]
    DuplicateId { item: &'static str, id: String },

    /// A payload patch would break the shape required by the node kind
    #[error("Invalid payload for node '{node_id}': {reason}")]
    InvalidPayload { node_id: String, reason: String },

    /// A kind string that is not part of the compiled-in catalog
    #[error("Unknown node kind: {0}")]
    UnknownNodeKind(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GraphError {
    /// Create an invalid connection error with a message
    pub fn invalid_connection(msg: impl Into<String>) -> Self {
        Self::InvalidConnection(msg.into())
    }

    /// Whether this error came from the referential integrity check
    pub fn is_integrity_violation(&self) -> bool {
        matches!(self, Self::IntegrityViolation { .. } | Self::DuplicateId { .. })
    }
}
