//! Error types for gateway operations

use workflow_graph::GraphError;

use crate::backend::BackendError;
use crate::config::ConfigError;

/// Result type for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Storage or transport failed; the live document is unchanged
    #[error("Persistence error: {0}")]
    Persistence(#[source] BackendError),

    #[error("Workflow not found: {0}")]
    NotFound(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// Execution requested for a document that was never saved
    #[error("Workflow has not been saved yet")]
    NotPersisted,

    #[error("Execution error: {0}")]
    Execution(String),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<BackendError> for GatewayError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotFound(id) => GatewayError::NotFound(id),
            other => GatewayError::Persistence(other),
        }
    }
}
