//! Workflow Gateway - Single entry point for persistence and execution
//!
//! The gateway abstracts over the storage backends (remote server, local
//! files, memory) and turns their failures into the errors editors act on.

use std::sync::Arc;

use serde_json::{Map, Value};

use workflow_graph::validation::ensure_integrity;
use workflow_graph::{WorkflowDocument, WorkflowId};

use crate::backend::{self, BackendError, WorkflowBackend, WorkflowSummary};
use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::execution::ExecutionMonitor;

/// The single entry point for ALL workflow persistence and execution.
///
/// Application code should only interact with `WorkflowGateway`, never
/// with backends directly.
pub struct WorkflowGateway {
    backend: Arc<dyn WorkflowBackend>,
}

impl WorkflowGateway {
    /// Create a gateway over a specific backend
    pub fn with_backend(backend: Arc<dyn WorkflowBackend>) -> Self {
        Self { backend }
    }

    /// Create a gateway over the backend a configuration selects
    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let backend = backend::from_config(config).map_err(GatewayError::Persistence)?;
        Ok(Self::with_backend(backend))
    }

    /// Name of the active backend
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Persist a document
    ///
    /// Creates it when it has no id yet, otherwise overwrites the stored copy.
    /// Returns the document's id. Any failure is a `Persistence` error.
    pub async fn save(&self, document: &WorkflowDocument) -> Result<WorkflowId> {
        let result = match &document.id {
            None => self.backend.create(document).await,
            Some(id) => self
                .backend
                .update(id, document)
                .await
                .map(|()| id.clone()),
        };
        result.map_err(|e| {
            log::error!("Failed to save workflow '{}': {}", document.name, e);
            GatewayError::Persistence(e)
        })
    }

    /// Fetch a stored document
    ///
    /// The document is checked for integrity before it is returned.
    pub async fn load(&self, id: &str) -> Result<WorkflowDocument> {
        let document = self.backend.fetch(id).await?;
        ensure_integrity(&document.nodes, &document.edges)?;
        Ok(document)
    }

    pub async fn list(&self) -> Result<Vec<WorkflowSummary>> {
        Ok(self.backend.list().await?)
    }

    /// Start running a stored document
    pub async fn execute(&self, document_id: Option<&str>) -> Result<ExecutionMonitor> {
        let id = document_id.ok_or(GatewayError::NotPersisted)?;
        Ok(self.backend.start_execution(id).await?)
    }

    /// Evaluate one node, with the subgraph feeding it, and return the
    /// result fields for its payload
    pub async fn preview_node(
        &self,
        document: &WorkflowDocument,
        node_id: &str,
    ) -> Result<Map<String, Value>> {
        self.backend.preview_node(document, node_id).await.map_err(|e| match e {
            BackendError::Preview(reason) => GatewayError::Execution(reason),
            other => other.into(),
        })
    }
}

/// Shared gateway reference
pub type SharedGateway = Arc<WorkflowGateway>;
