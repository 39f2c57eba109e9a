//! Pluggable workflow storage and execution backends
//!
//! Every backend speaks the same contract: create/update/fetch documents,
//! list them, start an execution that reports through an
//! [`ExecutionMonitor`], and preview a single node. The gateway never knows
//! which one is active.

pub mod file;
pub mod http;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use workflow_graph::{WorkflowDocument, WorkflowId};

use crate::config::{BackendSelection, GatewayConfig};
use crate::execution::ExecutionMonitor;
use crate::simulator::SimulatedRunner;

pub use file::FileWorkflowBackend;
pub use http::HttpWorkflowBackend;
pub use memory::InMemoryWorkflowBackend;

/// Error types for backend operations
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Workflow not found: {0}")]
    NotFound(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Preview failed: {0}")]
    Preview(String),
}

/// Listing entry for a stored document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSummary {
    pub id: WorkflowId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub node_count: usize,
}

impl WorkflowSummary {
    pub fn of(id: &str, document: &WorkflowDocument) -> Self {
        Self {
            id: id.to_string(),
            name: document.name.clone(),
            description: document.description.clone(),
            node_count: document.nodes.len(),
        }
    }
}

/// The core trait that all workflow backends must implement.
#[async_trait]
pub trait WorkflowBackend: Send + Sync {
    // ─── IDENTITY ───────────────────────────────────────────────────

    /// Short name for logs (e.g., "http", "file")
    fn name(&self) -> &'static str;

    // ─── DOCUMENTS ──────────────────────────────────────────────────

    /// Store a new document and return its assigned id
    async fn create(&self, document: &WorkflowDocument) -> Result<WorkflowId, BackendError>;

    /// Overwrite an existing document (last write wins)
    async fn update(&self, id: &str, document: &WorkflowDocument) -> Result<(), BackendError>;

    /// Fetch a document by id; the returned document carries that id
    async fn fetch(&self, id: &str) -> Result<WorkflowDocument, BackendError>;

    /// Summaries of every stored document
    async fn list(&self) -> Result<Vec<WorkflowSummary>, BackendError>;

    // ─── EXECUTION ──────────────────────────────────────────────────

    /// Start running a stored document
    ///
    /// Returns as soon as the run is accepted. Dropping the monitor does
    /// not cancel the run.
    async fn start_execution(&self, id: &str) -> Result<ExecutionMonitor, BackendError>;

    /// Evaluate one node of `document`, along with whatever feeds it, and
    /// return the result fields for that node's payload
    async fn preview_node(
        &self,
        document: &WorkflowDocument,
        node_id: &str,
    ) -> Result<Map<String, Value>, BackendError>;
}

/// Build the backend a configuration selects
pub fn from_config(config: &GatewayConfig) -> Result<Arc<dyn WorkflowBackend>, BackendError> {
    let runner = SimulatedRunner::new(config.simulated_step());
    let backend: Arc<dyn WorkflowBackend> = match config.backend_selection() {
        BackendSelection::Http(base_url) => Arc::new(HttpWorkflowBackend::new(
            base_url,
            config.request_timeout(),
            config.poll_interval(),
        )?),
        BackendSelection::File(dir) => Arc::new(FileWorkflowBackend::new(dir, runner)),
        BackendSelection::Memory => Arc::new(InMemoryWorkflowBackend::new(runner)),
    };
    log::info!("Using {} workflow backend", backend.name());
    Ok(backend)
}

/// Read a non-success response into an error
pub(crate) async fn api_error(response: reqwest::Response) -> BackendError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    BackendError::Api { status, body }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_selects_backend() {
        let memory = from_config(&GatewayConfig::default()).unwrap();
        assert_eq!(memory.name(), "memory");

        let file = from_config(&GatewayConfig {
            storage_dir: Some("workflows".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(file.name(), "file");

        let http = from_config(&GatewayConfig {
            base_url: Some("http://localhost:8000/api".to_string()),
            storage_dir: Some("workflows".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(http.name(), "http");
    }
}
