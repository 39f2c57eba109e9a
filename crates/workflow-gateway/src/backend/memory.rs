//! Process-local backend
//!
//! Keeps documents in a map and runs executions with the simulated runner.
//! Useful for tests and for running the editor without a server.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use uuid::Uuid;

use workflow_graph::{WorkflowDocument, WorkflowId};

use super::{BackendError, WorkflowBackend, WorkflowSummary};
use crate::execution::ExecutionMonitor;
use crate::simulator::SimulatedRunner;

pub struct InMemoryWorkflowBackend {
    documents: RwLock<HashMap<WorkflowId, WorkflowDocument>>,
    runner: SimulatedRunner,
}

impl InMemoryWorkflowBackend {
    pub fn new(runner: SimulatedRunner) -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            runner,
        }
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    fn stored(id: &str, document: &WorkflowDocument) -> WorkflowDocument {
        let mut stored = document.clone();
        stored.id = Some(id.to_string());
        stored
    }
}

#[async_trait]
impl WorkflowBackend for InMemoryWorkflowBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn create(&self, document: &WorkflowDocument) -> Result<WorkflowId, BackendError> {
        let id = Uuid::new_v4().to_string();
        self.documents
            .write()
            .insert(id.clone(), Self::stored(&id, document));
        Ok(id)
    }

    async fn update(&self, id: &str, document: &WorkflowDocument) -> Result<(), BackendError> {
        let mut documents = self.documents.write();
        let slot = documents
            .get_mut(id)
            .ok_or_else(|| BackendError::NotFound(id.to_string()))?;
        *slot = Self::stored(id, document);
        Ok(())
    }

    async fn fetch(&self, id: &str) -> Result<WorkflowDocument, BackendError> {
        self.documents
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(id.to_string()))
    }

    async fn list(&self) -> Result<Vec<WorkflowSummary>, BackendError> {
        let mut summaries: Vec<WorkflowSummary> = self
            .documents
            .read()
            .iter()
            .map(|(id, doc)| WorkflowSummary::of(id, doc))
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(summaries)
    }

    async fn start_execution(&self, id: &str) -> Result<ExecutionMonitor, BackendError> {
        let document = self.fetch(id).await?;
        let execution_id = Uuid::new_v4().to_string();
        let (reporter, monitor) = ExecutionMonitor::channel(execution_id.clone());
        self.runner.spawn(document, reporter);
        log::info!("Started simulated execution '{}' of '{}'", execution_id, id);
        Ok(monitor)
    }

    async fn preview_node(
        &self,
        document: &WorkflowDocument,
        node_id: &str,
    ) -> Result<Map<String, Value>, BackendError> {
        self.runner.preview(document, node_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use workflow_graph::{NodeKind, WorkflowBuilder};

    fn backend() -> InMemoryWorkflowBackend {
        InMemoryWorkflowBackend::new(SimulatedRunner::new(Duration::from_millis(1)))
    }

    #[tokio::test]
    async fn test_create_fetch_update() {
        let backend = backend();
        let doc = WorkflowBuilder::new("Churn")
            .add_node("a", NodeKind::Source, (0.0, 0.0))
            .build()
            .unwrap();

        let id = backend.create(&doc).await.unwrap();
        let fetched = backend.fetch(&id).await.unwrap();
        assert_eq!(fetched.id.as_deref(), Some(id.as_str()));
        assert_eq!(fetched.nodes, doc.nodes);

        let mut renamed = fetched.clone();
        renamed.name = "Churn v2".to_string();
        backend.update(&id, &renamed).await.unwrap();
        assert_eq!(backend.list().await.unwrap()[0].name, "Churn v2");
        assert_eq!(backend.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_ids_are_not_found() {
        let backend = backend();
        let doc = WorkflowBuilder::new("x").build().unwrap();
        assert!(matches!(backend.fetch("nope").await, Err(BackendError::NotFound(_))));
        assert!(matches!(backend.update("nope", &doc).await, Err(BackendError::NotFound(_))));
        assert!(matches!(
            backend.start_execution("nope").await,
            Err(BackendError::NotFound(_))
        ));
        assert!(backend.is_empty());
    }
}
