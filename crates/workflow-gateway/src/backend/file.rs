//! File-backed storage
//!
//! One pretty-printed JSON file per document, named `<id>.json`, in a single
//! directory. Executions run with the simulated runner.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::fs;
use uuid::Uuid;

use workflow_graph::{WorkflowDocument, WorkflowId};

use super::{BackendError, WorkflowBackend, WorkflowSummary};
use crate::execution::ExecutionMonitor;
use crate::simulator::SimulatedRunner;

/// Directory of workflow documents
///
/// # Example
///
/// ```ignore
/// let backend = FileWorkflowBackend::new(".workflows", runner);
/// let id = backend.create(&document).await?;
/// ```
pub struct FileWorkflowBackend {
    dir: PathBuf,
    runner: SimulatedRunner,
}

impl FileWorkflowBackend {
    /// Create a backend rooted at `dir`
    ///
    /// The directory will be created on first write.
    pub fn new(dir: impl AsRef<Path>, runner: SimulatedRunner) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            runner,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File for a document id; ids that could escape the directory never exist
    fn document_path(&self, id: &str) -> Result<PathBuf, BackendError> {
        let safe = !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !safe {
            return Err(BackendError::NotFound(id.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", id)))
    }

    /// Write through a temporary file so a failed write keeps the old copy
    async fn write_document(
        &self,
        id: &str,
        document: &WorkflowDocument,
    ) -> Result<(), BackendError> {
        let path = self.document_path(id)?;
        fs::create_dir_all(&self.dir).await?;

        let mut stored = document.clone();
        stored.id = Some(id.to_string());
        let content = serde_json::to_string_pretty(&stored)?;

        let staging = path.with_extension("json.tmp");
        fs::write(&staging, content).await?;
        fs::rename(&staging, &path).await?;
        log::debug!("Saved workflow '{}' to {:?}", id, path);
        Ok(())
    }
}

#[async_trait]
impl WorkflowBackend for FileWorkflowBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn create(&self, document: &WorkflowDocument) -> Result<WorkflowId, BackendError> {
        let id = Uuid::new_v4().to_string();
        self.write_document(&id, document).await?;
        Ok(id)
    }

    async fn update(&self, id: &str, document: &WorkflowDocument) -> Result<(), BackendError> {
        if !fs::try_exists(self.document_path(id)?).await? {
            return Err(BackendError::NotFound(id.to_string()));
        }
        self.write_document(id, document).await
    }

    async fn fetch(&self, id: &str) -> Result<WorkflowDocument, BackendError> {
        let path = self.document_path(id)?;
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(BackendError::NotFound(id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        let mut document: WorkflowDocument = serde_json::from_str(&content)?;
        document.id = Some(id.to_string());
        Ok(document)
    }

    async fn list(&self) -> Result<Vec<WorkflowSummary>, BackendError> {
        if !fs::try_exists(&self.dir).await? {
            return Ok(Vec::new());
        }

        let mut summaries = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let file_path = entry.path();
            if file_path.extension().map_or(true, |e| e != "json") {
                continue;
            }
            let Some(id) = file_path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let content = fs::read_to_string(&file_path).await?;
            match serde_json::from_str::<WorkflowDocument>(&content) {
                Ok(document) => summaries.push(WorkflowSummary::of(id, &document)),
                Err(e) => {
                    log::warn!("Failed to parse workflow from {:?}: {}", file_path, e);
                }
            }
        }

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
    use serde_json::json;
    use std::time::Duration;
    use workflow_graph::{NodeKind, WorkflowBuilder};

    fn backend(dir: &Path) -> FileWorkflowBackend {
        FileWorkflowBackend::new(
            dir.join("workflows"),
            SimulatedRunner::new(Duration::from_millis(1)),
        )
    }

    fn document() -> WorkflowDocument {
        WorkflowBuilder::new("Churn")
            .with_description("weekly churn model")
            .add_node("load", NodeKind::DatasetLoader, (0.0, 0.0))
            .with_payload(json!({"source": {"location": "churn.csv"}}))
            .add_node("clf", NodeKind::BinaryClassifier, (300.5, -20.25))
            .with_payload(json!({"model": {"targetColumn": "churned", "testSize": 0.3}}))
            .add_edge_on("load", "data", "clf", "data")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(dir.path());
        let doc = document();

        let id = backend.create(&doc).await.unwrap();
        assert!(backend.dir().join(format!("{}.json", id)).exists());

        let fetched = backend.fetch(&id).await.unwrap();
        assert_eq!(fetched.id.as_deref(), Some(id.as_str()));
        assert_eq!(fetched.nodes, doc.nodes);
        assert_eq!(fetched.edges, doc.edges);
        assert_eq!(fetched.description, "weekly churn model");
    }

    #[tokio::test]
    async fn test_list_skips_unparseable_files() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(dir.path());
        assert!(backend.list().await.unwrap().is_empty());

        let id = backend.create(&document()).await.unwrap();
        std::fs::write(backend.dir().join("broken.json"), "{").unwrap();
        std::fs::write(backend.dir().join("notes.txt"), "ignore me").unwrap();

        let summaries = backend.list().await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].id, id);
        assert_eq!(summaries[0].node_count, 2);
    }

    #[tokio::test]
    async fn test_update_requires_existing_document() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(dir.path());
        let err = backend.update("missing", &document()).await.unwrap_err();
        assert!(matches!(err, BackendError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unsafe_ids_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let backend = backend(dir.path());
        assert!(matches!(
            backend.fetch("../secrets").await,
            Err(BackendError::NotFound(_))
        ));
    }
}
