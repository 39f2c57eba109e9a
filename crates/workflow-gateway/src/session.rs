//! Editor sessions
//!
//! An [`EditorSession`] binds one [`WorkflowEditor`] to a gateway and an
//! event sink. Gateway results flow back into the editor here: saved ids,
//! loaded documents, per-node run states and results. Execution and preview
//! updates never create history entries, and updates for nodes that no
//! longer exist are dropped.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use workflow_graph::{
    EventSink, NodeTypeRegistry, NullEventSink, RunOutcome, RunState, RunStatus, WorkflowEditor,
    WorkflowEvent, WorkflowId,
};

use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::execution::{ExecutionMonitor, ExecutionUpdate};
use crate::gateway::SharedGateway;

/// Summary of a finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    pub execution_id: String,
    pub outcome: RunOutcome,
    pub completed: usize,
    pub failed: usize,
}

pub struct EditorSession {
    editor: WorkflowEditor,
    gateway: SharedGateway,
    events: Arc<dyn EventSink>,
}

impl EditorSession {
    pub fn new(editor: WorkflowEditor, gateway: SharedGateway) -> Self {
        Self {
            editor,
            gateway,
            events: Arc::new(NullEventSink),
        }
    }

    /// Start a new, unsaved document sized by the configured history depth
    pub fn create(name: impl Into<String>, gateway: SharedGateway, config: &GatewayConfig) -> Self {
        let editor = WorkflowEditor::with_registry(
            name,
            Arc::new(NodeTypeRegistry::with_builtins()),
            config.history_capacity,
        );
        Self::new(editor, gateway)
    }

    /// Send session events to `sink`
    pub fn with_events(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    pub fn editor(&self) -> &WorkflowEditor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut WorkflowEditor {
        &mut self.editor
    }

    pub fn into_editor(self) -> WorkflowEditor {
        self.editor
    }

    fn emit(&self, event: WorkflowEvent) {
        if let Err(e) = self.events.send(event) {
            log::warn!("Dropped workflow event: {}", e);
        }
    }

    // ─── PERSISTENCE ────────────────────────────────────────────────

    /// Save the live document, adopting the id assigned on first save
    ///
    /// On failure the editor is left exactly as it was.
    pub async fn save(&mut self) -> Result<WorkflowId> {
        let document = self.editor.document();
        let created = document.id.is_none();
        let id = self.gateway.save(&document).await?;

        self.editor.set_id(id.clone());
        log::info!("Saved workflow '{}' as '{}'", document.name, id);
        self.emit(WorkflowEvent::WorkflowSaved {
            workflow_id: id.clone(),
            created,
        });
        Ok(id)
    }

    /// Replace the live document with a stored one
    ///
    /// History restarts at the loaded document. On failure the editor is
    /// left exactly as it was.
    pub async fn load(&mut self, id: &str) -> Result<()> {
        let document = self.gateway.load(id).await?;
        self.editor.load_document(document)?;
        self.emit(WorkflowEvent::WorkflowLoaded {
            workflow_id: id.to_string(),
        });
        Ok(())
    }

    // ─── EXECUTION ──────────────────────────────────────────────────

    /// Start running the saved document
    ///
    /// Previous run states are cleared once the run is accepted. Apply the
    /// monitor's updates with [`apply_execution_update`](Self::apply_execution_update).
    pub async fn execute(&mut self) -> Result<ExecutionMonitor> {
        let id = self
            .editor
            .id()
            .map(str::to_string)
            .ok_or(GatewayError::NotPersisted)?;

        let monitor = self.gateway.execute(Some(id.as_str())).await?;
        self.editor.reset_run_states();
        self.emit(WorkflowEvent::ExecutionStarted {
            workflow_id: id,
            execution_id: monitor.execution_id().to_string(),
        });
        Ok(monitor)
    }

    /// Reflect one execution update into the editor
    pub fn apply_execution_update(&mut self, execution_id: &str, update: ExecutionUpdate) {
        match update {
            ExecutionUpdate::Progress { progress, message } => {
                self.emit(WorkflowEvent::progress(execution_id, progress, message));
            }
            ExecutionUpdate::NodeStatus {
                node_id,
                run_state,
                results,
            } => {
                if self.editor.node(&node_id).is_none() {
                    log::debug!("Ignoring status for deleted node '{}'", node_id);
                    return;
                }
                if let Some(fragment) = results {
                    self.merge_results(&node_id, &fragment);
                }
                if self.editor.apply_run_state(&node_id, run_state.clone()) {
                    self.emit(WorkflowEvent::node_status(&node_id, run_state));
                }
            }
            ExecutionUpdate::Finished { outcome } => {
                log::info!("Execution '{}' finished: {:?}", execution_id, outcome);
            }
        }
    }

    /// Execute and apply every update until the run finishes
    pub async fn run_to_completion(&mut self) -> Result<ExecutionReport> {
        let mut monitor = self.execute().await?;
        let execution_id = monitor.execution_id().to_string();
        let mut reported = None;

        while let Some(update) = monitor.next().await {
            if let ExecutionUpdate::Finished { outcome } = &update {
                reported = Some(*outcome);
            }
            self.apply_execution_update(&execution_id, update);
        }

        let statuses: Vec<RunStatus> = self
            .editor
            .nodes()
            .iter()
            .map(|n| n.run_state.status)
            .filter(RunStatus::is_terminal)
            .collect();
        let completed = statuses.iter().filter(|s| **s == RunStatus::Completed).count();
        let failed = statuses.len() - completed;

        let outcome = match reported {
            Some(outcome) => outcome,
            None if statuses.is_empty() && !self.editor.nodes().is_empty() => {
                return Err(GatewayError::Execution(format!(
                    "execution '{}' stopped reporting before any node finished",
                    execution_id
                )));
            }
            None => {
                log::warn!("Execution '{}' ended without a final status", execution_id);
                RunOutcome::from_statuses(&statuses)
            }
        };

        if let Some(id) = self.editor.id() {
            self.emit(WorkflowEvent::ExecutionFinished {
                workflow_id: id.to_string(),
                execution_id: execution_id.clone(),
                outcome,
                completed,
                failed,
            });
        }
        Ok(ExecutionReport {
            execution_id,
            outcome,
            completed,
            failed,
        })
    }

    /// Run a single node and merge its results
    ///
    /// Only that node's run state and result fields change.
    pub async fn preview_node(&mut self, node_id: &str) -> Result<Map<String, Value>> {
        if self.editor.node(node_id).is_none() {
            return Err(GatewayError::NodeNotFound(node_id.to_string()));
        }
        let document = self.editor.document();

        self.editor.apply_run_state(node_id, RunState::running(0));
        match self.gateway.preview_node(&document, node_id).await {
            Ok(fragment) => {
                self.merge_results(node_id, &fragment);
                self.editor.apply_run_state(node_id, RunState::completed());
                self.emit(WorkflowEvent::PreviewCompleted {
                    node_id: node_id.to_string(),
                });
                Ok(fragment)
            }
            Err(e) => {
                self.editor
                    .apply_run_state(node_id, RunState::failed(e.to_string()));
                self.emit(WorkflowEvent::PreviewFailed {
                    node_id: node_id.to_string(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    fn merge_results(&mut self, node_id: &str, fragment: &Map<String, Value>) {
        if let Err(e) = self.editor.apply_results(node_id, fragment) {
            log::warn!("Discarded results for node '{}': {}", node_id, e);
        }
    }
}
