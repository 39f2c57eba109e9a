//! Event types for streaming workflow activity
//!
//! Events are sent from the engine to the UI (or any consumer) to report
//! saves, loads, execution progress and per-node status changes.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::types::{NodeId, RunState, RunStatus, WorkflowId};

/// Trait for sending workflow events
///
/// This abstracts over the transport mechanism (UI channel, mpsc, log, etc.)
/// allowing the engine to be used in different contexts.
pub trait EventSink: Send + Sync {
    /// Send an event
    ///
    /// Returns an error if the event could not be sent (e.g., channel closed)
    fn send(&self, event: WorkflowEvent) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone, thiserror::Error)]
#[error("Event error: {message}")]
pub struct EventError {
    pub message: String,
}

/// Terminal state of a whole run
///
/// Distinct from any single node's status: a run in which some nodes failed
/// and others completed is `PartiallyCompleted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    PartiallyCompleted,
    Failed,
}

impl RunOutcome {
    /// Derive the outcome from per-node terminal statuses
    pub fn from_statuses<'a>(statuses: impl IntoIterator<Item = &'a RunStatus>) -> Self {
        let (mut completed, mut failed) = (0usize, 0usize);
        for status in statuses {
            match status {
                RunStatus::Completed => completed += 1,
                RunStatus::Error => failed += 1,
                _ => {}
            }
        }
        match (completed, failed) {
            (_, 0) => Self::Completed,
            (0, _) => Self::Failed,
            _ => Self::PartiallyCompleted,
        }
    }
}

/// Events emitted while editing and running a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WorkflowEvent {
    /// Document persisted (created or updated)
    #[serde(rename_all = "camelCase")]
    WorkflowSaved { workflow_id: WorkflowId, created: bool },

    /// Document loaded and adopted as the live document
    #[serde(rename_all = "camelCase")]
    WorkflowLoaded { workflow_id: WorkflowId },

    /// Execution accepted by the backend
    #[serde(rename_all = "camelCase")]
    ExecutionStarted {
        workflow_id: WorkflowId,
        execution_id: String,
    },

    /// Coarse progress for the whole run (0-100, never decreasing)
    #[serde(rename_all = "camelCase")]
    ExecutionProgress {
        execution_id: String,
        progress: u8,
        message: Option<String>,
    },

    /// A node's run state changed
    #[serde(rename_all = "camelCase")]
    NodeStatusChanged {
        node_id: NodeId,
        run_state: RunState,
    },

    /// Execution finished
    #[serde(rename_all = "camelCase")]
    ExecutionFinished {
        workflow_id: WorkflowId,
        execution_id: String,
        outcome: RunOutcome,
        completed: usize,
        failed: usize,
    },

    /// Single-node preview finished
    #[serde(rename_all = "camelCase")]
    PreviewCompleted { node_id: NodeId },

    /// Single-node preview failed
    #[serde(rename_all = "camelCase")]
    PreviewFailed { node_id: NodeId, error: String },
}

impl WorkflowEvent {
    /// Create an execution progress event
    pub fn progress(execution_id: &str, progress: u8, message: Option<String>) -> Self {
        Self::ExecutionProgress {
            execution_id: execution_id.to_string(),
            progress,
            message,
        }
    }

    /// Create a node status event
    pub fn node_status(node_id: &str, run_state: RunState) -> Self {
        Self::NodeStatusChanged {
            node_id: node_id.to_string(),
            run_state,
        }
    }
}

/// A no-op event sink that discards all events
///
/// Useful for testing or when events aren't needed.
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: WorkflowEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// A vector-based event sink that collects events
///
/// Useful for testing to verify events were emitted correctly.
#[derive(Default)]
pub struct VecEventSink {
    events: Mutex<Vec<WorkflowEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<WorkflowEvent> {
        self.events.lock().clone()
    }

    /// Clear all collected events
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: WorkflowEvent) -> Result<(), EventError> {
        self.events.lock().push(event);
        Ok(())
    }
}
