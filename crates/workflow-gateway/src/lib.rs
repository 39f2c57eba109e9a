//! Persistence and execution gateway for workflow documents
//!
//! This crate connects a [`workflow_graph::WorkflowEditor`] to storage and
//! execution backends:
//!
//! - **HTTP**: a remote workflow server speaking the REST contract
//! - **File**: one JSON document per file in a local directory
//! - **Memory**: process-local storage for tests and offline use
//!
//! File and memory backends run documents with a simulated executor that
//! reports the same progress and per-node status updates a server would.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use workflow_gateway::{EditorSession, GatewayConfig, WorkflowGateway};
//! use workflow_graph::WorkflowEditor;
//!
//! let config = GatewayConfig::load(&config_dir).await?;
//! let gateway = Arc::new(WorkflowGateway::from_config(&config)?);
//! let mut session = EditorSession::new(WorkflowEditor::new("Churn model"), gateway);
//!
//! session.save().await?;
//! let report = session.run_to_completion().await?;
//! ```

pub mod backend;
pub mod config;
pub mod constants;
pub mod error;
pub mod execution;
pub mod gateway;
pub mod samples;
pub mod session;
pub mod simulator;

// Re-exports for convenience
pub use backend::{
    BackendError, FileWorkflowBackend, HttpWorkflowBackend, InMemoryWorkflowBackend,
    WorkflowBackend, WorkflowSummary,
};
pub use config::{BackendSelection, ConfigError, GatewayConfig};
pub use error::{GatewayError, Result};
pub use execution::{ExecutionMonitor, ExecutionReporter, ExecutionUpdate};
pub use gateway::{SharedGateway, WorkflowGateway};
pub use session::{EditorSession, ExecutionReport};
pub use simulator::SimulatedRunner;
