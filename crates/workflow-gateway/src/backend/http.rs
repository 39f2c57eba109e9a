//! REST backend for a remote workflow server
//!
//! Routes (relative to the base URL):
//!
//! - `GET /workflows` - list summaries
//! - `POST /workflows` - create, responds `{ "id": ... }`
//! - `PUT /workflows/{id}` - update
//! - `GET /workflows/{id}` - fetch
//! - `POST /workflows/{id}/execute` - start, responds `{ "executionId": ... }`
//! - `GET /workflows/{id}/executions/{executionId}` - poll run status
//! - `GET /workflow-preview/{nodeId}` - preview one node
//!
//! Execution status is polled on a background task and forwarded through
//! the monitor channel. Polling stops when the run finishes or when nobody
//! observes it any more; the server-side run is never cancelled.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use workflow_graph::{Edge, Node, NodeId, RunOutcome, RunState, WorkflowDocument, WorkflowId};

use super::{api_error, BackendError, WorkflowBackend, WorkflowSummary};
use crate::execution::{ExecutionMonitor, ExecutionReporter};

/// Consecutive poll failures tolerated before monitoring gives up
const MAX_POLL_FAILURES: u32 = 3;

#[derive(Debug, Deserialize)]
struct CreatedResponse {
    id: WorkflowId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteResponse {
    execution_id: String,
}

/// Server-side state of a whole run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionState {
    Queued,
    Running,
    Completed,
    PartiallyCompleted,
    Failed,
}

impl ExecutionState {
    fn outcome(self) -> Option<RunOutcome> {
        match self {
            Self::Queued | Self::Running => None,
            Self::Completed => Some(RunOutcome::Completed),
            Self::PartiallyCompleted => Some(RunOutcome::PartiallyCompleted),
            Self::Failed => Some(RunOutcome::Failed),
        }
    }
}

/// Per-node entry of a status poll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRunReport {
    pub node_id: NodeId,
    pub run_state: RunState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Map<String, Value>>,
}

/// Response body of a status poll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStatus {
    pub status: ExecutionState,
    #[serde(default)]
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub nodes: Vec<NodeRunReport>,
}

pub struct HttpWorkflowBackend {
    /// HTTP client for API requests
    http_client: reqwest::Client,
    /// Base URL without a trailing slash
    base_url: String,
    poll_interval: Duration,
}

impl HttpWorkflowBackend {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Self, BackendError> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            poll_interval,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Map a 404 to `NotFound` and any other failure to `Api`
    async fn check(
        response: reqwest::Response,
        id: &str,
    ) -> Result<reqwest::Response, BackendError> {
        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::NOT_FOUND => Err(BackendError::NotFound(id.to_string())),
            _ => Err(api_error(response).await),
        }
    }
}

/// Create/update request body; the id travels in the path
#[derive(Serialize)]
struct DocumentBody<'a> {
    name: &'a str,
    description: &'a str,
    nodes: &'a [Node],
    edges: &'a [Edge],
}

impl<'a> From<&'a WorkflowDocument> for DocumentBody<'a> {
    fn from(document: &'a WorkflowDocument) -> Self {
        Self {
            name: &document.name,
            description: &document.description,
            nodes: &document.nodes,
            edges: &document.edges,
        }
    }
}

#[async_trait]
impl WorkflowBackend for HttpWorkflowBackend {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn create(&self, document: &WorkflowDocument) -> Result<WorkflowId, BackendError> {
        let response = self
            .http_client
            .post(self.url("/workflows"))
            .json(&DocumentBody::from(document))
            .send()
            .await
            .map_err(BackendError::Http)?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let created: CreatedResponse = response.json().await.map_err(|e| {
            BackendError::InvalidResponse(format!("Failed to parse create response: {}", e))
        })?;
        log::info!("Created workflow '{}' on {}", created.id, self.base_url);
        Ok(created.id)
    }

    async fn update(&self, id: &str, document: &WorkflowDocument) -> Result<(), BackendError> {
        let response = self
            .http_client
            .put(self.url(&format!("/workflows/{}", id)))
            .json(&DocumentBody::from(document))
            .send()
            .await
            .map_err(BackendError::Http)?;

        Self::check(response, id).await?;
        Ok(())
    }

    async fn fetch(&self, id: &str) -> Result<WorkflowDocument, BackendError> {
        let response = self
            .http_client
            .get(self.url(&format!("/workflows/{}", id)))
            .send()
            .await
            .map_err(BackendError::Http)?;

        let body = Self::check(response, id).await?.text().await?;
        let mut document: WorkflowDocument = serde_json::from_str(&body)?;
        document.id.get_or_insert_with(|| id.to_string());
        Ok(document)
    }

    async fn list(&self) -> Result<Vec<WorkflowSummary>, BackendError> {
        let response = self
            .http_client
            .get(self.url("/workflows"))
            .send()
            .await
            .map_err(BackendError::Http)?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(format!("Failed to parse listing: {}", e)))
    }

    async fn start_execution(&self, id: &str) -> Result<ExecutionMonitor, BackendError> {
        let response = self
            .http_client
            .post(self.url(&format!("/workflows/{}/execute", id)))
            .send()
            .await
            .map_err(BackendError::Http)?;

        let started: ExecuteResponse = Self::check(response, id).await?.json().await.map_err(|e| {
            BackendError::InvalidResponse(format!("Failed to parse execute response: {}", e))
        })?;

        let (reporter, monitor) = ExecutionMonitor::channel(started.execution_id.clone());
        let poller = StatusPoller {
            http_client: self.http_client.clone(),
            status_url: self.url(&format!(
                "/workflows/{}/executions/{}",
                id, started.execution_id
            )),
            interval: self.poll_interval,
        };
        tokio::spawn(poller.run(reporter));

        log::info!("Started execution '{}' of '{}'", started.execution_id, id);
        Ok(monitor)
    }

    async fn preview_node(
        &self,
        _document: &WorkflowDocument,
        node_id: &str,
    ) -> Result<Map<String, Value>, BackendError> {
        let response = self
            .http_client
            .get(self.url(&format!("/workflow-preview/{}", node_id)))
            .send()
            .await
            .map_err(BackendError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Preview(format!("API error {}: {}", status, body)));
        }
        response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(format!("Failed to parse preview: {}", e)))
    }
}

struct StatusPoller {
    http_client: reqwest::Client,
    status_url: String,
    interval: Duration,
}

impl StatusPoller {
    async fn run(self, reporter: ExecutionReporter) {
        let mut last_seen: HashMap<NodeId, RunState> = HashMap::new();
        let mut failures = 0u32;

        while reporter.is_observed() {
            tokio::time::sleep(self.interval).await;

            let status = match self.poll().await {
                Ok(status) => {
                    failures = 0;
                    status
                }
                Err(e) => {
                    failures += 1;
                    log::warn!(
                        "Execution status poll failed ({}/{}): {}",
                        failures,
                        MAX_POLL_FAILURES,
                        e
                    );
                    if failures >= MAX_POLL_FAILURES {
                        log::error!("Giving up on {}", self.status_url);
                        return;
                    }
                    continue;
                }
            };

            for report in status.nodes {
                if last_seen.get(&report.node_id) == Some(&report.run_state) {
                    continue;
                }
                last_seen.insert(report.node_id.clone(), report.run_state.clone());
                reporter.node_status(&report.node_id, report.run_state, report.results);
            }
            reporter.progress(status.progress, status.message);

            if let Some(outcome) = status.status.outcome() {
                reporter.finish(outcome);
                return;
            }
        }
        log::debug!("Stopped polling {}: monitor dropped", self.status_url);
    }

    async fn poll(&self) -> Result<ExecutionStatus, BackendError> {
        let response = self
            .http_client
            .get(&self.status_url)
            .send()
            .await
            .map_err(BackendError::Http)?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(response.json().await?)
    }
}
