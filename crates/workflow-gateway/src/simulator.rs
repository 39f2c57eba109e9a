//! Local simulated executor
//!
//! Walks a document in dependency order, reporting per-node status and
//! coarse progress through an [`ExecutionReporter`]. Nodes whose payload is
//! not runnable, or whose upstream failed, end in `error`; the rest complete
//! with sample results. A run with both is `PartiallyCompleted`.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::task::JoinHandle;

use workflow_graph::{
    execution_order, upstream_subgraph, Node, NodeId, RunOutcome, RunState, RunStatus,
    WorkflowDocument,
};

use crate::backend::BackendError;
use crate::execution::ExecutionReporter;
use crate::samples::sample_results;

#[derive(Debug, Clone, Copy)]
pub struct SimulatedRunner {
    step: Duration,
}

impl SimulatedRunner {
    pub fn new(step: Duration) -> Self {
        Self { step }
    }

    /// Run `document` on a background task
    ///
    /// The task runs to completion even if nobody observes it.
    pub fn spawn(
        &self,
        document: WorkflowDocument,
        reporter: ExecutionReporter,
    ) -> JoinHandle<RunOutcome> {
        let step = self.step;
        tokio::spawn(async move { run(document, reporter, step).await })
    }

    /// Evaluate one node together with the subgraph feeding it
    ///
    /// Fails the way a full run would fail that node: when any upstream node
    /// is not runnable, or the node itself is not.
    pub async fn preview(
        &self,
        document: &WorkflowDocument,
        node_id: &str,
    ) -> Result<Map<String, Value>, BackendError> {
        let target = document
            .find_node(node_id)
            .ok_or_else(|| BackendError::NotFound(node_id.to_string()))?;

        for upstream_id in upstream_subgraph(&document.nodes, &document.edges, node_id) {
            if upstream_id == node_id {
                continue;
            }
            let Some(upstream) = document.find_node(&upstream_id) else {
                continue;
            };
            tokio::time::sleep(self.step).await;
            upstream.payload().readiness().map_err(|reason| {
                BackendError::Preview(format!("upstream node '{}' failed: {}", upstream_id, reason))
            })?;
        }

        tokio::time::sleep(self.step).await;
        target.payload().readiness().map_err(BackendError::Preview)?;
        Ok(sample_results(target.payload())?)
    }
}

async fn run(
    document: WorkflowDocument,
    reporter: ExecutionReporter,
    step: Duration,
) -> RunOutcome {
    let order = execution_order(&document.nodes, &document.edges);
    let total = order.len();
    let mut statuses: HashMap<NodeId, RunStatus> = HashMap::with_capacity(total);

    reporter.progress(0, Some(format!("Running {} node(s)", total)));

    for (index, node_id) in order.iter().enumerate() {
        let Some(node) = document.find_node(node_id) else {
            continue;
        };
        reporter.node_status(node_id, RunState::running(0), None);
        tokio::time::sleep(step).await;

        let failed_upstream = document
            .get_dependencies(node_id)
            .into_iter()
            .find(|dep| statuses.get(dep) == Some(&RunStatus::Error));

        let (run_state, results) = match failed_upstream {
            Some(dep) => (RunState::failed(format!("upstream node '{}' failed", dep)), None),
            None => match evaluate(node) {
                Ok(results) => (RunState::completed(), Some(results)),
                Err(reason) => (RunState::failed(reason), None),
            },
        };

        if let Some(error) = &run_state.last_error {
            log::debug!("Simulated node '{}' failed: {}", node_id, error);
        }
        statuses.insert(node_id.clone(), run_state.status);
        reporter.node_status(node_id, run_state, results);

        let progress = ((index + 1) * 100 / total) as u8;
        reporter.progress(progress, Some(format!("Finished {}", node.payload().label())));
    }

    let outcome = RunOutcome::from_statuses(statuses.values());
    if !reporter.finish(outcome) {
        log::debug!("Simulated run finished unobserved ({:?})", outcome);
    }
    outcome
}

fn evaluate(node: &Node) -> Result<Map<String, Value>, String> {
    node.payload().readiness()?;
    sample_results(node.payload()).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::{ExecutionMonitor, ExecutionUpdate};
    use serde_json::json;
    use workflow_graph::{NodeKind, WorkflowBuilder};

    fn runner() -> SimulatedRunner {
        SimulatedRunner::new(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_run_completes_ready_pipeline() {
        let doc = WorkflowBuilder::new("ok")
            .add_node("load", NodeKind::DatasetLoader, (0.0, 0.0))
            .with_payload(json!({"source": {"location": "churn.csv"}}))
            .add_node("eda", NodeKind::EdaAnalysis, (200.0, 0.0))
            .add_edge("load", "eda")
            .build()
            .unwrap();

        let (reporter, mut monitor) = ExecutionMonitor::channel("exec");
        let handle = runner().spawn(doc, reporter);

        let mut completed = Vec::new();
        let mut last = None;
        while let Some(update) = monitor.next().await {
            if let ExecutionUpdate::NodeStatus { node_id, run_state, results } = &update {
                if run_state.status == RunStatus::Completed {
                    assert!(results.is_some());
                    completed.push(node_id.clone());
                }
            }
            last = Some(update);
        }

        assert_eq!(completed, vec!["load", "eda"]);
        assert_eq!(last, Some(ExecutionUpdate::Finished { outcome: RunOutcome::Completed }));
        assert_eq!(handle.await.unwrap(), RunOutcome::Completed);
    }

    #[tokio::test]
    async fn test_unready_node_fails_its_branch_only() {
        // loader has no source: it and its dependent fail, the custom source completes
        let doc = WorkflowBuilder::new("partial")
            .add_node("load", NodeKind::DatasetLoader, (0.0, 0.0))
            .add_node("check", NodeKind::QualityChecker, (200.0, 0.0))
            .add_node("other", NodeKind::Source, (0.0, 200.0))
            .add_edge("load", "check")
            .build()
            .unwrap();

        let (reporter, monitor) = ExecutionMonitor::channel("exec");
        let outcome = runner().spawn(doc, reporter).await.unwrap();
        assert_eq!(outcome, RunOutcome::PartiallyCompleted);

        drop(monitor);
    }

    #[tokio::test]
    async fn test_run_survives_dropped_monitor() {
        let doc = WorkflowBuilder::new("unobserved")
            .add_node("a", NodeKind::Source, (0.0, 0.0))
            .build()
            .unwrap();

        let (reporter, monitor) = ExecutionMonitor::channel("exec");
        drop(monitor);
        assert_eq!(runner().spawn(doc, reporter).await.unwrap(), RunOutcome::Completed);
    }

    #[tokio::test]
    async fn test_held_monitor_does_not_stall_run() {
        let mut builder = WorkflowBuilder::new("wide");
        for i in 0..80 {
            builder = builder.add_node(format!("n{}", i), NodeKind::Source, (0.0, i as f64));
        }
        let doc = builder.build().unwrap();

        let (reporter, monitor) = ExecutionMonitor::channel("exec");
        let handle = runner().spawn(doc, reporter);
        let outcome = tokio::time::timeout(Duration::from_secs(10), handle)
            .await
            .expect("run stalled behind an unread monitor")
            .unwrap();
        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(monitor.progress(), 0);
    }

    #[tokio::test]
    async fn test_preview_reports_readiness() {
        let doc = WorkflowBuilder::new("preview")
            .add_node("eda", NodeKind::EdaAnalysis, (0.0, 0.0))
            .add_node("merge", NodeKind::DataMerger, (0.0, 200.0))
            .build()
            .unwrap();

        let fragment = runner().preview(&doc, "eda").await.unwrap();
        assert!(fragment.contains_key("results"));
        assert!(matches!(
            runner().preview(&doc, "merge").await,
            Err(BackendError::Preview(_))
        ));
        assert!(matches!(
            runner().preview(&doc, "ghost").await,
            Err(BackendError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_preview_agrees_with_full_run_on_upstream_failure() {
        let doc = WorkflowBuilder::new("unready source")
            .add_node("load", NodeKind::DatasetLoader, (0.0, 0.0))
            .add_node("check", NodeKind::QualityChecker, (200.0, 0.0))
            .add_edge("load", "check")
            .build()
            .unwrap();

        let err = runner().preview(&doc, "check").await.unwrap_err();
        match err {
            BackendError::Preview(reason) => assert!(reason.contains("'load'"), "{}", reason),
            other => panic!("unexpected error: {}", other),
        }

        let (reporter, mut monitor) = ExecutionMonitor::channel("exec");
        runner().spawn(doc, reporter);
        let mut check_status = None;
        while let Some(update) = monitor.next().await {
            if let ExecutionUpdate::NodeStatus { node_id, run_state, .. } = update {
                if node_id == "check" {
                    check_status = Some(run_state.status);
                }
            }
        }
        assert_eq!(check_status, Some(RunStatus::Error));
    }
}
