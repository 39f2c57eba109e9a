//! Execution monitoring
//!
//! A backend that starts a run hands back an [`ExecutionMonitor`]; the work
//! itself reports through the paired [`ExecutionReporter`]. Dropping the
//! monitor stops observation only: the run keeps going and the reporter
//! just stops delivering.

use futures_util::Stream;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use workflow_graph::{NodeId, RunOutcome, RunState};

/// One observation of a running execution
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionUpdate {
    /// Whole-run progress, 0-100
    Progress { progress: u8, message: Option<String> },
    /// A node changed state, optionally with result fields for its payload
    NodeStatus {
        node_id: NodeId,
        run_state: RunState,
        results: Option<Map<String, Value>>,
    },
    /// The run is over; nothing follows this update
    Finished { outcome: RunOutcome },
}

/// Producer side of an execution channel
///
/// Sending never waits: a monitor that is held but not read only buffers.
#[derive(Debug, Clone)]
pub struct ExecutionReporter {
    sender: mpsc::UnboundedSender<ExecutionUpdate>,
}

impl ExecutionReporter {
    /// Deliver an update
    ///
    /// Returns `false` once the monitor has been dropped.
    pub fn send(&self, update: ExecutionUpdate) -> bool {
        self.sender.send(update).is_ok()
    }

    pub fn progress(&self, progress: u8, message: Option<String>) -> bool {
        self.send(ExecutionUpdate::Progress { progress, message })
    }

    pub fn node_status(
        &self,
        node_id: &str,
        run_state: RunState,
        results: Option<Map<String, Value>>,
    ) -> bool {
        self.send(ExecutionUpdate::NodeStatus {
            node_id: node_id.to_string(),
            run_state,
            results,
        })
    }

    pub fn finish(&self, outcome: RunOutcome) -> bool {
        self.send(ExecutionUpdate::Finished { outcome })
    }

    /// Whether anyone is still listening
    pub fn is_observed(&self) -> bool {
        !self.sender.is_closed()
    }
}

/// Consumer side of an execution channel
///
/// Normalizes what the producer sends: progress never decreases and never
/// exceeds 100, a `Progress { 100 }` always precedes `Finished`, and nothing
/// is yielded after `Finished`.
#[derive(Debug)]
pub struct ExecutionMonitor {
    execution_id: String,
    receiver: mpsc::UnboundedReceiver<ExecutionUpdate>,
    last_progress: u8,
    pending: Option<ExecutionUpdate>,
    finished: bool,
}

impl ExecutionMonitor {
    /// Create a connected reporter/monitor pair
    pub fn channel(execution_id: impl Into<String>) -> (ExecutionReporter, Self) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let monitor = Self {
            execution_id: execution_id.into(),
            receiver,
            last_progress: 0,
            pending: None,
            finished: false,
        };
        (ExecutionReporter { sender }, monitor)
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    /// Highest progress observed so far
    pub fn progress(&self) -> u8 {
        self.last_progress
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Wait for the next update
    ///
    /// Returns `None` after `Finished`, or if the producer went away without
    /// finishing.
    pub async fn next(&mut self) -> Option<ExecutionUpdate> {
        if let Some(update) = self.pending.take() {
            self.finished = true;
            return Some(update);
        }
        if self.finished {
            return None;
        }

        match self.receiver.recv().await? {
            ExecutionUpdate::Progress { progress, message } => {
                self.last_progress = self.last_progress.max(progress.min(100));
                Some(ExecutionUpdate::Progress {
                    progress: self.last_progress,
                    message,
                })
            }
            ExecutionUpdate::Finished { outcome } if self.last_progress < 100 => {
                self.last_progress = 100;
                self.pending = Some(ExecutionUpdate::Finished { outcome });
                Some(ExecutionUpdate::Progress {
                    progress: 100,
                    message: None,
                })
            }
            ExecutionUpdate::Finished { outcome } => {
                self.finished = true;
                Some(ExecutionUpdate::Finished { outcome })
            }
            update => Some(update),
        }
    }

    /// Consume the monitor as a stream of updates
    pub fn into_stream(self) -> impl Stream<Item = ExecutionUpdate> + Send {
        futures_util::stream::unfold(self, |mut monitor| async move {
            monitor.next().await.map(|update| (update, monitor))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn test_progress_is_monotonic_and_capped() {
        let (reporter, mut monitor) = ExecutionMonitor::channel("exec-1");
        reporter.progress(40, None);
        reporter.progress(20, None);
        reporter.progress(250, None);
        drop(reporter);

        let mut seen = Vec::new();
        while let Some(ExecutionUpdate::Progress { progress, .. }) = monitor.next().await {
            seen.push(progress);
        }
        assert_eq!(seen, vec![40, 40, 100]);
    }

    #[tokio::test]
    async fn test_finish_is_preceded_by_full_progress() {
        let (reporter, monitor) = ExecutionMonitor::channel("exec-1");
        reporter.progress(10, None);
        reporter.finish(RunOutcome::PartiallyCompleted);
        reporter.progress(50, None);

        let updates: Vec<_> = monitor.into_stream().collect().await;
        assert_eq!(updates.len(), 3);
        assert!(matches!(updates[1], ExecutionUpdate::Progress { progress: 100, .. }));
        assert_eq!(
            updates[2],
            ExecutionUpdate::Finished {
                outcome: RunOutcome::PartiallyCompleted
            }
        );
    }

    #[tokio::test]
    async fn test_dropped_monitor_does_not_fail_producer() {
        let (reporter, monitor) = ExecutionMonitor::channel("exec-1");
        assert!(reporter.is_observed());
        drop(monitor);

        assert!(!reporter.is_observed());
        assert!(!reporter.progress(50, None));
    }

    #[tokio::test]
    async fn test_unread_monitor_never_blocks_reporter() {
        let (reporter, mut monitor) = ExecutionMonitor::channel("exec-1");
        for i in 0..500u32 {
            assert!(reporter.node_status(&format!("n{}", i), RunState::completed(), None));
            assert!(reporter.progress((i / 5) as u8, None));
        }
        assert!(reporter.finish(RunOutcome::Completed));
        drop(reporter);

        let mut count = 0;
        while monitor.next().await.is_some() {
            count += 1;
        }
        // 1000 updates, a synthesized 100 and the final status
        assert_eq!(count, 1002);
        assert!(monitor.is_finished());
    }
}
