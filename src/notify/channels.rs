//! Built-in Notifier Channels
//!
//! Two concrete observer channels ship with the core:
//!
//! - [`LogChannel`] - writes lifecycle events to the tracing subscriber
//! - [`EventStreamChannel`] - serializes lifecycle events as [`RunEvent`]s
//!   onto an in-process mpsc stream, for agent-to-agent consumers and
//!   completion listeners that live outside the controller

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;

use plan_forge_core::{CoreError, CoreResult, ExecutionReport, ExecutionResult, PlanSummary};

use super::NotifierChannel;

/// A serialized run lifecycle event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum RunEvent {
    RunStarted {
        summary: PlanSummary,
        timestamp: String,
    },
    StepResolved {
        result: ExecutionResult,
        timestamp: String,
    },
    RunFailed {
        step_index: u32,
        error: String,
        timestamp: String,
    },
    RunCompleted {
        report: ExecutionReport,
        timestamp: String,
    },
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Observer channel that logs lifecycle events via `tracing`.
#[derive(Debug, Default)]
pub struct LogChannel;

impl LogChannel {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotifierChannel for LogChannel {
    fn name(&self) -> &str {
        "log"
    }

    async fn on_run_started(&self, summary: &PlanSummary) -> CoreResult<()> {
        info!(
            run_id = %summary.run_id,
            steps = summary.step_count,
            "plan run started"
        );
        Ok(())
    }

    async fn on_step(&self, result: &ExecutionResult) -> CoreResult<()> {
        info!(
            step = result.step_index,
            success = result.success,
            attempts = result.attempts,
            error = result.error.as_deref().unwrap_or(""),
            "step resolved"
        );
        Ok(())
    }

    async fn on_run_failed(&self, step_index: u32, error: &str) -> CoreResult<()> {
        info!(step = step_index, error, "plan run aborted");
        Ok(())
    }

    async fn on_run_completed(&self, report: &ExecutionReport) -> CoreResult<()> {
        info!(
            run_id = %report.run_id,
            success = report.success,
            completed = report.completed,
            failed = report.failed,
            cancelled = report.cancelled,
            duration_ms = report.total_duration_ms,
            "plan run finished"
        );
        Ok(())
    }
}

/// Observer channel that forwards [`RunEvent`]s over an unbounded mpsc
/// stream.
///
/// The receiving half belongs to the consumer (another agent, a UI bridge,
/// a persistence task). If the consumer drops its receiver the channel
/// starts failing; the hub logs and swallows those failures, so a vanished
/// consumer never disturbs a run.
pub struct EventStreamChannel {
    sender: mpsc::UnboundedSender<RunEvent>,
}

impl EventStreamChannel {
    /// Create the channel plus the receiving half for the consumer.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<RunEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn emit(&self, event: RunEvent) -> CoreResult<()> {
        self.sender
            .send(event)
            .map_err(|_| CoreError::internal("event stream consumer disconnected"))
    }
}

#[async_trait]
impl NotifierChannel for EventStreamChannel {
    fn name(&self) -> &str {
        "event-stream"
    }

    async fn on_run_started(&self, summary: &PlanSummary) -> CoreResult<()> {
        self.emit(RunEvent::RunStarted {
            summary: summary.clone(),
            timestamp: now_rfc3339(),
        })
    }

    async fn on_step(&self, result: &ExecutionResult) -> CoreResult<()> {
        self.emit(RunEvent::StepResolved {
            result: result.clone(),
            timestamp: now_rfc3339(),
        })
    }

    async fn on_run_failed(&self, step_index: u32, error: &str) -> CoreResult<()> {
        self.emit(RunEvent::RunFailed {
            step_index,
            error: error.to_string(),
            timestamp: now_rfc3339(),
        })
    }

    async fn on_run_completed(&self, report: &ExecutionReport) -> CoreResult<()> {
        self.emit(RunEvent::RunCompleted {
            report: report.clone(),
            timestamp: now_rfc3339(),
        })
    }
}
