//! Protocol Notifier
//!
//! Fan-out of run lifecycle events (pre-execution, per-step completion,
//! terminal failure, final completion) to zero or more independently-failing
//! observer channels. Notification is best-effort: a channel's failure is
//! caught and logged at the hub boundary and never reaches the execution
//! controller or its siblings. Execution correctness never depends on any
//! channel.

pub mod channels;

pub use channels::{EventStreamChannel, LogChannel, RunEvent};

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use plan_forge_core::{CoreResult, ExecutionReport, ExecutionResult, PlanSummary};

/// One observer channel receiving run lifecycle events.
///
/// Hooks default to no-ops so a channel implements only the events its
/// protocol cares about (completion-only listeners, step streams, etc.).
#[async_trait]
pub trait NotifierChannel: Send + Sync {
    /// Channel name, used in failure logs.
    fn name(&self) -> &str;

    /// Called once before the first wave dispatches.
    async fn on_run_started(&self, _summary: &PlanSummary) -> CoreResult<()> {
        Ok(())
    }

    /// Called after each step reaches a terminal state.
    async fn on_step(&self, _result: &ExecutionResult) -> CoreResult<()> {
        Ok(())
    }

    /// Called exactly once when the run aborts on a step failure.
    async fn on_run_failed(&self, _step_index: u32, _error: &str) -> CoreResult<()> {
        Ok(())
    }

    /// Called exactly once when the run ends without aborting.
    async fn on_run_completed(&self, _report: &ExecutionReport) -> CoreResult<()> {
        Ok(())
    }
}

/// Ordered fan-out over the registered observer channels.
#[derive(Default)]
pub struct NotifierHub {
    channels: Vec<Arc<dyn NotifierChannel>>,
}

impl NotifierHub {
    /// Create a hub with no channels (notifications become no-ops).
    pub fn new() -> Self {
        Self {
            channels: Vec::new(),
        }
    }

    /// Register an observer channel. Channels are notified in registration
    /// order.
    pub fn register(&mut self, channel: Arc<dyn NotifierChannel>) {
        self.channels.push(channel);
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Pre-execution hook fan-out.
    pub async fn notify_before_run(&self, summary: &PlanSummary) {
        for channel in &self.channels {
            if let Err(err) = channel.on_run_started(summary).await {
                warn!(channel = channel.name(), error = %err, "notifier channel failed on run start");
            }
        }
    }

    /// Per-step hook fan-out.
    pub async fn notify_step(&self, result: &ExecutionResult) {
        for channel in &self.channels {
            if let Err(err) = channel.on_step(result).await {
                warn!(channel = channel.name(), error = %err, "notifier channel failed on step");
            }
        }
    }

    /// Terminal-failure hook fan-out.
    pub async fn notify_error(&self, step_index: u32, error: &str) {
        for channel in &self.channels {
            if let Err(err) = channel.on_run_failed(step_index, error).await {
                warn!(channel = channel.name(), error = %err, "notifier channel failed on run failure");
            }
        }
    }

    /// Completion hook fan-out.
    pub async fn notify_completion(&self, report: &ExecutionReport) {
        for channel in &self.channels {
            if let Err(err) = channel.on_run_completed(report).await {
                warn!(channel = channel.name(), error = %err, "notifier channel failed on completion");
            }
        }
    }
}

impl std::fmt::Debug for NotifierHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifierHub")
            .field(
                "channels",
                &self.channels.iter().map(|c| c.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
