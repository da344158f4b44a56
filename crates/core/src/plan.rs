//! Plan Data Model
//!
//! Wire types for AI-generated plans and the result types produced while
//! running them. A `Plan` is an ordered sequence of `Step`s; running one
//! yields an `ExecutionReport` with exactly one `ExecutionResult` per step,
//! in the plan's original order.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ExtractionFailure;

/// One unit of work in a plan, naming an operation and its parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// 1-based step index; authoritative execution order
    #[serde(rename = "step")]
    pub index: u32,
    /// Human-readable description of the step
    pub description: String,
    /// Operation name, resolvable in the tool registry (e.g. "calc.open")
    pub operation: String,
    /// Arguments passed to the capability
    pub parameters: Value,
    /// Indices of earlier steps this step depends on
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<u32>,
}

impl Step {
    /// Whether this step declares no dependencies.
    pub fn is_independent(&self) -> bool {
        self.depends_on.is_empty()
    }
}

/// Ordered sequence of steps derived from an AI response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub steps: Vec<Step>,
}

impl Plan {
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step indices in plan order.
    pub fn indices(&self) -> Vec<u32> {
        self.steps.iter().map(|s| s.index).collect()
    }

    /// Look up a step by index.
    pub fn step(&self, index: u32) -> Option<&Step> {
        self.steps.iter().find(|s| s.index == index)
    }

    /// Operation names in plan order (for summaries and audit).
    pub fn operations(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.operation.clone()).collect()
    }
}

/// Metadata recorded alongside every extraction attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionMetadata {
    /// Classified failure reason (code form), if extraction failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Number of extracted steps, if extraction succeeded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_count: Option<usize>,
    /// The raw model response, retained for audit
    pub raw_response: String,
}

/// Outcome of one extraction attempt over raw model text.
///
/// Created once per input and immutable after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
    pub metadata: ExtractionMetadata,
}

impl ExtractionResult {
    /// Create a successful extraction result.
    pub fn ok(plan: Plan, raw_response: impl Into<String>) -> Self {
        let step_count = plan.len();
        Self {
            success: true,
            plan: Some(plan),
            metadata: ExtractionMetadata {
                error_message: None,
                step_count: Some(step_count),
                raw_response: raw_response.into(),
            },
        }
    }

    /// Create a failed extraction result with a classified reason.
    pub fn failed(reason: &ExtractionFailure, raw_response: impl Into<String>) -> Self {
        Self {
            success: false,
            plan: None,
            metadata: ExtractionMetadata {
                error_message: Some(reason.to_string()),
                step_count: None,
                raw_response: raw_response.into(),
            },
        }
    }
}

/// Error string recorded on steps skipped because a dependency failed.
pub const SKIPPED_DEPENDENCY_FAILED: &str = "skipped: dependency failed";

/// Error string recorded on steps never started because the run was cancelled.
pub const CANCELLED: &str = "cancelled";

/// Terminal outcome of one step; immutable once the final attempt resolves.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    /// Index of the step this result belongs to
    pub step_index: u32,
    /// Whether the final attempt succeeded
    pub success: bool,
    /// Capability output (if successful)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    /// Error message (if failed, skipped, or cancelled)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Number of capability invocations made (0 if never invoked)
    pub attempts: u32,
}

impl ExecutionResult {
    /// Create a successful result.
    pub fn ok(step_index: u32, output: Value, attempts: u32) -> Self {
        Self {
            step_index,
            success: true,
            output: Some(output),
            error: None,
            attempts,
        }
    }

    /// Create a failed result.
    pub fn failed(step_index: u32, error: impl Into<String>, attempts: u32) -> Self {
        Self {
            step_index,
            success: false,
            output: None,
            error: Some(error.into()),
            attempts,
        }
    }

    /// Create a result for a step skipped because a dependency failed.
    /// The capability was never invoked.
    pub fn skipped(step_index: u32) -> Self {
        Self::failed(step_index, SKIPPED_DEPENDENCY_FAILED, 0)
    }

    /// Create a result for a step never started because the run was cancelled.
    pub fn cancelled(step_index: u32) -> Self {
        Self::failed(step_index, CANCELLED, 0)
    }

    /// Whether this step was skipped due to a failed dependency.
    pub fn is_skipped(&self) -> bool {
        self.error.as_deref() == Some(SKIPPED_DEPENDENCY_FAILED)
    }

    /// Whether this step was cancelled before it started.
    pub fn is_cancelled(&self) -> bool {
        self.error.as_deref() == Some(CANCELLED)
    }
}

/// Aggregated outcome of one plan run.
///
/// Owned by the execution controller for the duration of the run; the caller
/// persists or discards it after return.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    /// Unique identifier for this run
    pub run_id: String,
    /// One result per plan step, in original step order
    pub results: Vec<ExecutionResult>,
    /// Whether every step succeeded and the run was not cancelled
    pub success: bool,
    /// Number of successful steps
    pub completed: usize,
    /// Number of failed steps (including skipped and cancelled)
    pub failed: usize,
    /// Whether the run was cancelled
    pub cancelled: bool,
    /// Total run duration in milliseconds
    pub total_duration_ms: u64,
    /// RFC 3339 timestamp at run start
    pub started_at: String,
    /// RFC 3339 timestamp at run end
    pub finished_at: String,
}

impl ExecutionReport {
    /// Step indices in report order.
    pub fn step_indices(&self) -> Vec<u32> {
        self.results.iter().map(|r| r.step_index).collect()
    }

    /// Result for a given step index.
    pub fn result(&self, step_index: u32) -> Option<&ExecutionResult> {
        self.results.iter().find(|r| r.step_index == step_index)
    }
}

/// Compact description of a plan, handed to the pre-execution hook.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    pub run_id: String,
    pub step_count: usize,
    pub operations: Vec<String>,
}

impl PlanSummary {
    pub fn new(run_id: impl Into<String>, plan: &Plan) -> Self {
        Self {
            run_id: run_id.into(),
            step_count: plan.len(),
            operations: plan.operations(),
        }
    }
}

/// State machine for one plan run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Completed,
    Aborted,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Aborted)
    }
}
