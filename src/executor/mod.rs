//! Execution Controller
//!
//! Top-level orchestrator for one plan run. Consumes a validated plan,
//! partitions its steps into dependency waves, dispatches each wave to the
//! parallel task manager against the tool registry, applies the retry
//! policy, and aggregates one `ExecutionResult` per step into an ordered
//! `ExecutionReport`. Lifecycle hooks fan out through the notifier hub at
//! run start, per step, and exactly once at the terminal transition.

pub mod waves;

pub use waves::compute_waves;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use plan_forge_core::{
    CoreError, CoreResult, ExecutionReport, ExecutionResult, Plan, PlanSummary, RunState, Step,
    ToolRegistry,
};

use crate::notify::NotifierHub;
use crate::parallel::{TaskManager, TaskUnit};

// ============================================================================
// Options
// ============================================================================

/// Delay schedule between retry attempts.
///
/// `delay_for(attempt)` is monotonic non-decreasing in the attempt number
/// for both variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BackoffPolicy {
    /// The same delay before every retry.
    Fixed { delay_ms: u64 },
    /// Delay doubles per failed attempt, saturating at `cap_ms`.
    Exponential { initial_ms: u64, cap_ms: u64 },
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::Fixed { delay_ms: 500 }
    }
}

impl BackoffPolicy {
    /// Delay to sleep after the given failed attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay_ms } => Duration::from_millis(*delay_ms),
            Self::Exponential { initial_ms, cap_ms } => {
                let doublings = attempt.saturating_sub(1).min(20);
                let scaled = initial_ms.saturating_mul(1u64 << doublings);
                Duration::from_millis(scaled.min(*cap_ms))
            }
        }
    }
}

/// Configuration for one plan run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOptions {
    /// Keep dispatching dependents of failed steps instead of skipping them
    #[serde(default)]
    pub continue_on_error: bool,
    /// Retries per step beyond the first attempt
    #[serde(default)]
    pub max_retries: u32,
    /// Delay schedule between attempts
    #[serde(default)]
    pub backoff: BackoffPolicy,
    /// Maximum number of steps running concurrently within a wave
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
    /// Per-step timeout covering all attempts, in milliseconds
    #[serde(default = "default_step_timeout_ms")]
    pub step_timeout_ms: u64,
}

fn default_max_parallel() -> usize {
    4
}

fn default_step_timeout_ms() -> u64 {
    30_000
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            continue_on_error: false,
            max_retries: 0,
            backoff: BackoffPolicy::default(),
            max_parallel: default_max_parallel(),
            step_timeout_ms: default_step_timeout_ms(),
        }
    }
}

// ============================================================================
// Controller
// ============================================================================

/// Orchestrator for one plan run: `Idle → Running → {Completed, Aborted}`.
///
/// The registry is shared and read-only for the duration of the run; the
/// per-step attempt counters (a `DashMap` written by concurrently running
/// units) are the only shared mutable state besides the report accumulator,
/// which only the supervising task touches.
pub struct ExecutionController {
    registry: Arc<ToolRegistry>,
    notifier: Arc<NotifierHub>,
    options: ExecutionOptions,
    cancellation_token: CancellationToken,
    state: Arc<RwLock<RunState>>,
}

impl ExecutionController {
    pub fn new(
        registry: Arc<ToolRegistry>,
        notifier: Arc<NotifierHub>,
        options: ExecutionOptions,
    ) -> Self {
        Self {
            registry,
            notifier,
            options,
            cancellation_token: CancellationToken::new(),
            state: Arc::new(RwLock::new(RunState::Idle)),
        }
    }

    /// The run-scoped cancellation token; callers may clone and hold it.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Request cancellation: no new waves dispatch, in-flight units finish
    /// naturally or time out, not-yet-started steps are marked `cancelled`.
    pub fn cancel(&self) {
        self.cancellation_token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    /// Current run state.
    pub async fn state(&self) -> RunState {
        *self.state.read().await
    }

    /// Run a validated plan to completion.
    ///
    /// Returns `Err` only when the plan is structurally invalid at call time
    /// (empty, or dependencies that do not layer). Per-step failures are
    /// recorded in the report, never surfaced as `Err`.
    pub async fn execute(&self, plan: &Plan) -> CoreResult<ExecutionReport> {
        if plan.is_empty() {
            return Err(CoreError::validation("cannot execute an empty plan"));
        }
        let waves = compute_waves(plan)?;

        *self.state.write().await = RunState::Running;

        let run_id = uuid::Uuid::new_v4().to_string();
        let started = std::time::Instant::now();
        let started_at = chrono::Utc::now().to_rfc3339();
        debug!(run_id = %run_id, steps = plan.len(), waves = waves.len(), "starting plan run");

        let summary = PlanSummary::new(&run_id, plan);
        self.notifier.notify_before_run(&summary).await;

        let manager = TaskManager::new(
            self.options.max_parallel,
            Duration::from_millis(self.options.step_timeout_ms),
        );
        let attempts: Arc<DashMap<u32, u32>> = Arc::new(DashMap::new());

        // Report accumulator; written only by this supervising task.
        let mut outcomes: HashMap<u32, ExecutionResult> = HashMap::new();
        // Failed or skipped steps; dependents of these skip when
        // continue_on_error is off.
        let mut blocked: HashSet<u32> = HashSet::new();
        // First failure that put the run on the abort path.
        let mut abort: Option<(u32, String)> = None;
        let mut cancelled = false;

        for wave in &waves {
            if self.cancellation_token.is_cancelled() {
                cancelled = true;
                break;
            }

            let mut units = Vec::new();
            for &index in wave {
                let step = match plan.step(index) {
                    Some(step) => step,
                    None => {
                        // Unreachable for plans produced by the extractor;
                        // recorded instead of panicking.
                        let result =
                            ExecutionResult::failed(index, "step missing from plan", 0);
                        self.notifier.notify_step(&result).await;
                        outcomes.insert(index, result);
                        continue;
                    }
                };

                if !self.options.continue_on_error
                    && step.depends_on.iter().any(|dep| blocked.contains(dep))
                {
                    let result = ExecutionResult::skipped(index);
                    blocked.insert(index);
                    self.notifier.notify_step(&result).await;
                    outcomes.insert(index, result);
                    continue;
                }

                units.push(self.step_unit(step, Arc::clone(&attempts)));
            }

            if units.is_empty() {
                continue;
            }

            for (index, outcome) in manager.run_batch(units).await {
                let attempt_count = attempts
                    .get(&index)
                    .map(|entry| *entry.value())
                    .unwrap_or(0);

                let result = match outcome {
                    Ok(output) => ExecutionResult::ok(index, output, attempt_count),
                    Err(err) => {
                        warn!(step = index, error = %err, "step failed");
                        ExecutionResult::failed(index, err.to_string(), attempt_count)
                    }
                };

                self.notifier.notify_step(&result).await;
                if !result.success {
                    blocked.insert(index);
                    if !self.options.continue_on_error && abort.is_none() {
                        abort = Some((
                            index,
                            result.error.clone().unwrap_or_else(|| "failed".to_string()),
                        ));
                    }
                }
                outcomes.insert(index, result);
            }
        }

        // Steps never dispatched because the run was cancelled.
        for step in &plan.steps {
            if !outcomes.contains_key(&step.index) {
                let result = ExecutionResult::cancelled(step.index);
                self.notifier.notify_step(&result).await;
                outcomes.insert(step.index, result);
            }
        }

        let report = self.build_report(
            run_id,
            plan,
            &mut outcomes,
            cancelled,
            started_at,
            started.elapsed(),
        );

        let aborted = cancelled || abort.is_some();
        *self.state.write().await = if aborted {
            RunState::Aborted
        } else {
            RunState::Completed
        };

        match abort {
            Some((step_index, error)) => self.notifier.notify_error(step_index, &error).await,
            None => self.notifier.notify_completion(&report).await,
        }

        Ok(report)
    }

    /// Build the retry-wrapped unit of work for one step.
    fn step_unit(&self, step: &Step, attempts: Arc<DashMap<u32, u32>>) -> TaskUnit {
        let index = step.index;
        let operation = step.operation.clone();
        let parameters = step.parameters.clone();
        let registry = Arc::clone(&self.registry);
        let max_retries = self.options.max_retries;
        let backoff = self.options.backoff.clone();

        TaskUnit::new(index, async move {
            // Validation resolves operations up front; resolution can still
            // fail here when the controller is handed an unvalidated plan.
            let capability = registry.resolve(&operation)?;

            let mut attempt = 0u32;
            loop {
                attempt += 1;
                attempts.insert(index, attempt);

                match capability.invoke(&parameters).await {
                    Ok(output) => return Ok(output),
                    Err(err) if attempt <= max_retries => {
                        let delay = backoff.delay_for(attempt);
                        debug!(step = index, attempt, error = %err, "attempt failed, retrying");
                        if !delay.is_zero() {
                            tokio::time::sleep(delay).await;
                        }
                    }
                    Err(err) => return Err(err),
                }
            }
        })
    }

    fn build_report(
        &self,
        run_id: String,
        plan: &Plan,
        outcomes: &mut HashMap<u32, ExecutionResult>,
        cancelled: bool,
        started_at: String,
        elapsed: Duration,
    ) -> ExecutionReport {
        let results: Vec<ExecutionResult> = plan
            .steps
            .iter()
            .map(|step| {
                outcomes.remove(&step.index).unwrap_or_else(|| {
                    ExecutionResult::failed(step.index, "no outcome recorded", 0)
                })
            })
            .collect();

        let completed = results.iter().filter(|r| r.success).count();
        let failed = results.len() - completed;

        ExecutionReport {
            run_id,
            success: failed == 0 && !cancelled,
            completed,
            failed,
            cancelled,
            total_duration_ms: elapsed.as_millis() as u64,
            started_at,
            finished_at: chrono::Utc::now().to_rfc3339(),
            results,
        }
    }
}

impl std::fmt::Debug for ExecutionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionController")
            .field("options", &self.options)
            .field("cancelled", &self.cancellation_token.is_cancelled())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
