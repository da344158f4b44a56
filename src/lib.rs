//! Plan Forge
//!
//! Orchestration core for AI-generated multi-step plans: extracts a
//! structured plan from raw model text, validates it against a registry of
//! executable capabilities, then runs it in dependency-ordered waves with
//! bounded concurrency, retries, timeouts, and cooperative cancellation.
//! Run lifecycle events fan out to pluggable notifier channels.
//!
//! The pipeline, end to end:
//!
//! 1. [`extract::extract_plan`] - raw model text to [`Plan`] (or a classified
//!    failure reason)
//! 2. [`validate::validate_plan`] - structural checks against the
//!    [`ToolRegistry`]
//! 3. [`executor::ExecutionController::execute`] - wave-based parallel run
//!    producing an [`ExecutionReport`]
//!
//! Shared data model and error taxonomy live in the `plan-forge-core` crate
//! and are re-exported here.

pub mod executor;
pub mod extract;
pub mod notify;
pub mod parallel;
pub mod validate;

// ============================================================================
// Re-exports
// ============================================================================

pub use plan_forge_core::{
    Capability, CoreError, CoreResult, ExecutionReport, ExecutionResult, ExtractionFailure,
    ExtractionMetadata, ExtractionResult, FunctionCapability, Plan, PlanSummary, PlanViolation,
    RunState, Step, ToolRegistry,
};

pub use executor::{BackoffPolicy, ExecutionController, ExecutionOptions};
pub use extract::extract_plan;
pub use notify::{EventStreamChannel, LogChannel, NotifierChannel, NotifierHub, RunEvent};
pub use parallel::{TaskManager, TaskUnit};
pub use validate::validate_plan;
