//! Plan Forge Core
//!
//! Foundational types for the Plan Forge workspace: the error taxonomy, the
//! plan/report data model, and the capability trait + tool registry. This
//! crate has zero dependencies on the orchestration layer.
//!
//! ## Module Organization
//!
//! - `error` - Error taxonomy (`CoreError`, `ExtractionFailure`, `PlanViolation`)
//! - `plan` - Plan wire types and execution result/report types
//! - `capability` - Capability trait and `ToolRegistry`
//!
//! ## Design Principles
//!
//! 1. **Values over exceptions** - extraction and validation outcomes are
//!    classified result values callers branch on, not caught errors
//! 2. **Typed failures at the capability seam** - handlers fail with
//!    `CoreError`, never an unstructured panic
//! 3. **Unidirectional dependency** - this crate depends on nothing else in
//!    the workspace

pub mod capability;
pub mod error;
pub mod plan;

// ── Error Taxonomy ─────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult, ExtractionFailure, PlanViolation};

// ── Plan Data Model ────────────────────────────────────────────────────
pub use plan::{
    ExecutionReport, ExecutionResult, ExtractionMetadata, ExtractionResult, Plan, PlanSummary,
    RunState, Step, CANCELLED, SKIPPED_DEPENDENCY_FAILED,
};

// ── Capability Registry ────────────────────────────────────────────────
pub use capability::{Capability, FunctionCapability, ToolRegistry};
