//! Core Error Types
//!
//! Defines the error taxonomy shared across the Plan Forge workspace. The
//! taxonomy splits into three layers:
//!
//! - [`CoreError`] - execution-time failures (tool resolution, capability
//!   invocation, timeout, cancellation)
//! - [`ExtractionFailure`] - classified reasons why raw model text could not
//!   be turned into a plan; carried as a value inside `ExtractionResult`,
//!   never thrown
//! - [`PlanViolation`] - structural defects found by the validator; collected
//!   into a list so callers get a complete diagnostic in one pass

use thiserror::Error;

/// Execution-layer error type for the Plan Forge workspace.
///
/// Capability implementations must fail with one of these variants so the
/// execution controller can classify the outcome; unstructured panics are
/// not part of the contract.
#[derive(Error, Debug)]
pub enum CoreError {
    /// An operation name did not resolve in the tool registry
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// A capability invocation failed
    #[error("Execution error: {0}")]
    Execution(String),

    /// A unit of work exceeded its per-unit timeout
    #[error("timeout")]
    Timeout,

    /// The run-scoped cancellation signal was observed
    #[error("cancelled")]
    Cancelled,

    /// The plan was structurally invalid at execution time
    #[error("Validation error: {0}")]
    Validation(String),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a tool-not-found error
    pub fn tool_not_found(name: impl Into<String>) -> Self {
        Self::ToolNotFound(name.into())
    }

    /// Create an execution error
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error is the per-unit timeout variant
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }
}

/// Convert CoreError to a string
impl From<CoreError> for String {
    fn from(err: CoreError) -> String {
        err.to_string()
    }
}

/// Classified reason why extraction of a plan from raw model text failed.
///
/// Carried inside `ExtractionResult::metadata`, never raised. The `Display`
/// form is the stable reason code surfaced to callers and audit logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionFailure {
    /// The text is not a well-formed structured document
    NotParseable,
    /// The document parsed but has no `plan` array
    MissingPlan,
    /// A plan element is missing a required field, or is not a mapping.
    /// `position` is the zero-based element position in the `plan` array.
    InvalidStep { position: usize, field: &'static str },
}

impl std::fmt::Display for ExtractionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotParseable => write!(f, "not-parseable"),
            Self::MissingPlan => write!(f, "missing-plan"),
            Self::InvalidStep { position, field } => {
                write!(f, "invalid-step:{} (element {})", field, position)
            }
        }
    }
}

impl ExtractionFailure {
    /// The reason code without positional detail, e.g. `invalid-step:operation`.
    pub fn code(&self) -> String {
        match self {
            Self::NotParseable => "not-parseable".to_string(),
            Self::MissingPlan => "missing-plan".to_string(),
            Self::InvalidStep { field, .. } => format!("invalid-step:{}", field),
        }
    }
}

/// A single structural violation found by the plan validator.
///
/// The validator collects every violation in one pass instead of stopping at
/// the first, so a caller can report a complete diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanViolation {
    /// The plan has no steps
    EmptyPlan,
    /// A step index appears more than once
    DuplicateIndex { index: u32 },
    /// Step indices are not strictly increasing starting at 1
    OutOfOrderIndex { index: u32 },
    /// A step names an operation the registry cannot resolve
    UnresolvableOperation { step: u32, operation: String },
    /// A dependency references a missing step or a non-earlier step
    BadDependency { step: u32, dependency: u32 },
}

impl std::fmt::Display for PlanViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyPlan => write!(f, "empty-plan"),
            Self::DuplicateIndex { index } => write!(f, "duplicate-index: {}", index),
            Self::OutOfOrderIndex { index } => write!(f, "out-of-order-index: {}", index),
            Self::UnresolvableOperation { step, operation } => {
                write!(
                    f,
                    "unresolvable-operation: step {} references '{}'",
                    step, operation
                )
            }
            Self::BadDependency { step, dependency } => {
                write!(f, "bad-dependency: step {} depends on {}", step, dependency)
            }
        }
    }
}
