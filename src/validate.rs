//! Plan Validation
//!
//! Checks a plan's internal invariants and its resolvability against the
//! tool registry before anything side-effecting runs. All violations are
//! collected in a single pass so the caller can report a complete
//! diagnostic, not just the first defect.

use std::collections::HashSet;

use plan_forge_core::{Plan, PlanViolation, ToolRegistry};

/// Validate a plan against the registry.
///
/// Checks, in one pass:
/// - the plan is non-empty
/// - step indices are unique and strictly increasing starting at 1
/// - every operation resolves in the registry
/// - every dependency references an earlier step that exists in the plan
///
/// Pure function; neither the plan nor the registry is mutated.
pub fn validate_plan(plan: &Plan, registry: &ToolRegistry) -> Result<(), Vec<PlanViolation>> {
    let mut violations = Vec::new();

    if plan.is_empty() {
        violations.push(PlanViolation::EmptyPlan);
        return Err(violations);
    }

    let mut seen: HashSet<u32> = HashSet::new();
    let mut previous: Option<u32> = None;
    let known: HashSet<u32> = plan.indices().into_iter().collect();

    for step in &plan.steps {
        if !seen.insert(step.index) {
            violations.push(PlanViolation::DuplicateIndex { index: step.index });
        } else if step.index == 0 || previous.is_some_and(|p| step.index <= p) {
            violations.push(PlanViolation::OutOfOrderIndex { index: step.index });
        }
        previous = Some(step.index);

        if !registry.contains(&step.operation) {
            violations.push(PlanViolation::UnresolvableOperation {
                step: step.index,
                operation: step.operation.clone(),
            });
        }

        for &dep in &step.depends_on {
            // Forward and self references are bad even when the index exists
            if dep >= step.index || !known.contains(&dep) {
                violations.push(PlanViolation::BadDependency {
                    step: step.index,
                    dependency: dep,
                });
            }
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}
