//! Wave Partitioning
//!
//! Partitions a plan's steps into ordered "waves" using Kahn's algorithm:
//! wave 0 holds every step with no dependencies, wave N holds the steps whose
//! dependencies are all satisfied by waves < N. Steps within one wave are
//! mutually independent and eligible for concurrent execution; waves execute
//! strictly in order.

use std::collections::{HashMap, HashSet};

use plan_forge_core::{CoreError, CoreResult, Plan};

/// Compute the ordered dependency layers of a plan.
///
/// Validated plans always layer cleanly (dependencies reference earlier
/// steps only); an unknown dependency or a cycle means the plan was never
/// validated and is reported as a `Validation` error.
pub fn compute_waves(plan: &Plan) -> CoreResult<Vec<Vec<u32>>> {
    let known: HashSet<u32> = plan.indices().into_iter().collect();

    let mut in_degree: HashMap<u32, usize> = HashMap::new();
    let mut dependents: HashMap<u32, Vec<u32>> = HashMap::new();

    for step in &plan.steps {
        in_degree.entry(step.index).or_insert(0);
        for &dep in &step.depends_on {
            if !known.contains(&dep) {
                return Err(CoreError::validation(format!(
                    "step {} depends on unknown step {}",
                    step.index, dep
                )));
            }
            *in_degree.entry(step.index).or_insert(0) += 1;
            dependents.entry(dep).or_default().push(step.index);
        }
    }

    let mut remaining: HashSet<u32> = known.clone();
    let mut waves: Vec<Vec<u32>> = Vec::new();

    // Kahn's algorithm, layer by layer
    loop {
        let mut ready: Vec<u32> = remaining
            .iter()
            .filter(|index| in_degree.get(index).copied().unwrap_or(0) == 0)
            .copied()
            .collect();

        if ready.is_empty() {
            break;
        }
        ready.sort_unstable();

        for index in &ready {
            remaining.remove(index);
            if let Some(deps) = dependents.get(index) {
                for dep in deps {
                    if let Some(degree) = in_degree.get_mut(dep) {
                        *degree = degree.saturating_sub(1);
                    }
                }
            }
        }

        waves.push(ready);
    }

    if !remaining.is_empty() {
        let mut stuck: Vec<u32> = remaining.into_iter().collect();
        stuck.sort_unstable();
        return Err(CoreError::validation(format!(
            "dependency cycle among steps: {}",
            stuck
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        )));
    }

    Ok(waves)
}
