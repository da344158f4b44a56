//! Parallel Task Manager
//!
//! Runs a batch of independent units of work concurrently with bounded
//! concurrency and a per-unit timeout. One unit's failure, timeout, or panic
//! never aborts its siblings; every outcome is captured independently and
//! keyed by the unit's id. Completion order is unspecified; consumers rely
//! only on the returned mapping being complete.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::warn;

use plan_forge_core::{CoreError, CoreResult};

/// Boxed future producing a unit's result.
pub type UnitFuture = Pin<Box<dyn Future<Output = CoreResult<Value>> + Send>>;

/// One schedulable unit of work, identified by the id its result is keyed by.
pub struct TaskUnit {
    pub id: u32,
    pub work: UnitFuture,
}

impl TaskUnit {
    pub fn new<F>(id: u32, work: F) -> Self
    where
        F: Future<Output = CoreResult<Value>> + Send + 'static,
    {
        Self {
            id,
            work: Box::pin(work),
        }
    }
}

/// Bounded-concurrency batch runner with a per-unit timeout.
///
/// Concurrency limit and timeout are first-class configuration, set once at
/// construction; additional units queue until a slot frees.
#[derive(Debug, Clone)]
pub struct TaskManager {
    max_parallel: usize,
    per_unit_timeout: Duration,
}

impl TaskManager {
    pub fn new(max_parallel: usize, per_unit_timeout: Duration) -> Self {
        Self {
            max_parallel: max_parallel.max(1),
            per_unit_timeout,
        }
    }

    pub fn max_parallel(&self) -> usize {
        self.max_parallel
    }

    pub fn per_unit_timeout(&self) -> Duration {
        self.per_unit_timeout
    }

    /// Run every unit, at most `max_parallel` concurrently.
    ///
    /// Each unit is wrapped with the per-unit timeout; on elapse its work is
    /// aborted and the unit resolves to `Err(CoreError::Timeout)`. A panic
    /// inside a unit resolves to `Err(CoreError::Internal)` without touching
    /// siblings. The returned vector holds exactly one entry per submitted
    /// unit, in completion order.
    pub async fn run_batch(&self, units: Vec<TaskUnit>) -> Vec<(u32, CoreResult<Value>)> {
        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let per_unit_timeout = self.per_unit_timeout;
        let expected = units.len();

        let mut join_set = JoinSet::new();
        for unit in units {
            let semaphore = Arc::clone(&semaphore);
            join_set.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return (unit.id, Err(CoreError::internal("worker pool closed")));
                    }
                };

                // Spawn the work so a timeout can abort it and a panic is
                // contained in the inner task.
                let mut handle = tokio::spawn(unit.work);
                let outcome = match timeout(per_unit_timeout, &mut handle).await {
                    Ok(Ok(result)) => result,
                    Ok(Err(join_err)) => {
                        warn!(unit = unit.id, error = %join_err, "task unit panicked");
                        Err(CoreError::internal(format!("unit panicked: {}", join_err)))
                    }
                    Err(_) => {
                        handle.abort();
                        Err(CoreError::Timeout)
                    }
                };

                (unit.id, outcome)
            });
        }

        let mut results = Vec::with_capacity(expected);
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(entry) => results.push(entry),
                // Supervisor tasks do not panic; guard anyway so the batch
                // still drains.
                Err(join_err) => warn!(error = %join_err, "batch supervisor task failed"),
            }
        }

        results
    }
}
