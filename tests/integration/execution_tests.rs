//! Controller semantics under failure: retries, skips, timeouts,
//! cancellation, and wave-ordered scheduling.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;

use plan_forge::{
    BackoffPolicy, Capability, CoreError, CoreResult, ExecutionController, ExecutionOptions,
    NotifierHub, Plan, RunState, Step, ToolRegistry,
};

fn step(index: u32, operation: &str, deps: Vec<u32>) -> Step {
    Step {
        index,
        description: format!("step {}", index),
        operation: operation.to_string(),
        parameters: json!({}),
        depends_on: deps,
    }
}

fn controller(registry: ToolRegistry, options: ExecutionOptions) -> ExecutionController {
    ExecutionController::new(Arc::new(registry), Arc::new(NotifierHub::new()), options)
}

#[tokio::test]
async fn test_waves_respect_dependencies() {
    // Record the order operations start in; step 3 depends on both roots.
    let order = Arc::new(Mutex::new(Vec::new()));

    let mut registry = ToolRegistry::new();
    for name in ["root.a", "root.b", "leaf.c"] {
        let order = Arc::clone(&order);
        registry.register_fn(name, move |_| {
            order.lock().unwrap().push(name);
            Ok(json!(null))
        });
    }

    let plan = Plan::new(vec![
        step(1, "root.a", vec![]),
        step(2, "root.b", vec![]),
        step(3, "leaf.c", vec![1, 2]),
    ]);

    let ctrl = controller(registry, ExecutionOptions::default());
    let report = ctrl.execute(&plan).await.unwrap();
    assert!(report.success);

    let started = order.lock().unwrap().clone();
    assert_eq!(started.len(), 3);
    // The leaf never starts before both roots have run
    assert_eq!(started[2], "leaf.c");
}

#[tokio::test]
async fn test_retry_then_success_reports_two_attempts() {
    let calls = Arc::new(AtomicU32::new(0));
    let calls_in = Arc::clone(&calls);

    let mut registry = ToolRegistry::new();
    registry.register_fn("flaky.op", move |_| {
        if calls_in.fetch_add(1, Ordering::SeqCst) == 0 {
            Err(CoreError::execution("transient glitch"))
        } else {
            Ok(json!("recovered"))
        }
    });

    let options = ExecutionOptions {
        max_retries: 2,
        backoff: BackoffPolicy::Fixed { delay_ms: 0 },
        ..ExecutionOptions::default()
    };
    let ctrl = controller(registry, options);
    let plan = Plan::new(vec![step(1, "flaky.op", vec![])]);

    let report = ctrl.execute(&plan).await.unwrap();
    let result = report.result(1).unwrap();
    assert!(result.success);
    assert_eq!(result.attempts, 2);
    assert_eq!(result.output, Some(json!("recovered")));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_failure_skips_dependents_but_not_independents() {
    let mut registry = ToolRegistry::new();
    registry.register_fn("fails", |_| Err(CoreError::execution("boom")));
    registry.register_fn("works", |_| Ok(json!("ok")));

    let plan = Plan::new(vec![
        step(1, "fails", vec![]),
        step(2, "works", vec![1]),
        step(3, "works", vec![2]),
        step(4, "works", vec![]),
    ]);

    let ctrl = controller(registry, ExecutionOptions::default());
    let report = ctrl.execute(&plan).await.unwrap();

    assert!(!report.success);
    assert_eq!(report.completed, 1);
    assert_eq!(report.failed, 3);
    assert!(report.result(2).unwrap().is_skipped());
    assert!(report.result(3).unwrap().is_skipped());
    assert!(report.result(4).unwrap().success);
    assert_eq!(ctrl.state().await, RunState::Aborted);
}

struct HangingCapability;

#[async_trait::async_trait]
impl Capability for HangingCapability {
    async fn invoke(&self, _parameters: &serde_json::Value) -> CoreResult<serde_json::Value> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(json!("never"))
    }
}

#[tokio::test(start_paused = true)]
async fn test_timeout_does_not_stall_siblings() {
    let mut registry = ToolRegistry::new();
    registry.register("hangs", Arc::new(HangingCapability));
    registry.register_fn("works", |_| Ok(json!("ok")));

    let options = ExecutionOptions {
        step_timeout_ms: 200,
        ..ExecutionOptions::default()
    };
    let ctrl = controller(registry, options);
    let plan = Plan::new(vec![step(1, "hangs", vec![]), step(2, "works", vec![])]);

    let started = tokio::time::Instant::now();
    let report = ctrl.execute(&plan).await.unwrap();

    let hung = report.result(1).unwrap();
    assert!(!hung.success);
    assert_eq!(hung.error.as_deref(), Some("timeout"));
    assert!(report.result(2).unwrap().success);

    // The run resolved near the timeout boundary, not the hang duration
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < Duration::from_millis(300), "{:?}", elapsed);
}

#[tokio::test]
async fn test_cancellation_mid_run_marks_later_waves_cancelled() {
    // The first step cancels the run itself; the token slot is filled after
    // the controller exists.
    let slot: Arc<Mutex<Option<tokio_util::sync::CancellationToken>>> =
        Arc::new(Mutex::new(None));
    let slot_in = Arc::clone(&slot);

    let mut registry = ToolRegistry::new();
    registry.register_fn("works", |_| Ok(json!("ok")));
    registry.register_fn("cancel.now", move |_| {
        if let Some(token) = slot_in.lock().unwrap().as_ref() {
            token.cancel();
        }
        Ok(json!(null))
    });

    let plan = Plan::new(vec![
        step(1, "cancel.now", vec![]),
        step(2, "works", vec![1]),
        step(3, "works", vec![2]),
    ]);

    let ctrl = controller(registry, ExecutionOptions::default());
    *slot.lock().unwrap() = Some(ctrl.cancellation_token());

    let report = ctrl.execute(&plan).await.unwrap();

    assert!(report.cancelled);
    assert!(!report.success);
    // Wave one finished normally; later waves never dispatched
    assert!(report.result(1).unwrap().success);
    assert!(report.result(2).unwrap().is_cancelled());
    assert!(report.result(3).unwrap().is_cancelled());
    assert_eq!(ctrl.state().await, RunState::Aborted);
}

#[tokio::test]
async fn test_continue_on_error_collects_every_outcome() {
    let mut registry = ToolRegistry::new();
    registry.register_fn("fails", |_| Err(CoreError::execution("boom")));
    registry.register_fn("works", |_| Ok(json!("ok")));

    let plan = Plan::new(vec![
        step(1, "fails", vec![]),
        step(2, "works", vec![1]),
        step(3, "fails", vec![]),
        step(4, "works", vec![3]),
    ]);

    let options = ExecutionOptions {
        continue_on_error: true,
        ..ExecutionOptions::default()
    };
    let ctrl = controller(registry, options);
    let report = ctrl.execute(&plan).await.unwrap();

    // Nothing is skipped: dependents of failed steps still ran
    assert_eq!(report.completed, 2);
    assert_eq!(report.failed, 2);
    assert!(report.result(2).unwrap().success);
    assert!(report.result(4).unwrap().success);
    assert!(!report.results.iter().any(|r| r.is_skipped()));
    assert_eq!(ctrl.state().await, RunState::Completed);
}

#[tokio::test]
async fn test_bounded_concurrency_across_a_wide_wave() {
    let in_flight = Arc::new(AtomicU32::new(0));
    let peak = Arc::new(AtomicU32::new(0));

    let mut registry = ToolRegistry::new();
    {
        let in_flight = Arc::clone(&in_flight);
        let peak = Arc::clone(&peak);
        registry.register("slow.op", Arc::new(GaugedCapability { in_flight, peak }));
    }

    let steps: Vec<Step> = (1..=8).map(|i| step(i, "slow.op", vec![])).collect();
    let plan = Plan::new(steps);

    let options = ExecutionOptions {
        max_parallel: 2,
        ..ExecutionOptions::default()
    };
    let ctrl = controller(registry, options);
    let report = ctrl.execute(&plan).await.unwrap();

    assert!(report.success);
    assert_eq!(report.completed, 8);
    assert!(peak.load(Ordering::SeqCst) <= 2, "concurrency exceeded limit");
}

struct GaugedCapability {
    in_flight: Arc<AtomicU32>,
    peak: Arc<AtomicU32>,
}

#[async_trait::async_trait]
impl Capability for GaugedCapability {
    async fn invoke(&self, _parameters: &serde_json::Value) -> CoreResult<serde_json::Value> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(json!(null))
    }
}
