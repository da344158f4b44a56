//! Full-pipeline tests: raw model text in, execution report out.

use std::sync::Arc;

use serde_json::json;

use plan_forge::{
    extract_plan, validate_plan, EventStreamChannel, ExecutionController, ExecutionOptions,
    NotifierHub, PlanViolation, RunEvent, ToolRegistry,
};

fn calc_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register_fn("calc.open", |_| Ok(json!({"opened": true})));
    registry.register_fn("calc.add", |params| {
        let value = params.get("value").and_then(|v| v.as_i64()).unwrap_or(0);
        Ok(json!(value))
    });
    registry
}

const CALC_RESPONSE: &str = r#"Sure, here is the plan:

```json
{
  "plan": [
    {
      "step": 1,
      "description": "Open the calculator",
      "operation": "calc.open",
      "parameters": {}
    },
    {
      "step": 2,
      "description": "Add two",
      "operation": "calc.add",
      "parameters": {"value": 2},
      "dependsOn": [1]
    }
  ]
}
```

Let me know if you need anything else."#;

#[tokio::test]
async fn test_extract_validate_execute_round_trip() {
    let extraction = extract_plan(CALC_RESPONSE);
    assert!(extraction.success, "{:?}", extraction.metadata.error_message);
    let plan = extraction.plan.unwrap();
    assert_eq!(plan.len(), 2);

    let registry = calc_registry();
    validate_plan(&plan, &registry).expect("plan should validate");

    let controller = ExecutionController::new(
        Arc::new(registry),
        Arc::new(NotifierHub::new()),
        ExecutionOptions::default(),
    );
    let report = controller.execute(&plan).await.unwrap();

    assert!(report.success);
    assert_eq!(report.completed, 2);
    assert_eq!(report.failed, 0);
    // Results come back in original step order regardless of scheduling
    assert_eq!(report.step_indices(), vec![1, 2]);
    assert_eq!(report.result(2).unwrap().output, Some(json!(2)));
    assert_eq!(report.result(1).unwrap().attempts, 1);
}

#[tokio::test]
async fn test_prose_response_is_classified_not_executed() {
    let extraction = extract_plan("I cannot produce a plan for that request.");
    assert!(!extraction.success);
    assert_eq!(
        extraction.metadata.error_message.as_deref(),
        Some("not-parseable")
    );
    assert!(extraction.plan.is_none());
}

#[tokio::test]
async fn test_validation_blocks_unknown_operation_before_execution() {
    let extraction = extract_plan(
        r#"{"plan": [{"step": 1, "description": "poke", "operation": "ghost.op", "parameters": {}}]}"#,
    );
    let plan = extraction.plan.unwrap();

    let violations = validate_plan(&plan, &calc_registry()).unwrap_err();
    assert!(violations.iter().any(|v| matches!(
        v,
        PlanViolation::UnresolvableOperation { step: 1, .. }
    )));
}

#[tokio::test]
async fn test_event_stream_observes_full_lifecycle() {
    let extraction = extract_plan(CALC_RESPONSE);
    let plan = extraction.plan.unwrap();
    let registry = calc_registry();

    let (channel, mut receiver) = EventStreamChannel::new();
    let mut hub = NotifierHub::new();
    hub.register(Arc::new(channel));

    let controller = ExecutionController::new(
        Arc::new(registry),
        Arc::new(hub),
        ExecutionOptions::default(),
    );
    let report = controller.execute(&plan).await.unwrap();
    assert!(report.success);

    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }

    // runStarted, one stepResolved per step, runCompleted
    assert_eq!(events.len(), 4);
    assert!(matches!(events.first(), Some(RunEvent::RunStarted { .. })));
    assert!(matches!(events.last(), Some(RunEvent::RunCompleted { .. })));
    let resolved = events
        .iter()
        .filter(|e| matches!(e, RunEvent::StepResolved { .. }))
        .count();
    assert_eq!(resolved, 2);

    match events.first().unwrap() {
        RunEvent::RunStarted { summary, .. } => {
            assert_eq!(summary.step_count, 2);
            assert_eq!(summary.operations, vec!["calc.open", "calc.add"]);
        }
        other => panic!("unexpected first event: {:?}", other),
    }
}

#[tokio::test]
async fn test_abort_emits_run_failed_event_once() {
    let mut registry = ToolRegistry::new();
    registry.register_fn("calc.open", |_| {
        Err(plan_forge::CoreError::execution("display detached"))
    });

    let extraction = extract_plan(
        r#"{"plan": [{"step": 1, "description": "open", "operation": "calc.open", "parameters": {}}]}"#,
    );
    let plan = extraction.plan.unwrap();

    let (channel, mut receiver) = EventStreamChannel::new();
    let mut hub = NotifierHub::new();
    hub.register(Arc::new(channel));

    let controller = ExecutionController::new(
        Arc::new(registry),
        Arc::new(hub),
        ExecutionOptions::default(),
    );
    let report = controller.execute(&plan).await.unwrap();
    assert!(!report.success);

    let mut failed_events = 0;
    let mut completed_events = 0;
    while let Ok(event) = receiver.try_recv() {
        match event {
            RunEvent::RunFailed { step_index, ref error, .. } => {
                assert_eq!(step_index, 1);
                assert!(error.contains("display detached"));
                failed_events += 1;
            }
            RunEvent::RunCompleted { .. } => completed_events += 1,
            _ => {}
        }
    }
    // Exactly one terminal event, and it is the failure hook
    assert_eq!(failed_events, 1);
    assert_eq!(completed_events, 0);
}
