#![allow(clippy::unwrap_used, clippy::expect_used)]

use serde_json::json;
use taskhub_core::*;

// ---------------------------------------------------------------------------
// 1. Execution record survives a JSON roundtrip mid-lifecycle
// ---------------------------------------------------------------------------

#[test]
fn execution_serialization_roundtrip() {
    let params = json!({"msg": "hi"}).as_object().cloned().unwrap();
    let mut exec = TaskExecution::new("echo", params)
        .with_tenant(Some("acme".into()))
        .with_priority(Priority::High)
        .with_callback(Some("http://localhost/cb".into()));
    exec.start().unwrap();

    let json = serde_json::to_string(&exec).unwrap();
    assert!(json.contains("\"status\":\"running\""));
    assert!(json.contains("\"priority\":\"high\""));

    let mut restored: TaskExecution = serde_json::from_str(&json).unwrap();
    assert_eq!(restored.id, exec.id);
    assert_eq!(restored.tenant.as_deref(), Some("acme"));
    assert_eq!(restored.started_at, exec.started_at);

    // The restored record keeps enforcing the state machine.
    restored.complete(json!({"msg": "hi"})).unwrap();
    assert!(restored.start().is_err());
}

// ---------------------------------------------------------------------------
// 2. Records written before job tracking existed still load
// ---------------------------------------------------------------------------

#[test]
fn execution_without_job_fields_deserializes() {
    let exec = TaskExecution::new("report", Parameters::new());
    let mut value = serde_json::to_value(&exec).unwrap();
    let obj = value.as_object_mut().unwrap();
    obj.remove("job_id");
    obj.remove("attempts");

    let restored: TaskExecution = serde_json::from_value(value).unwrap();
    assert!(restored.job_id.is_none());
    assert_eq!(restored.attempts, 0);
}

// ---------------------------------------------------------------------------
// 3. Terminal states are exactly the three documented ones
// ---------------------------------------------------------------------------

#[test]
fn terminal_states() {
    assert!(!TaskStatus::Pending.is_terminal());
    assert!(!TaskStatus::Running.is_terminal());
    assert!(TaskStatus::Completed.is_terminal());
    assert!(TaskStatus::Failed.is_terminal());
    assert!(TaskStatus::Cancelled.is_terminal());

    assert!(!TaskStatus::Completed.can_transition_to(TaskStatus::Running));
    assert!(!TaskStatus::Pending.can_transition_to(TaskStatus::Completed));
    assert!(!TaskStatus::Pending.can_transition_to(TaskStatus::Failed));
}
