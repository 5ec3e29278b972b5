#![allow(clippy::unwrap_used, clippy::expect_used)]

use serde_json::json;
use std::sync::Arc;
use taskhub_agents::*;
use taskhub_core::{Priority, TaskConfig};
use uuid::Uuid;

fn context(task_type: &str, params: serde_json::Value) -> AgentContext {
    AgentContext {
        execution_id: Uuid::new_v4(),
        task_type: task_type.to_string(),
        tenant: None,
        parameters: params.as_object().cloned().unwrap(),
        priority: Priority::Medium,
        task_config: TaskConfig::default(),
    }
}

#[tokio::test]
async fn echo_agent_routes_and_returns_parameters() {
    let registry = AgentRegistry::new();
    registry.register(Arc::new(EchoAgent::new())).unwrap();

    let agent = registry.find_for_task_type("echo").unwrap();
    let result = agent
        .execute(context("echo", json!({"msg": "hi"})))
        .await
        .unwrap();
    assert_eq!(result, json!({"msg": "hi"}));
}

#[tokio::test]
async fn registry_is_shareable_across_tasks() {
    let registry = Arc::new(AgentRegistry::new());
    registry.register(Arc::new(EchoAgent::new())).unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            let agent = registry.find_for_task_type("echo").unwrap();
            agent
                .execute(context("echo", json!({ "n": i })))
                .await
                .unwrap()
        }));
    }
    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.await.unwrap(), json!({ "n": i }));
    }
}
