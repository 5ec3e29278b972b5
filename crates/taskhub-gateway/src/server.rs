use crate::tasks::{cancel_task, get_result, get_status, list_tasks, submit_task};
use axum::{extract::State, response::IntoResponse, routing::get, routing::post, Json, Router};
use std::sync::Arc;
use taskhub_orchestrator::TaskExecutor;

/// Shared application state.
pub struct AppState {
    pub executor: Arc<TaskExecutor>,
}

/// The HTTP front of a [`TaskExecutor`].
pub struct GatewayServer;

impl GatewayServer {
    /// Build the router. Worker pools are the caller's concern.
    pub fn build(executor: Arc<TaskExecutor>) -> Router {
        let state = Arc::new(AppState { executor });

        Router::new()
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route("/agents", get(agents_handler))
            .route("/tasks", post(submit_task).get(list_tasks))
            .route("/tasks/{id}", get(get_status))
            .route("/tasks/{id}/result", get(get_result))
            .route("/tasks/{id}/cancel", post(cancel_task))
            .with_state(state)
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok", "service": "taskhub"}))
}

async fn agents_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.executor.router().registry().list_descriptors())
}

/// Execution counters plus live queue depth for every task type seen so far.
async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let monitor = state.executor.monitor();
    let mut body = monitor.to_json().await;

    let mut queues = serde_json::Map::new();
    for task_type in monitor.snapshot().await.keys() {
        let counts = state.executor.queue().counts(task_type);
        queues.insert(task_type.clone(), serde_json::json!(counts));
    }
    body["queues"] = serde_json::Value::Object(queues);

    Json(body)
}
