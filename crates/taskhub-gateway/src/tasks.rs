use crate::error::ApiError;
use crate::server::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use taskhub_core::{Priority, TaskExecution, TaskStatus};
use taskhub_orchestrator::{ResultView, StatusView, SubmitRequest};
use uuid::Uuid;

const ALL_STATUSES: [TaskStatus; 5] = [
    TaskStatus::Pending,
    TaskStatus::Running,
    TaskStatus::Completed,
    TaskStatus::Failed,
    TaskStatus::Cancelled,
];

/// Query string for `GET /tasks`.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Restrict to one status; omitted means every status.
    pub status: Option<String>,
}

/// One row of `GET /tasks`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    pub execution_id: Uuid,
    pub task_type: String,
    pub tenant: Option<String>,
    pub priority: Priority,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&TaskExecution> for TaskSummary {
    fn from(execution: &TaskExecution) -> Self {
        Self {
            execution_id: execution.id,
            task_type: execution.task_type.clone(),
            tenant: execution.tenant.clone(),
            priority: execution.priority,
            status: execution.status,
            created_at: execution.created_at,
            completed_at: execution.completed_at,
        }
    }
}

/// `POST /tasks`
pub async fn submit_task(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SubmitRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let execution_id = state.executor.submit(request).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "executionId": execution_id })),
    ))
}

/// `GET /tasks?status=`
pub async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<TaskSummary>>, ApiError> {
    let statuses = match query.status.as_deref() {
        Some(raw) => vec![raw
            .parse::<TaskStatus>()
            .map_err(|_| ApiError::BadRequest(format!("Unknown status '{raw}'")))?],
        None => ALL_STATUSES.to_vec(),
    };

    let mut executions = Vec::new();
    for status in statuses {
        executions.extend(state.executor.list(status).await?);
    }
    executions.sort_by_key(|e| e.created_at);
    Ok(Json(executions.iter().map(TaskSummary::from).collect()))
}

/// `GET /tasks/{id}`
pub async fn get_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<StatusView>, ApiError> {
    Ok(Json(state.executor.get_status(id).await?))
}

/// `GET /tasks/{id}/result`
pub async fn get_result(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResultView>, ApiError> {
    Ok(Json(state.executor.get_result(id).await?))
}

/// `POST /tasks/{id}/cancel`
pub async fn cancel_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let cancelled = state.executor.cancel(id).await?;
    Ok(Json(serde_json::json!({ "cancelled": cancelled })))
}
