use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taskhub_core::{Parameters, Priority, TaskExecution, TaskStatus};
use uuid::Uuid;

/// A unit of work held by the [`TaskQueue`](crate::TaskQueue).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueJob {
    pub job_id: Uuid,
    pub task_type: String,
    pub execution_id: Uuid,
    pub payload: serde_json::Value,
    pub priority: Priority,
    /// Failed attempts so far.
    pub attempt_count: u32,
    pub max_attempts: u32,
}

impl QueueJob {
    /// 1-based number of the attempt currently being made.
    pub fn attempt(&self) -> u32 {
        self.attempt_count + 1
    }

    pub fn is_final_attempt(&self) -> bool {
        self.attempt() >= self.max_attempts
    }
}

/// Where a job is in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Ready to lease, or sitting out a retry backoff.
    Waiting,
    /// Leased by a worker.
    Active,
    Completed,
    Failed,
    NotFound,
}

/// Per-task-type job totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    pub waiting: usize,
    pub active: usize,
    pub completed: usize,
    pub failed: usize,
}

/// A task submission as accepted from callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub task_type: String,
    #[serde(default)]
    pub tenant: Option<String>,
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub callback_url: Option<String>,
}

impl SubmitRequest {
    pub fn new(task_type: impl Into<String>) -> Self {
        Self {
            task_type: task_type.into(),
            tenant: None,
            parameters: Parameters::new(),
            priority: None,
            callback_url: None,
        }
    }

    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_callback(mut self, url: impl Into<String>) -> Self {
        self.callback_url = Some(url.into());
        self
    }
}

/// Answer to a status poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusView {
    pub execution_id: Uuid,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<&TaskExecution> for StatusView {
    fn from(execution: &TaskExecution) -> Self {
        Self {
            execution_id: execution.id,
            status: execution.status,
            created_at: execution.created_at,
            started_at: execution.started_at,
            completed_at: execution.completed_at,
        }
    }
}

/// Answer to a result poll. `message` is set while the task is still in flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultView {
    pub execution_id: Uuid,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<&TaskExecution> for ResultView {
    fn from(execution: &TaskExecution) -> Self {
        if !execution.is_terminal() {
            return Self {
                execution_id: execution.id,
                status: execution.status,
                result: None,
                error: None,
                completed_at: None,
                message: Some(format!(
                    "Task is still {}; poll again later",
                    execution.status
                )),
            };
        }
        Self {
            execution_id: execution.id,
            status: execution.status,
            result: execution.result.clone(),
            error: execution.error.clone(),
            completed_at: execution.completed_at,
            message: None,
        }
    }
}
