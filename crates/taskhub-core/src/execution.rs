use crate::error::{TaskhubError, TaskhubResult};
use crate::types::{Parameters, Priority, TaskConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle state of a [`TaskExecution`].
///
/// `pending` and `running` are non-terminal; the rest are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// Lowercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// The allowed lifecycle edges.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Pending, TaskStatus::Running)
                | (TaskStatus::Running, TaskStatus::Completed)
                | (TaskStatus::Running, TaskStatus::Failed)
                | (TaskStatus::Pending, TaskStatus::Cancelled)
                | (TaskStatus::Running, TaskStatus::Cancelled)
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = TaskhubError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "running" => Ok(TaskStatus::Running),
            "completed" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            "cancelled" => Ok(TaskStatus::Cancelled),
            other => Err(TaskhubError::Config(format!("Unknown task status '{other}'"))),
        }
    }
}

/// One submitted-and-tracked instance of a task.
///
/// Status, result, error and timestamps are only changed through the
/// transition methods, which reject any edge not in
/// [`TaskStatus::can_transition_to`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskExecution {
    pub id: Uuid,
    pub task_type: String,
    pub tenant: Option<String>,
    pub parameters: Parameters,
    pub priority: Priority,
    pub task_config: TaskConfig,
    pub status: TaskStatus,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub callback_url: Option<String>,
    /// Queue job backing this execution, set once enqueued.
    #[serde(default)]
    pub job_id: Option<Uuid>,
    /// Number of agent invocations so far.
    #[serde(default)]
    pub attempts: u32,
}

impl TaskExecution {
    /// Create a pending execution with a fresh id and default config.
    pub fn new(task_type: impl Into<String>, parameters: Parameters) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_type: task_type.into(),
            tenant: None,
            parameters,
            priority: Priority::Medium,
            task_config: TaskConfig::default(),
            status: TaskStatus::Pending,
            result: None,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            callback_url: None,
            job_id: None,
            attempts: 0,
        }
    }

    pub fn with_tenant(mut self, tenant: Option<String>) -> Self {
        self.tenant = tenant;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_config(mut self, task_config: TaskConfig) -> Self {
        self.task_config = task_config;
        self
    }

    pub fn with_callback(mut self, callback_url: Option<String>) -> Self {
        self.callback_url = callback_url;
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    fn transition(&mut self, next: TaskStatus) -> TaskhubResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(TaskhubError::InvalidTransition {
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        if next.is_terminal() {
            self.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    /// pending → running. Sets `started_at`.
    pub fn start(&mut self) -> TaskhubResult<()> {
        self.transition(TaskStatus::Running)?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    /// running → completed with the agent's result.
    pub fn complete(&mut self, result: serde_json::Value) -> TaskhubResult<()> {
        self.transition(TaskStatus::Completed)?;
        self.result = Some(result);
        Ok(())
    }

    /// running → failed with an error message.
    pub fn fail(&mut self, error: impl Into<String>) -> TaskhubResult<()> {
        self.transition(TaskStatus::Failed)?;
        self.error = Some(error.into());
        Ok(())
    }

    /// pending|running → cancelled.
    pub fn cancel(&mut self) -> TaskhubResult<()> {
        self.transition(TaskStatus::Cancelled)
    }

    /// pending → failed, for a submission whose job could not be enqueued.
    ///
    /// This is the only edge into `failed` that skips `running`.
    pub fn reject(&mut self, error: impl Into<String>) -> TaskhubResult<()> {
        if self.status != TaskStatus::Pending {
            return Err(TaskhubError::InvalidTransition {
                from: self.status.to_string(),
                to: TaskStatus::Failed.to_string(),
            });
        }
        self.status = TaskStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn execution() -> TaskExecution {
        TaskExecution::new("echo", Parameters::new())
    }

    #[test]
    fn test_new_execution_is_pending() {
        let exec = execution();
        assert_eq!(exec.status, TaskStatus::Pending);
        assert!(exec.started_at.is_none());
        assert!(exec.completed_at.is_none());
        assert!(exec.result.is_none() && exec.error.is_none());
    }

    #[test]
    fn test_happy_path_sets_timestamps() {
        let mut exec = execution();
        exec.start().unwrap();
        assert_eq!(exec.status, TaskStatus::Running);
        assert!(exec.started_at.is_some());
        assert!(exec.completed_at.is_none());

        exec.complete(json!({"ok": true})).unwrap();
        assert_eq!(exec.status, TaskStatus::Completed);
        assert!(exec.completed_at.unwrap() >= exec.started_at.unwrap());
        assert!(exec.error.is_none());
    }

    #[test]
    fn test_fail_records_error_only() {
        let mut exec = execution();
        exec.start().unwrap();
        exec.fail("boom").unwrap();
        assert_eq!(exec.status, TaskStatus::Failed);
        assert_eq!(exec.error.as_deref(), Some("boom"));
        assert!(exec.result.is_none());
    }

    #[test]
    fn test_invalid_transitions_fail_loudly() {
        let mut exec = execution();
        assert!(exec.complete(json!(1)).unwrap_err().is_invalid_transition());
        assert!(exec.fail("x").unwrap_err().is_invalid_transition());

        exec.start().unwrap();
        assert!(exec.start().unwrap_err().is_invalid_transition());

        exec.complete(json!(1)).unwrap();
        let first_completed = exec.completed_at;
        assert!(exec.cancel().unwrap_err().is_invalid_transition());
        assert!(exec.fail("late").unwrap_err().is_invalid_transition());
        assert_eq!(exec.completed_at, first_completed);
        assert!(exec.error.is_none());
    }

    #[test]
    fn test_cancel_from_pending_and_running() {
        let mut pending = execution();
        pending.cancel().unwrap();
        assert_eq!(pending.status, TaskStatus::Cancelled);
        assert!(pending.completed_at.is_some());
        assert!(pending.cancel().is_err());

        let mut running = execution();
        running.start().unwrap();
        running.cancel().unwrap();
        assert_eq!(running.status, TaskStatus::Cancelled);
    }

    #[test]
    fn test_reject_only_from_pending() {
        let mut exec = execution();
        exec.reject("queue closed").unwrap();
        assert_eq!(exec.status, TaskStatus::Failed);
        assert!(exec.completed_at.is_some());

        let mut running = execution();
        running.start().unwrap();
        assert!(running.reject("nope").is_err());
    }

    #[test]
    fn test_status_parse_roundtrip_names() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::Running,
            TaskStatus::Completed,
            TaskStatus::Failed,
            TaskStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<TaskStatus>().unwrap(), status);
        }
        assert!("queued".parse::<TaskStatus>().is_err());
    }
}
