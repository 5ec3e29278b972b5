use thiserror::Error;
use uuid::Uuid;

/// A convenience `Result` alias using [`TaskhubError`].
pub type TaskhubResult<T> = Result<T, TaskhubError>;

/// Top-level error type for taskhub.
///
/// The first four variants are part of the public contract exposed to the
/// transport layer; the rest describe infrastructure failures.
#[derive(Error, Debug)]
pub enum TaskhubError {
    /// No registered agent declares the requested task type.
    #[error("No agent can handle task type '{0}'")]
    TaskNotRoutable(String),

    /// The execution id is unknown.
    #[error("Task execution not found: {0}")]
    TaskNotFound(Uuid),

    /// Enqueue or infrastructure failure while submitting or processing a task.
    #[error("Task execution error: {0}")]
    TaskExecution(String),

    /// An agent with the same id is already registered.
    #[error("Agent already registered: {0}")]
    DuplicateAgent(String),

    /// A lifecycle transition outside the allowed set was attempted.
    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: String,
        /// Rejected target status.
        to: String,
    },

    /// The tenant has no configuration entry.
    #[error("Tenant not found: {0}")]
    TenantNotFound(String),

    /// A failure reported by an agent while executing a task.
    #[error("Agent error: {0}")]
    Agent(String),

    /// A failure in the execution store.
    #[error("Store error: {0}")]
    Store(String),

    /// A failure in the task queue.
    #[error("Queue error: {0}")]
    Queue(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// An error from an outbound HTTP request.
    #[error("HTTP error: {0}")]
    Http(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TaskhubError {
    /// Whether this error is a rejected lifecycle transition.
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, TaskhubError::InvalidTransition { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = TaskhubError::TaskNotRoutable("pdf_render".into());
        assert_eq!(err.to_string(), "No agent can handle task type 'pdf_render'");

        let err = TaskhubError::InvalidTransition {
            from: "completed".into(),
            to: "running".into(),
        };
        assert_eq!(err.to_string(), "Invalid status transition: completed -> running");
        assert!(err.is_invalid_transition());
    }

    #[test]
    fn test_json_error_conversion() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: TaskhubError = parse.unwrap_err().into();
        assert!(matches!(err, TaskhubError::Json(_)));
        assert!(!err.is_invalid_transition());
    }
}
