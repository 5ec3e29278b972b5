use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use taskhub_core::{Parameters, Priority, TaskConfig, TaskhubResult};
use uuid::Uuid;

/// Identity and capabilities of an agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub id: String,
    pub name: String,
    /// Task types this agent can run.
    pub capabilities: BTreeSet<String>,
}

impl AgentDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            capabilities: BTreeSet::new(),
        }
    }

    pub fn with_capability(mut self, task_type: impl Into<String>) -> Self {
        self.capabilities.insert(task_type.into());
        self
    }

    pub fn can_handle(&self, task_type: &str) -> bool {
        self.capabilities.contains(task_type)
    }
}

/// Input handed to [`Agent::execute`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentContext {
    pub execution_id: Uuid,
    pub task_type: String,
    pub tenant: Option<String>,
    /// Tenant defaults merged under the caller's values.
    pub parameters: Parameters,
    pub priority: Priority,
    pub task_config: TaskConfig,
}

/// Trait that all task handlers implement.
///
/// An `Err` is an agent-reported failure: it is recorded on the execution
/// and may be retried by the queue.
#[async_trait]
pub trait Agent: Send + Sync {
    fn descriptor(&self) -> &AgentDescriptor;

    async fn execute(&self, ctx: AgentContext) -> TaskhubResult<serde_json::Value>;
}
