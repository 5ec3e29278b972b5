use crate::agent::{Agent, AgentContext, AgentDescriptor};
use async_trait::async_trait;
use taskhub_core::TaskhubResult;
use tracing::debug;

/// Returns the merged parameters it was invoked with.
///
/// Handy for smoke-testing a deployment end to end.
pub struct EchoAgent {
    descriptor: AgentDescriptor,
}

impl EchoAgent {
    pub fn new() -> Self {
        Self {
            descriptor: AgentDescriptor::new("echo", "Echo").with_capability("echo"),
        }
    }
}

impl Default for EchoAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for EchoAgent {
    fn descriptor(&self) -> &AgentDescriptor {
        &self.descriptor
    }

    async fn execute(&self, ctx: AgentContext) -> TaskhubResult<serde_json::Value> {
        debug!(execution_id = %ctx.execution_id, "Echoing parameters");
        Ok(serde_json::Value::Object(ctx.parameters))
    }
}
