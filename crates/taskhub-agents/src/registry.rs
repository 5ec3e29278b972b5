use crate::agent::{Agent, AgentDescriptor};
use parking_lot::RwLock;
use std::sync::Arc;
use taskhub_core::{TaskhubError, TaskhubResult};
use tracing::info;

/// Central registry for all available agents.
///
/// Agents are kept in registration order. When several agents declare the
/// same task type, [`find_for_task_type`](Self::find_for_task_type) returns
/// the one registered first.
pub struct AgentRegistry {
    agents: RwLock<Vec<Arc<dyn Agent>>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self {
            agents: RwLock::new(Vec::new()),
        }
    }

    /// Add an agent. Fails if an agent with the same id is already present.
    pub fn register(&self, agent: Arc<dyn Agent>) -> TaskhubResult<()> {
        let descriptor = agent.descriptor();
        let mut agents = self.agents.write();
        if agents.iter().any(|a| a.descriptor().id == descriptor.id) {
            return Err(TaskhubError::DuplicateAgent(descriptor.id.clone()));
        }
        info!(
            agent = %descriptor.id,
            capabilities = ?descriptor.capabilities,
            "Registered agent"
        );
        agents.push(agent);
        Ok(())
    }

    /// Remove an agent by id. Returns whether it was present.
    pub fn unregister(&self, agent_id: &str) -> bool {
        let mut agents = self.agents.write();
        let before = agents.len();
        agents.retain(|a| a.descriptor().id != agent_id);
        let removed = agents.len() != before;
        if removed {
            info!(agent = %agent_id, "Unregistered agent");
        }
        removed
    }

    /// First registered agent whose capabilities include `task_type`.
    pub fn find_for_task_type(&self, task_type: &str) -> Option<Arc<dyn Agent>> {
        self.agents
            .read()
            .iter()
            .find(|a| a.descriptor().can_handle(task_type))
            .cloned()
    }

    pub fn get(&self, agent_id: &str) -> Option<Arc<dyn Agent>> {
        self.agents
            .read()
            .iter()
            .find(|a| a.descriptor().id == agent_id)
            .cloned()
    }

    pub fn list_descriptors(&self) -> Vec<AgentDescriptor> {
        self.agents
            .read()
            .iter()
            .map(|a| a.descriptor().clone())
            .collect()
    }

    pub fn agent_count(&self) -> usize {
        self.agents.read().len()
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::agent::AgentContext;
    use async_trait::async_trait;

    struct StubAgent {
        descriptor: AgentDescriptor,
    }

    impl StubAgent {
        fn new(id: &str, caps: &[&str]) -> Arc<dyn Agent> {
            let mut descriptor = AgentDescriptor::new(id, id);
            for cap in caps {
                descriptor = descriptor.with_capability(*cap);
            }
            Arc::new(Self { descriptor })
        }
    }

    #[async_trait]
    impl Agent for StubAgent {
        fn descriptor(&self) -> &AgentDescriptor {
            &self.descriptor
        }

        async fn execute(&self, _ctx: AgentContext) -> TaskhubResult<serde_json::Value> {
            Ok(serde_json::Value::Null)
        }
    }

    #[test]
    fn test_register_and_find() {
        let registry = AgentRegistry::new();
        registry
            .register(StubAgent::new("writer", &["blog_post", "caption"]))
            .unwrap();

        let agent = registry.find_for_task_type("caption").unwrap();
        assert_eq!(agent.descriptor().id, "writer");
        assert!(registry.find_for_task_type("video").is_none());
        assert_eq!(registry.agent_count(), 1);
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let registry = AgentRegistry::new();
        registry.register(StubAgent::new("writer", &["a"])).unwrap();
        let err = registry
            .register(StubAgent::new("writer", &["b"]))
            .unwrap_err();
        assert!(matches!(err, TaskhubError::DuplicateAgent(id) if id == "writer"));
        assert_eq!(registry.agent_count(), 1);
    }

    #[test]
    fn test_first_registered_wins() {
        let registry = AgentRegistry::new();
        registry.register(StubAgent::new("first", &["seo"])).unwrap();
        registry.register(StubAgent::new("second", &["seo"])).unwrap();

        for _ in 0..10 {
            let agent = registry.find_for_task_type("seo").unwrap();
            assert_eq!(agent.descriptor().id, "first");
        }

        assert!(registry.unregister("first"));
        let agent = registry.find_for_task_type("seo").unwrap();
        assert_eq!(agent.descriptor().id, "second");
    }

    #[test]
    fn test_unregister_missing() {
        let registry = AgentRegistry::new();
        assert!(!registry.unregister("ghost"));
    }

    #[test]
    fn test_list_descriptors_keeps_order() {
        let registry = AgentRegistry::new();
        registry.register(StubAgent::new("b", &["x"])).unwrap();
        registry.register(StubAgent::new("a", &["y"])).unwrap();
        let ids: Vec<String> = registry
            .list_descriptors()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert!(registry.get("a").is_some());
    }
}
