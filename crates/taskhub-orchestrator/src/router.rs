use std::sync::Arc;
use taskhub_agents::AgentRegistry;
use taskhub_core::{Parameters, TaskConfig, TaskhubError, TaskhubResult};
use taskhub_tenant::TenantConfigResolver;
use tracing::{debug, warn};

/// The outcome of routing a task type.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutePlan {
    pub agent_id: String,
    pub task_config: TaskConfig,
}

/// Binds a task type and optional tenant to an agent and effective settings.
///
/// Tenant lookups are best effort. When the resolver fails, routing still
/// succeeds with the default [`TaskConfig`] and the caller's parameters.
pub struct TaskRouter {
    registry: Arc<AgentRegistry>,
    tenants: Option<Arc<dyn TenantConfigResolver>>,
}

impl TaskRouter {
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        Self {
            registry,
            tenants: None,
        }
    }

    pub fn with_tenants(mut self, resolver: Arc<dyn TenantConfigResolver>) -> Self {
        self.tenants = Some(resolver);
        self
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    /// Pick the agent for `task_type` and compute its effective config.
    ///
    /// Fails with `TaskNotRoutable` only when no registered agent declares
    /// the task type.
    pub async fn route(&self, task_type: &str, tenant: Option<&str>) -> TaskhubResult<RoutePlan> {
        let agent = self
            .registry
            .find_for_task_type(task_type)
            .ok_or_else(|| TaskhubError::TaskNotRoutable(task_type.to_string()))?;
        let agent_id = agent.descriptor().id.clone();

        let task_config = match (tenant, &self.tenants) {
            (Some(tenant), Some(resolver)) => {
                match resolver.task_config(tenant, task_type).await {
                    Ok(config) => config,
                    Err(e) => {
                        warn!(
                            tenant,
                            task_type,
                            error = %e,
                            "Tenant config lookup failed, using defaults"
                        );
                        TaskConfig::default()
                    }
                }
            }
            (Some(tenant), None) => {
                debug!(tenant, task_type, "No tenant resolver configured");
                TaskConfig::default()
            }
            (None, _) => TaskConfig::default(),
        };

        debug!(task_type, agent = %agent_id, ?tenant, "Routed task");
        Ok(RoutePlan {
            agent_id,
            task_config,
        })
    }

    /// Merge tenant parameter defaults under `caller`.
    ///
    /// Never fails: without a tenant, or when the resolver errors, the
    /// caller's parameters are returned unchanged.
    pub async fn resolve_parameters(
        &self,
        task_type: &str,
        caller: Parameters,
        tenant: Option<&str>,
    ) -> Parameters {
        let (Some(tenant), Some(resolver)) = (tenant, &self.tenants) else {
            return caller;
        };
        match resolver
            .task_parameters(tenant, task_type, caller.clone())
            .await
        {
            Ok(merged) => merged,
            Err(e) => {
                warn!(
                    tenant,
                    task_type,
                    error = %e,
                    "Tenant parameter lookup failed, using caller parameters"
                );
                caller
            }
        }
    }
}
