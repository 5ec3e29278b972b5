use crate::resolver::TenantConfigResolver;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use taskhub_core::{
    merge_parameters, Parameters, Priority, TaskConfig, TaskhubError, TaskhubResult,
};
use tracing::debug;

/// Optional overrides for a [`TaskConfig`]; unset fields keep the base value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigOverride {
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub retries: Option<u32>,
}

impl ConfigOverride {
    fn apply(&self, config: &mut TaskConfig) {
        if let Some(priority) = self.priority {
            config.priority = priority;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        if let Some(retries) = self.retries {
            config.retries = retries;
        }
    }
}

/// Per-task-type overrides inside a tenant.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskOverride {
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub retries: Option<u32>,
    #[serde(default)]
    pub parameters: Parameters,
}

impl TaskOverride {
    fn config_override(&self) -> ConfigOverride {
        ConfigOverride {
            priority: self.priority,
            timeout_ms: self.timeout_ms,
            retries: self.retries,
        }
    }
}

/// One tenant's configuration table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TenantProfile {
    /// Overrides applied to every task type.
    #[serde(default)]
    pub defaults: ConfigOverride,
    /// Parameter defaults applied to every task type.
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(default)]
    pub tasks: HashMap<String, TaskOverride>,
}

/// Resolver over a fixed set of tenant tables.
///
/// Precedence, lowest first: `base` config → tenant `defaults` →
/// `tasks.<type>`. Parameters: tenant `parameters` → `tasks.<type>.parameters`
/// → caller values.
#[derive(Debug, Clone, Default)]
pub struct StaticTenantResolver {
    tenants: HashMap<String, TenantProfile>,
    base: TaskConfig,
}

impl StaticTenantResolver {
    pub fn new(tenants: HashMap<String, TenantProfile>) -> Self {
        Self {
            tenants,
            base: TaskConfig::default(),
        }
    }

    /// Parse a TOML document whose top-level tables are tenant names.
    pub fn from_toml_str(source: &str) -> TaskhubResult<Self> {
        let tenants: HashMap<String, TenantProfile> = toml::from_str(source)
            .map_err(|e| TaskhubError::Config(format!("Invalid tenant config: {e}")))?;
        Ok(Self::new(tenants))
    }

    pub fn with_base(mut self, base: TaskConfig) -> Self {
        self.base = base;
        self
    }

    pub fn tenant_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tenants.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn profile(&self, tenant: &str) -> TaskhubResult<&TenantProfile> {
        self.tenants
            .get(tenant)
            .ok_or_else(|| TaskhubError::TenantNotFound(tenant.to_string()))
    }
}

#[async_trait]
impl TenantConfigResolver for StaticTenantResolver {
    async fn task_config(&self, tenant: &str, task_type: &str) -> TaskhubResult<TaskConfig> {
        let profile = self.profile(tenant)?;
        let mut config = self.base.clone();
        profile.defaults.apply(&mut config);
        if let Some(task) = profile.tasks.get(task_type) {
            task.config_override().apply(&mut config);
        }
        debug!(tenant, task_type, ?config, "Resolved tenant task config");
        Ok(config)
    }

    async fn task_parameters(
        &self,
        tenant: &str,
        task_type: &str,
        caller: Parameters,
    ) -> TaskhubResult<Parameters> {
        let profile = self.profile(tenant)?;
        let mut merged = profile.parameters.clone();
        if let Some(task) = profile.tasks.get(task_type) {
            merged = merge_parameters(merged, task.parameters.clone());
        }
        Ok(merge_parameters(merged, caller))
    }
}
