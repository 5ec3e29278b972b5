use async_trait::async_trait;
use taskhub_core::{Parameters, TaskConfig, TaskhubResult};

/// Resolves a tenant key to task settings.
#[async_trait]
pub trait TenantConfigResolver: Send + Sync {
    /// Effective priority/timeout/retries for `task_type` under `tenant`.
    async fn task_config(&self, tenant: &str, task_type: &str) -> TaskhubResult<TaskConfig>;

    /// Tenant parameter defaults with `caller` merged on top.
    ///
    /// The merge is shallow: a caller-supplied key always replaces the
    /// tenant value, nested structures included.
    async fn task_parameters(
        &self,
        tenant: &str,
        task_type: &str,
        caller: Parameters,
    ) -> TaskhubResult<Parameters>;
}
