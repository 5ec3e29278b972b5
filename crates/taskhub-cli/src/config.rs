use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use taskhub_agents::AgentRegistry;
use taskhub_orchestrator::QueueConfig;
use taskhub_tenant::TenantProfile;
use tracing::info;

/// Contents of `taskhub.toml`.
#[derive(Debug, Deserialize)]
pub struct TaskhubConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub store: StoreBackend,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub workers: Vec<WorkerConfig>,
    #[serde(default)]
    pub tenants: HashMap<String, TenantProfile>,
}

impl Default for TaskhubConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            store: StoreBackend::default(),
            server: ServerConfig::default(),
            queue: QueueConfig::default(),
            workers: Vec::new(),
            tenants: HashMap::new(),
        }
    }
}

/// Where execution records live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// JSON files under `data_dir/executions`.
    #[default]
    File,
    /// Process memory; records are lost on restart.
    Memory,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// One `[[workers]]` entry: a pool of lease loops for a task type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorkerConfig {
    pub task_type: String,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_concurrency() -> usize {
    1
}

impl TaskhubConfig {
    pub fn from_toml_str(source: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Read `path`, falling back to defaults when the file does not exist.
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        let source = tokio::fs::read_to_string(path).await.map_err(|e| {
            anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e)
        })?;
        Self::from_toml_str(&source)
            .map_err(|e| anyhow::anyhow!("Invalid config file '{}': {}", path.display(), e))
    }

    /// Configured pools, or one single-slot pool per capability of every
    /// registered agent when none are configured.
    pub fn effective_workers(&self, registry: &AgentRegistry) -> Vec<WorkerConfig> {
        if !self.workers.is_empty() {
            return self.workers.clone();
        }
        let task_types: BTreeSet<String> = registry
            .list_descriptors()
            .into_iter()
            .flat_map(|d| d.capabilities)
            .collect();
        task_types
            .into_iter()
            .map(|task_type| WorkerConfig {
                task_type,
                concurrency: default_concurrency(),
            })
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use taskhub_agents::EchoAgent;
    use taskhub_core::Priority;

    const SAMPLE: &str = r#"
        data_dir = "/var/lib/taskhub"
        store = "memory"

        [server]
        port = 8080

        [queue]
        backoff_base_ms = 500

        [[workers]]
        task_type = "echo"
        concurrency = 4

        [[workers]]
        task_type = "report"

        [tenants.acme.defaults]
        priority = "high"

        [tenants.acme.tasks.report]
        timeout_ms = 120000
    "#;

    #[test]
    fn test_parse_full_config() {
        let config = TaskhubConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/taskhub"));
        assert_eq!(config.store, StoreBackend::Memory);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.queue.backoff_base_ms, 500);
        assert_eq!(config.queue.backoff_max_ms, 60_000);
        assert_eq!(config.queue.retain_finished, 1_024);
        assert_eq!(config.workers.len(), 2);
        assert_eq!(config.workers[1].concurrency, 1);

        let acme = &config.tenants["acme"];
        assert_eq!(acme.defaults.priority, Some(Priority::High));
        assert_eq!(acme.tasks["report"].timeout_ms, Some(120_000));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = TaskhubConfig::from_toml_str("").unwrap();
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.store, StoreBackend::File);
        assert_eq!(config.server.port, 3000);
        assert!(config.workers.is_empty());
        assert!(config.tenants.is_empty());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        assert!(TaskhubConfig::from_toml_str("store = \"postgres\"").is_err());
    }

    #[test]
    fn test_workers_default_to_agent_capabilities() {
        let registry = AgentRegistry::new();
        registry.register(Arc::new(EchoAgent::new())).unwrap();

        let config = TaskhubConfig::default();
        assert_eq!(
            config.effective_workers(&registry),
            vec![WorkerConfig {
                task_type: "echo".into(),
                concurrency: 1,
            }]
        );

        let configured = TaskhubConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(configured.effective_workers(&registry).len(), 2);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config = TaskhubConfig::load(&tmp.path().join("absent.toml"))
            .await
            .unwrap();
        assert_eq!(config.server.port, 3000);
    }

    #[tokio::test]
    async fn test_load_from_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("taskhub.toml");
        tokio::fs::write(&path, SAMPLE).await.unwrap();
        let config = TaskhubConfig::load(&path).await.unwrap();
        assert_eq!(config.workers[0].concurrency, 4);
    }
}
