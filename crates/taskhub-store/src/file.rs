use crate::store::{ExecutionStore, ExecutionUpdate};
use async_trait::async_trait;
use std::path::PathBuf;
use taskhub_core::{TaskExecution, TaskStatus, TaskhubError, TaskhubResult};
use tokio::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

/// File-based store: one JSON file per execution.
///
/// Writes are serialized by a single mutex and land via a temp file plus
/// rename, so a crash never leaves a half-written record.
pub struct FileExecutionStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileExecutionStore {
    pub async fn new(dir: PathBuf) -> TaskhubResult<Self> {
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    fn record_path(&self, id: Uuid) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    async fn read(&self, id: Uuid) -> TaskhubResult<Option<TaskExecution>> {
        let path = self.record_path(id);
        if !path.exists() {
            return Ok(None);
        }
        let data = tokio::fs::read_to_string(path).await?;
        let execution = serde_json::from_str(&data)
            .map_err(|e| TaskhubError::Store(format!("Failed to parse execution {id}: {e}")))?;
        Ok(Some(execution))
    }

    async fn write(&self, execution: &TaskExecution) -> TaskhubResult<()> {
        let path = self.record_path(execution.id);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(execution)?;
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl ExecutionStore for FileExecutionStore {
    async fn create(&self, execution: &TaskExecution) -> TaskhubResult<()> {
        let _guard = self.write_lock.lock().await;
        if self.record_path(execution.id).exists() {
            return Err(TaskhubError::Store(format!(
                "Execution {} already exists",
                execution.id
            )));
        }
        self.write(execution).await
    }

    async fn get(&self, id: Uuid) -> TaskhubResult<Option<TaskExecution>> {
        self.read(id).await
    }

    async fn modify(&self, id: Uuid, update: ExecutionUpdate) -> TaskhubResult<TaskExecution> {
        let _guard = self.write_lock.lock().await;
        let mut execution = self.read(id).await?.ok_or(TaskhubError::TaskNotFound(id))?;
        update(&mut execution)?;
        self.write(&execution).await?;
        Ok(execution)
    }

    async fn list_by_status(&self, status: TaskStatus) -> TaskhubResult<Vec<TaskExecution>> {
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        let mut matching = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
                continue;
            };
            let Some(id) = name
                .strip_suffix(".json")
                .and_then(|stem| Uuid::parse_str(stem).ok())
            else {
                continue;
            };
            match self.read(id).await {
                Ok(Some(execution)) if execution.status == status => matching.push(execution),
                Ok(_) => {}
                Err(e) => warn!(execution_id = %id, error = %e, "Skipping unreadable execution"),
            }
        }
        matching.sort_by_key(|e| e.created_at);
        Ok(matching)
    }
}
