use crate::store::{ExecutionStore, ExecutionUpdate};
use async_trait::async_trait;
use std::collections::HashMap;
use taskhub_core::{TaskExecution, TaskStatus, TaskhubError, TaskhubResult};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Process-local store. Records are lost on restart.
#[derive(Default)]
pub struct MemoryExecutionStore {
    records: RwLock<HashMap<Uuid, TaskExecution>>,
}

impl MemoryExecutionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl ExecutionStore for MemoryExecutionStore {
    async fn create(&self, execution: &TaskExecution) -> TaskhubResult<()> {
        let mut records = self.records.write().await;
        if records.contains_key(&execution.id) {
            return Err(TaskhubError::Store(format!(
                "Execution {} already exists",
                execution.id
            )));
        }
        records.insert(execution.id, execution.clone());
        Ok(())
    }

    async fn get(&self, id: Uuid) -> TaskhubResult<Option<TaskExecution>> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn modify(&self, id: Uuid, update: ExecutionUpdate) -> TaskhubResult<TaskExecution> {
        let mut records = self.records.write().await;
        let current = records.get_mut(&id).ok_or(TaskhubError::TaskNotFound(id))?;
        let mut next = current.clone();
        update(&mut next)?;
        *current = next.clone();
        Ok(next)
    }

    async fn list_by_status(&self, status: TaskStatus) -> TaskhubResult<Vec<TaskExecution>> {
        let records = self.records.read().await;
        let mut matching: Vec<TaskExecution> = records
            .values()
            .filter(|e| e.status == status)
            .cloned()
            .collect();
        matching.sort_by_key(|e| e.created_at);
        Ok(matching)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use taskhub_core::Parameters;

    #[tokio::test]
    async fn test_create_get() {
        let store = MemoryExecutionStore::new();
        let exec = TaskExecution::new("echo", Parameters::new());
        store.create(&exec).await.unwrap();

        let loaded = store.get(exec.id).await.unwrap().unwrap();
        assert_eq!(loaded.task_type, "echo");
        assert_eq!(store.len().await, 1);
        assert!(store.get(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_create_rejected() {
        let store = MemoryExecutionStore::new();
        let exec = TaskExecution::new("echo", Parameters::new());
        store.create(&exec).await.unwrap();
        assert!(store.create(&exec).await.is_err());
    }

    #[tokio::test]
    async fn test_failed_update_leaves_record_untouched() {
        let store = MemoryExecutionStore::new();
        let exec = TaskExecution::new("echo", Parameters::new());
        store.create(&exec).await.unwrap();

        let err = store
            .modify(
                exec.id,
                Box::new(|e: &mut TaskExecution| {
                    e.attempts = 99;
                    e.complete(serde_json::Value::Null)
                }),
            )
            .await
            .unwrap_err();
        assert!(err.is_invalid_transition());

        let loaded = store.get(exec.id).await.unwrap().unwrap();
        assert_eq!(loaded.attempts, 0);
        assert_eq!(loaded.status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn test_modify_missing() {
        let store = MemoryExecutionStore::new();
        let id = Uuid::new_v4();
        let err = store
            .modify(id, Box::new(|e: &mut TaskExecution| e.start()))
            .await
            .unwrap_err();
        assert!(matches!(err, TaskhubError::TaskNotFound(missing) if missing == id));
    }
}
