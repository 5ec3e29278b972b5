use async_trait::async_trait;
use taskhub_core::{TaskExecution, TaskStatus, TaskhubResult};
use uuid::Uuid;

/// An update applied under the store's write guard. Returning `Err` aborts
/// the write and the record is left untouched.
pub type ExecutionUpdate = Box<dyn FnOnce(&mut TaskExecution) -> TaskhubResult<()> + Send>;

#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Insert a new record. Fails if the id already exists.
    async fn create(&self, execution: &TaskExecution) -> TaskhubResult<()>;

    async fn get(&self, id: Uuid) -> TaskhubResult<Option<TaskExecution>>;

    /// Atomically apply `update` and persist the result.
    ///
    /// Returns the updated record, or `TaskNotFound` if `id` is unknown.
    async fn modify(&self, id: Uuid, update: ExecutionUpdate) -> TaskhubResult<TaskExecution>;

    /// All records currently in `status`, oldest first.
    async fn list_by_status(&self, status: TaskStatus) -> TaskhubResult<Vec<TaskExecution>>;
}
