use crate::callback::CallbackNotifier;
use crate::monitor::ExecutionMonitor;
use crate::router::TaskRouter;
use crate::task_queue::{JobFailure, JobHandler, TaskQueue};
use crate::types::{QueueJob, ResultView, StatusView, SubmitRequest};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use taskhub_agents::{AgentContext, AgentRegistry};
use taskhub_core::{
    Parameters, Priority, TaskConfig, TaskExecution, TaskStatus, TaskhubError, TaskhubResult,
};
use taskhub_store::{ExecutionStore, ExecutionUpdate};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// What a queue job carries besides the execution id.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct JobPayload {
    tenant: Option<String>,
    parameters: Parameters,
    priority: Priority,
    task_config: TaskConfig,
}

impl From<&TaskExecution> for JobPayload {
    fn from(execution: &TaskExecution) -> Self {
        Self {
            tenant: execution.tenant.clone(),
            parameters: execution.parameters.clone(),
            priority: execution.priority,
            task_config: execution.task_config.clone(),
        }
    }
}

/// Milliseconds between `started_at` and `completed_at`, 0 if either is unset.
fn run_duration_ms(execution: &TaskExecution) -> u64 {
    match (execution.started_at, execution.completed_at) {
        (Some(start), Some(end)) => u64::try_from((end - start).num_milliseconds()).unwrap_or(0),
        _ => 0,
    }
}

/// Runs leased jobs against agents and writes the outcome to the store.
struct JobProcessor {
    store: Arc<dyn ExecutionStore>,
    registry: Arc<AgentRegistry>,
    monitor: Arc<ExecutionMonitor>,
    notifier: Arc<CallbackNotifier>,
}

impl JobProcessor {
    /// Move the record to `running` (first attempt) and count the attempt.
    ///
    /// `Ok(None)` means the record is already terminal and the job should be
    /// dropped.
    async fn begin_attempt(&self, job: &QueueJob) -> Result<Option<TaskExecution>, JobFailure> {
        let update: ExecutionUpdate = Box::new(|e: &mut TaskExecution| {
            if e.status != TaskStatus::Running {
                e.start()?;
            }
            e.attempts += 1;
            Ok(())
        });
        match self.store.modify(job.execution_id, update).await {
            Ok(execution) => Ok(Some(execution)),
            Err(e) if e.is_invalid_transition() => {
                debug!(
                    execution_id = %job.execution_id,
                    error = %e,
                    "Execution no longer runnable, dropping job"
                );
                Ok(None)
            }
            Err(TaskhubError::TaskNotFound(id)) => Err(JobFailure::fatal(format!(
                "Execution record {id} does not exist"
            ))),
            Err(e) => Err(JobFailure::retryable(format!(
                "Failed to mark execution running: {e}"
            ))),
        }
    }

    async fn is_cancelled(&self, execution_id: Uuid) -> bool {
        matches!(
            self.store.get(execution_id).await,
            Ok(Some(execution)) if execution.status == TaskStatus::Cancelled
        )
    }
}

#[async_trait]
impl JobHandler for JobProcessor {
    async fn process(&self, job: &QueueJob) -> Result<(), JobFailure> {
        let Some(execution) = self.begin_attempt(job).await? else {
            return Ok(());
        };

        let payload: JobPayload = serde_json::from_value(job.payload.clone())
            .map_err(|e| JobFailure::fatal(format!("Malformed job payload: {e}")))?;

        let agent = self
            .registry
            .find_for_task_type(&job.task_type)
            .ok_or_else(|| {
                JobFailure::fatal(format!(
                    "No agent is registered for task type '{}' anymore",
                    job.task_type
                ))
            })?;

        info!(
            execution_id = %job.execution_id,
            task_type = %job.task_type,
            agent = %agent.descriptor().id,
            attempt = execution.attempts,
            "Running task"
        );

        let ctx = AgentContext {
            execution_id: job.execution_id,
            task_type: job.task_type.clone(),
            tenant: payload.tenant,
            parameters: payload.parameters,
            priority: payload.priority,
            task_config: payload.task_config,
        };

        match agent.execute(ctx).await {
            Ok(value) => {
                let update: ExecutionUpdate =
                    Box::new(move |e: &mut TaskExecution| e.complete(value));
                match self.store.modify(job.execution_id, update).await {
                    Ok(done) => {
                        let duration_ms = run_duration_ms(&done);
                        info!(
                            execution_id = %done.id,
                            task_type = %done.task_type,
                            duration_ms,
                            "Task completed"
                        );
                        self.monitor
                            .record_completed(&done.task_type, duration_ms)
                            .await;
                        self.notifier.notify_execution(&done).await;
                        Ok(())
                    }
                    Err(e) if e.is_invalid_transition() => {
                        info!(
                            execution_id = %job.execution_id,
                            "Execution was cancelled while running, discarding result"
                        );
                        Ok(())
                    }
                    // The agent already ran and must not run again.
                    Err(e) => Err(JobFailure::fatal(format!(
                        "Failed to record task result: {e}"
                    ))),
                }
            }
            Err(e) => {
                self.monitor.record_attempt_failure(&job.task_type).await;
                if self.is_cancelled(job.execution_id).await {
                    info!(
                        execution_id = %job.execution_id,
                        error = %e,
                        "Cancelled execution failed, not retrying"
                    );
                    return Ok(());
                }
                Err(JobFailure::retryable(e.to_string()))
            }
        }
    }

    async fn on_failed(&self, job: &QueueJob, failure: &JobFailure) {
        let message = failure.message.clone();
        let update: ExecutionUpdate = Box::new(move |e: &mut TaskExecution| {
            if e.status == TaskStatus::Pending {
                e.start()?;
            }
            e.fail(message)
        });
        match self.store.modify(job.execution_id, update).await {
            Ok(failed) => {
                let duration_ms = run_duration_ms(&failed);
                error!(
                    execution_id = %failed.id,
                    task_type = %failed.task_type,
                    attempts = failed.attempts,
                    error = %failure.message,
                    "Task failed"
                );
                self.monitor
                    .record_failed(&failed.task_type, duration_ms)
                    .await;
                self.notifier.notify_execution(&failed).await;
            }
            Err(e) if e.is_invalid_transition() => {
                debug!(
                    execution_id = %job.execution_id,
                    "Execution already terminal, keeping its status"
                );
            }
            Err(e) => {
                error!(
                    execution_id = %job.execution_id,
                    error = %e,
                    "Failed to record terminal failure"
                );
            }
        }
    }
}

/// Owns the full task lifecycle: submit, run, poll and cancel.
///
/// The store is the only place execution status lives. Every write goes
/// through [`ExecutionStore::modify`], so a cancel racing a worker has
/// exactly one winner.
pub struct TaskExecutor {
    router: TaskRouter,
    queue: Arc<TaskQueue>,
    store: Arc<dyn ExecutionStore>,
    monitor: Arc<ExecutionMonitor>,
    notifier: Arc<CallbackNotifier>,
}

impl TaskExecutor {
    pub fn new(router: TaskRouter, queue: Arc<TaskQueue>, store: Arc<dyn ExecutionStore>) -> Self {
        Self {
            router,
            queue,
            store,
            monitor: Arc::new(ExecutionMonitor::new()),
            notifier: Arc::new(CallbackNotifier::new()),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<CallbackNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn router(&self) -> &TaskRouter {
        &self.router
    }

    pub fn queue(&self) -> &Arc<TaskQueue> {
        &self.queue
    }

    pub fn store(&self) -> &Arc<dyn ExecutionStore> {
        &self.store
    }

    pub fn monitor(&self) -> &Arc<ExecutionMonitor> {
        &self.monitor
    }

    /// Start `concurrency` lease loops processing `task_type` jobs.
    pub fn start_workers(&self, task_type: &str, concurrency: usize) -> TaskhubResult<()> {
        let processor = Arc::new(JobProcessor {
            store: Arc::clone(&self.store),
            registry: Arc::clone(self.router.registry()),
            monitor: Arc::clone(&self.monitor),
            notifier: Arc::clone(&self.notifier),
        });
        self.queue.register_worker(task_type, concurrency, processor)
    }

    /// Route, persist and enqueue a task. Returns the new execution id.
    ///
    /// An unroutable task type fails before anything is written. If the
    /// record is written but the job cannot be enqueued, the record is
    /// marked `failed` and `TaskExecution` is returned.
    pub async fn submit(&self, request: SubmitRequest) -> TaskhubResult<Uuid> {
        let SubmitRequest {
            task_type,
            tenant,
            parameters,
            priority,
            callback_url,
        } = request;

        let plan = self.router.route(&task_type, tenant.as_deref()).await?;
        let parameters = self
            .router
            .resolve_parameters(&task_type, parameters, tenant.as_deref())
            .await;
        let priority = priority.unwrap_or(plan.task_config.priority);

        let execution = TaskExecution::new(task_type.clone(), parameters)
            .with_tenant(tenant)
            .with_priority(priority)
            .with_config(plan.task_config)
            .with_callback(callback_url);
        let execution_id = execution.id;

        self.store.create(&execution).await.map_err(|e| {
            TaskhubError::TaskExecution(format!("Failed to persist execution: {e}"))
        })?;
        self.monitor.record_submitted(&task_type).await;

        match self.enqueue(&execution) {
            Ok(job_id) => {
                self.attach_job(execution_id, job_id).await;
                info!(
                    execution_id = %execution_id,
                    task_type = %task_type,
                    agent = %plan.agent_id,
                    %priority,
                    "Task submitted"
                );
                Ok(execution_id)
            }
            Err(e) => {
                let message = format!("Failed to enqueue task: {e}");
                self.reject(execution_id, message.clone()).await;
                Err(TaskhubError::TaskExecution(message))
            }
        }
    }

    fn enqueue(&self, execution: &TaskExecution) -> TaskhubResult<Uuid> {
        let payload = serde_json::to_value(JobPayload::from(execution))?;
        self.queue.enqueue(
            &execution.task_type,
            execution.id,
            payload,
            execution.priority,
            execution.task_config.retries.max(1),
        )
    }

    async fn attach_job(&self, execution_id: Uuid, job_id: Uuid) {
        let update: ExecutionUpdate = Box::new(move |e: &mut TaskExecution| {
            e.job_id = Some(job_id);
            Ok(())
        });
        if let Err(e) = self.store.modify(execution_id, update).await {
            warn!(
                execution_id = %execution_id,
                job_id = %job_id,
                error = %e,
                "Failed to record job id"
            );
        }
    }

    async fn reject(&self, execution_id: Uuid, message: String) {
        let reason = message.clone();
        let update: ExecutionUpdate = Box::new(move |e: &mut TaskExecution| e.reject(reason));
        match self.store.modify(execution_id, update).await {
            Ok(rejected) => {
                error!(execution_id = %execution_id, error = %message, "Task rejected");
                self.monitor.record_failed(&rejected.task_type, 0).await;
                self.notifier.notify_execution(&rejected).await;
            }
            Err(e) => {
                error!(
                    execution_id = %execution_id,
                    error = %e,
                    "Failed to mark unqueued execution failed"
                );
            }
        }
    }

    async fn load(&self, execution_id: Uuid) -> TaskhubResult<TaskExecution> {
        self.store
            .get(execution_id)
            .await?
            .ok_or(TaskhubError::TaskNotFound(execution_id))
    }

    pub async fn get_status(&self, execution_id: Uuid) -> TaskhubResult<StatusView> {
        Ok(StatusView::from(&self.load(execution_id).await?))
    }

    /// The outcome, or a "still in progress" view for non-terminal records.
    pub async fn get_result(&self, execution_id: Uuid) -> TaskhubResult<ResultView> {
        Ok(ResultView::from(&self.load(execution_id).await?))
    }

    /// Cancel a pending or running execution.
    ///
    /// Returns `false` if it is already terminal. A waiting job is removed
    /// from the queue; a job already inside an agent runs to completion and
    /// its result is discarded.
    pub async fn cancel(&self, execution_id: Uuid) -> TaskhubResult<bool> {
        let update: ExecutionUpdate = Box::new(|e: &mut TaskExecution| e.cancel());
        let cancelled = match self.store.modify(execution_id, update).await {
            Ok(cancelled) => cancelled,
            Err(e) if e.is_invalid_transition() => {
                debug!(execution_id = %execution_id, "Cancel ignored, execution already terminal");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        if let Some(job_id) = cancelled.job_id {
            if self.queue.cancel_job(job_id) {
                debug!(execution_id = %execution_id, job_id = %job_id, "Removed waiting job");
            } else {
                debug!(
                    execution_id = %execution_id,
                    job_id = %job_id,
                    "Job already leased, its result will be discarded"
                );
            }
        }

        info!(execution_id = %execution_id, task_type = %cancelled.task_type, "Task cancelled");
        self.monitor.record_cancelled(&cancelled.task_type).await;
        self.notifier.notify_execution(&cancelled).await;
        Ok(true)
    }

    /// Executions currently in `status`, oldest first.
    pub async fn list(&self, status: TaskStatus) -> TaskhubResult<Vec<TaskExecution>> {
        self.store.list_by_status(status).await
    }

    /// Reconcile records left behind by a previous process.
    ///
    /// Running records were interrupted mid-call and are failed, since their
    /// agent may already have had side effects. Pending records then get a
    /// fresh job. The running set is read before anything is re-enqueued, so
    /// workers that are already up never have their new leases failed.
    /// Returns how many records were touched.
    pub async fn recover(&self) -> TaskhubResult<usize> {
        let interrupted = self.store.list_by_status(TaskStatus::Running).await?;
        let pending = self.store.list_by_status(TaskStatus::Pending).await?;
        let mut touched = 0;

        for execution in interrupted {
            let update: ExecutionUpdate =
                Box::new(|e: &mut TaskExecution| e.fail("Interrupted by process restart"));
            match self.store.modify(execution.id, update).await {
                Ok(failed) => {
                    warn!(execution_id = %failed.id, "Failed task interrupted by restart");
                    self.monitor
                        .record_failed(&failed.task_type, run_duration_ms(&failed))
                        .await;
                    self.notifier.notify_execution(&failed).await;
                    touched += 1;
                }
                Err(e) => {
                    warn!(
                        execution_id = %execution.id,
                        error = %e,
                        "Could not fail interrupted task"
                    );
                }
            }
        }

        for execution in pending {
            match self.enqueue(&execution) {
                Ok(job_id) => {
                    self.attach_job(execution.id, job_id).await;
                    info!(
                        execution_id = %execution.id,
                        job_id = %job_id,
                        "Re-enqueued pending task"
                    );
                }
                Err(e) => {
                    self.reject(execution.id, format!("Failed to re-enqueue task: {e}"))
                        .await;
                }
            }
            touched += 1;
        }

        Ok(touched)
    }

    /// Stop accepting work and wait for in-flight jobs.
    pub async fn shutdown(&self) {
        self.queue.shutdown().await;
    }
}
