use crate::types::{JobState, QueueCounts, QueueJob};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use taskhub_core::{Priority, TaskhubError, TaskhubResult};
use tokio::sync::{watch, Notify};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Retry backoff and retention settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Delay before the first retry, in milliseconds. Doubles per retry.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Cap for the retry delay, in milliseconds.
    #[serde(default = "default_backoff_max_ms")]
    pub backoff_max_ms: u64,
    /// How many finished jobs stay queryable through
    /// [`TaskQueue::get_job_state`]. Older ones report `NotFound`.
    #[serde(default = "default_retain_finished")]
    pub retain_finished: usize,
}

fn default_backoff_base_ms() -> u64 {
    2_000
}

fn default_backoff_max_ms() -> u64 {
    60_000
}

fn default_retain_finished() -> usize {
    1_024
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            backoff_base_ms: default_backoff_base_ms(),
            backoff_max_ms: default_backoff_max_ms(),
            retain_finished: default_retain_finished(),
        }
    }
}

impl QueueConfig {
    /// Delay before the `retry`-th retry (1-based).
    pub fn retry_delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(32);
        let delay = self
            .backoff_base_ms
            .saturating_mul(2u64.saturating_pow(exponent));
        Duration::from_millis(delay.min(self.backoff_max_ms))
    }
}

/// Why a handler gave up on a job attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    pub message: String,
    /// `false` skips any remaining attempts.
    pub retryable: bool,
}

impl JobFailure {
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}

/// Callback invoked by the lease loops.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Run one attempt of `job`.
    async fn process(&self, job: &QueueJob) -> Result<(), JobFailure>;

    /// Called exactly once when `job` fails for good, after its last attempt
    /// or after a non-retryable failure.
    async fn on_failed(&self, job: &QueueJob, failure: &JobFailure);
}

struct JobEntry {
    job: QueueJob,
    state: JobState,
    /// Position in the lane while leasable; `None` while active, finished or
    /// sitting out a backoff.
    lane_key: Option<(u8, u64)>,
}

#[derive(Default)]
struct Lane {
    waiting: BTreeMap<(u8, u64), Uuid>,
    notify: Arc<Notify>,
    completed: usize,
    failed: usize,
}

#[derive(Default)]
struct QueueState {
    lanes: HashMap<String, Lane>,
    jobs: HashMap<Uuid, JobEntry>,
    /// Finished job ids, oldest first.
    finished: VecDeque<Uuid>,
    next_seq: u64,
    closed: bool,
}

impl QueueState {
    /// Put a waiting job into its lane behind every job of equal priority.
    fn make_leasable(&mut self, job_id: Uuid) -> Option<Arc<Notify>> {
        let seq = self.next_seq;
        let entry = self.jobs.get_mut(&job_id)?;
        if entry.state != JobState::Waiting || entry.lane_key.is_some() {
            return None;
        }
        self.next_seq += 1;
        let key = (entry.job.priority.rank(), seq);
        entry.lane_key = Some(key);
        let lane = self.lanes.entry(entry.job.task_type.clone()).or_default();
        lane.waiting.insert(key, job_id);
        Some(lane.notify.clone())
    }

    /// Mark a job completed or failed and evict the oldest finished jobs
    /// beyond `retain`.
    fn finish(&mut self, job_id: Uuid, outcome: JobState, attempt_count: u32, retain: usize) {
        let Some(entry) = self.jobs.get_mut(&job_id) else {
            return;
        };
        entry.state = outcome;
        entry.job.attempt_count = attempt_count;
        let lane = self.lanes.entry(entry.job.task_type.clone()).or_default();
        if outcome == JobState::Failed {
            lane.failed += 1;
        } else {
            lane.completed += 1;
        }

        self.finished.push_back(job_id);
        while self.finished.len() > retain {
            if let Some(evicted) = self.finished.pop_front() {
                self.jobs.remove(&evicted);
            }
        }
    }
}

/// Turn a crashed handler task into a retryable failure.
fn join_failure(err: JoinError) -> JobFailure {
    if !err.is_panic() {
        return JobFailure::retryable(format!("Job handler was aborted: {err}"));
    }
    let panic = err.into_panic();
    let detail = panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    JobFailure::retryable(format!("Job handler panicked: {detail}"))
}

/// In-memory priority work queue with one lane per task type.
///
/// Jobs dequeue by [`Priority::rank`] then insertion order. A leased job is
/// invisible to every other loop until its handler returns. No lock is held
/// while a handler runs.
pub struct TaskQueue {
    state: Mutex<QueueState>,
    config: QueueConfig,
    shutdown: watch::Sender<bool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskQueue {
    pub fn new(config: QueueConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            state: Mutex::new(QueueState::default()),
            config,
            shutdown,
            workers: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Add a job and return its id. Fails once the queue is shut down.
    pub fn enqueue(
        &self,
        task_type: &str,
        execution_id: Uuid,
        payload: serde_json::Value,
        priority: Priority,
        max_attempts: u32,
    ) -> TaskhubResult<Uuid> {
        let job = QueueJob {
            job_id: Uuid::new_v4(),
            task_type: task_type.to_string(),
            execution_id,
            payload,
            priority,
            attempt_count: 0,
            max_attempts: max_attempts.max(1),
        };
        let job_id = job.job_id;

        let notify = {
            let mut state = self.state.lock();
            if state.closed {
                return Err(TaskhubError::Queue("Queue is shut down".to_string()));
            }
            state.jobs.insert(
                job_id,
                JobEntry {
                    job,
                    state: JobState::Waiting,
                    lane_key: None,
                },
            );
            state.make_leasable(job_id)
        };
        if let Some(notify) = notify {
            notify.notify_one();
        }

        debug!(job_id = %job_id, task_type, %priority, "Enqueued job");
        Ok(job_id)
    }

    /// Remove a job that has not been leased yet.
    ///
    /// Returns `false` for active, finished or unknown jobs.
    pub fn cancel_job(&self, job_id: Uuid) -> bool {
        let mut state = self.state.lock();
        let Some(entry) = state.jobs.get(&job_id) else {
            return false;
        };
        if entry.state != JobState::Waiting {
            return false;
        }
        let task_type = entry.job.task_type.clone();
        let lane_key = entry.lane_key;
        state.jobs.remove(&job_id);
        if let (Some(key), Some(lane)) = (lane_key, state.lanes.get_mut(&task_type)) {
            lane.waiting.remove(&key);
        }
        debug!(job_id = %job_id, "Removed waiting job");
        true
    }

    pub fn get_job_state(&self, job_id: Uuid) -> JobState {
        self.state
            .lock()
            .jobs
            .get(&job_id)
            .map_or(JobState::NotFound, |entry| entry.state)
    }

    /// Live waiting/active jobs plus lifetime completed/failed totals.
    pub fn counts(&self, task_type: &str) -> QueueCounts {
        let state = self.state.lock();
        let mut counts = QueueCounts::default();
        if let Some(lane) = state.lanes.get(task_type) {
            counts.completed = lane.completed;
            counts.failed = lane.failed;
        }
        for entry in state.jobs.values().filter(|e| e.job.task_type == task_type) {
            match entry.state {
                JobState::Waiting => counts.waiting += 1,
                JobState::Active => counts.active += 1,
                JobState::Completed | JobState::Failed | JobState::NotFound => {}
            }
        }
        counts
    }

    /// Start `concurrency` independent lease loops for `task_type`.
    pub fn register_worker(
        self: &Arc<Self>,
        task_type: &str,
        concurrency: usize,
        handler: Arc<dyn JobHandler>,
    ) -> TaskhubResult<()> {
        if concurrency == 0 {
            return Err(TaskhubError::Config(format!(
                "Worker pool for '{task_type}' needs a concurrency of at least 1"
            )));
        }
        if self.state.lock().closed {
            return Err(TaskhubError::Queue("Queue is shut down".to_string()));
        }

        let mut workers = self.workers.lock();
        for slot in 0..concurrency {
            let queue = Arc::clone(self);
            let handler = Arc::clone(&handler);
            let task_type = task_type.to_string();
            workers.push(tokio::spawn(async move {
                queue.run_worker(task_type, slot, handler).await;
            }));
        }
        info!(task_type, concurrency, "Started worker pool");
        Ok(())
    }

    /// Stop accepting jobs and wait for every lease loop to finish its
    /// in-flight job.
    pub async fn shutdown(&self) {
        self.state.lock().closed = true;
        self.shutdown.send_replace(true);
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.workers.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Worker loop ended abnormally");
            }
        }
        info!("Task queue shut down");
    }

    fn lane_notify(&self, task_type: &str) -> Arc<Notify> {
        let mut state = self.state.lock();
        state
            .lanes
            .entry(task_type.to_string())
            .or_default()
            .notify
            .clone()
    }

    fn try_lease(&self, task_type: &str) -> Option<QueueJob> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let (_, job_id) = state.lanes.get_mut(task_type)?.waiting.pop_first()?;
        let entry = state.jobs.get_mut(&job_id)?;
        entry.state = JobState::Active;
        entry.lane_key = None;
        Some(entry.job.clone())
    }

    /// Block until a job is leased or the queue shuts down.
    async fn lease(
        &self,
        task_type: &str,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Option<QueueJob> {
        let notify = self.lane_notify(task_type);
        loop {
            if *shutdown.borrow() {
                return None;
            }
            if let Some(job) = self.try_lease(task_type) {
                return Some(job);
            }
            tokio::select! {
                _ = notify.notified() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        return None;
                    }
                }
            }
        }
    }

    async fn run_worker(
        self: Arc<Self>,
        task_type: String,
        slot: usize,
        handler: Arc<dyn JobHandler>,
    ) {
        let mut shutdown = self.shutdown.subscribe();
        debug!(task_type = %task_type, slot, "Worker loop started");

        while let Some(job) = self.lease(&task_type, &mut shutdown).await {
            debug!(
                job_id = %job.job_id,
                execution_id = %job.execution_id,
                attempt = job.attempt(),
                max_attempts = job.max_attempts,
                "Leased job"
            );
            // A panicking handler must not take the lease loop down with it.
            let attempt = {
                let handler = Arc::clone(&handler);
                let job = job.clone();
                tokio::spawn(async move { handler.process(&job).await })
            };
            let outcome = attempt.await.unwrap_or_else(|e| Err(join_failure(e)));
            self.settle(job, outcome, handler.as_ref()).await;
        }

        debug!(task_type = %task_type, slot, "Worker loop exited");
    }

    async fn settle(
        self: &Arc<Self>,
        mut job: QueueJob,
        outcome: Result<(), JobFailure>,
        handler: &dyn JobHandler,
    ) {
        let failure = match outcome {
            Ok(()) => {
                self.finish(job.job_id, JobState::Completed, job.attempt_count);
                return;
            }
            Err(failure) => failure,
        };

        let retry = failure.retryable && !job.is_final_attempt();
        job.attempt_count += 1;
        if retry {
            let delay = self.config.retry_delay(job.attempt_count);
            warn!(
                job_id = %job.job_id,
                execution_id = %job.execution_id,
                attempt = job.attempt_count,
                max_attempts = job.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %failure.message,
                "Job attempt failed, scheduling retry"
            );
            self.back_off(job.job_id, job.attempt_count);
            self.schedule_retry(job.job_id, delay);
            return;
        }

        error!(
            job_id = %job.job_id,
            execution_id = %job.execution_id,
            attempts = job.attempt_count,
            retryable = failure.retryable,
            error = %failure.message,
            "Job failed permanently"
        );
        self.finish(job.job_id, JobState::Failed, job.attempt_count);
        handler.on_failed(&job, &failure).await;
    }

    fn back_off(&self, job_id: Uuid, attempt_count: u32) {
        if let Some(entry) = self.state.lock().jobs.get_mut(&job_id) {
            entry.state = JobState::Waiting;
            entry.job.attempt_count = attempt_count;
        }
    }

    fn finish(&self, job_id: Uuid, outcome: JobState, attempt_count: u32) {
        self.state
            .lock()
            .finish(job_id, outcome, attempt_count, self.config.retain_finished);
    }

    fn schedule_retry(self: &Arc<Self>, job_id: Uuid, delay: Duration) {
        let queue = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Cancelled during the backoff: the entry is gone.
            let notify = queue.state.lock().make_leasable(job_id);
            if let Some(notify) = notify {
                notify.notify_one();
            }
        });
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new(QueueConfig::default())
    }
}
