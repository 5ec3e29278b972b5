//! Task routing, priority queuing and execution lifecycle.
//!
//! A submission is routed to a capable agent, persisted as a pending
//! execution and handed to a per-task-type priority queue. Worker loops lease
//! jobs, run the agent, and record the terminal status, retrying failed
//! attempts with exponential backoff.
//!
//! # Main types
//!
//! - [`TaskExecutor`]: Submit, poll and cancel executions; starts worker pools.
//! - [`TaskRouter`]: Picks the agent and merges tenant configuration.
//! - [`TaskQueue`]: Priority queue with leasing, retry and backoff.
//! - [`ExecutionMonitor`]: Per-task-type outcome counters.
//! - [`CallbackNotifier`]: Terminal-state webhook delivery.

/// Completion callbacks.
pub mod callback;
/// Lifecycle orchestration.
pub mod executor;
/// Execution metrics.
pub mod monitor;
/// Agent and tenant routing.
pub mod router;
/// Priority task queue.
pub mod task_queue;
/// Queue jobs and request/response views.
pub mod types;

pub use callback::{CallbackNotifier, CallbackPayload};
pub use executor::TaskExecutor;
pub use monitor::{ExecutionMonitor, TaskTypeMetrics};
pub use router::{RoutePlan, TaskRouter};
pub use task_queue::{JobFailure, JobHandler, QueueConfig, TaskQueue};
pub use types::{JobState, QueueCounts, QueueJob, ResultView, StatusView, SubmitRequest};
