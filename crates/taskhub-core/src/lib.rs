//! Core types and error definitions for taskhub.
//!
//! This crate provides the foundational types shared across all taskhub crates:
//! the unified error enum, task priorities and configuration, and the
//! [`TaskExecution`] record together with its lifecycle state machine.
//!
//! # Main types
//!
//! - [`TaskhubError`]: Unified error enum for all taskhub subsystems.
//! - [`TaskhubResult`]: Convenience alias for `Result<T, TaskhubError>`.
//! - [`Priority`]: Five-level task priority with a total dequeue order.
//! - [`TaskConfig`]: Effective priority/timeout/retries for a routed task.
//! - [`TaskStatus`]: Lifecycle state of a [`TaskExecution`].
//! - [`TaskExecution`]: One submitted-and-tracked task instance.

/// Error types.
pub mod error;
/// Execution records and the lifecycle state machine.
pub mod execution;
/// Priorities, task configuration and parameter maps.
pub mod types;

pub use error::{TaskhubError, TaskhubResult};
pub use execution::{TaskExecution, TaskStatus};
pub use types::{merge_parameters, Parameters, Priority, TaskConfig};
