//! Persistence for [`TaskExecution`](taskhub_core::TaskExecution) records.
//!
//! The store is the single source of truth for execution status. All
//! lifecycle writes go through [`ExecutionStore::modify`], an atomic
//! read-modify-write, so a concurrent cancel and a worker completing the same
//! execution can never both win.

/// File-backed store.
pub mod file;
/// In-memory store.
pub mod memory;
/// The store trait.
pub mod store;

pub use file::FileExecutionStore;
pub use memory::MemoryExecutionStore;
pub use store::{ExecutionStore, ExecutionUpdate};
