//! HTTP gateway for taskhub.
//!
//! Exposes submit, poll, list and cancel over JSON, plus health, agent
//! listing and metrics endpoints. Executor errors map to status codes:
//! unroutable task types are `422`, unknown execution ids `404`, and
//! infrastructure failures `500`.

/// Error-to-response mapping.
pub mod error;
/// Router construction and shared state.
pub mod server;
/// Task endpoints.
pub mod tasks;

pub use error::ApiError;
pub use server::{AppState, GatewayServer};
