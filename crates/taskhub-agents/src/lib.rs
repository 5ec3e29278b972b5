//! Agent contract and capability registry.
//!
//! Agents are independently implemented task handlers. Each declares the set
//! of task types it can perform and exposes a single `execute` call; the hub
//! never looks past that interface.
//!
//! # Main types
//!
//! - [`Agent`]: Trait every task handler implements.
//! - [`AgentDescriptor`]: Identity and capability set of an agent.
//! - [`AgentContext`]: Everything an agent receives for one execution.
//! - [`AgentRegistry`]: Maps task types to capable agents.
//! - [`EchoAgent`]: Built-in agent that returns its parameters.

/// The agent trait and its descriptor/context types.
pub mod agent;
/// Built-in echo agent.
pub mod echo;
/// Capability registry.
pub mod registry;

pub use agent::{Agent, AgentContext, AgentDescriptor};
pub use echo::EchoAgent;
pub use registry::AgentRegistry;
