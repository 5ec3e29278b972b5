//! Tenant configuration resolution.
//!
//! A tenant is a named configuration scope providing task defaults and
//! parameter defaults per task type. The router consumes it through the
//! [`TenantConfigResolver`] trait; [`StaticTenantResolver`] serves the
//! tables declared in `taskhub.toml`.

/// The resolver contract.
pub mod resolver;
/// TOML-backed resolver.
pub mod static_config;

pub use resolver::TenantConfigResolver;
pub use static_config::{ConfigOverride, StaticTenantResolver, TaskOverride, TenantProfile};
