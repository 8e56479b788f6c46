//! # Stratus Internal Library
//!
//! Re-exports the core Stratus crates for convenience.

/// Layer 1: Tracing setup and build information.
pub use stratus_core;

/// Layer 2: Resource graphs, deferred values and plans.
pub use stratus_graph;

/// Layer 2: Reusable component definition.
pub use stratus_component;

/// Layer 3: Stack configuration and secrets.
pub use stratus_config;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use stratus_component::{Component, ComponentExt};
    pub use stratus_config::{ConfigError, SecretStore, StackConfig};
    pub use stratus_core::{BuildInfo, Tracing, TracingFormat};
    pub use stratus_graph::prelude::*;
}
