//! Declarative cloud infrastructure graphs in Rust.
//!
//! Programs declare resources into a [`ResourceGraph`](stratus_graph::ResourceGraph),
//! thread deferred outputs between them and hand the finalized plan to an
//! infrastructure engine.

pub use stratus_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use stratus_internal::prelude::*;
}
