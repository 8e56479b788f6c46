//! Declarative resource graphs for Stratus.
//!
//! `stratus_graph` lets a program describe cloud infrastructure as a graph of
//! named, typed resources and hand the result to an external infrastructure
//! engine. The crate never creates anything itself: it only checks that the
//! description is well formed and renders it as a [`Plan`].
//!
//! # Core Concepts
//!
//! - [`ResourceGraph`] - Builder that accepts declarations in program order
//! - [`ResourceInput`] / [`ResourceSpec`] - A resource before and after declaration
//! - [`ResourceHandle`] - Reference used to read a resource's eventual outputs
//! - [`Deferred`] - A value known only after materialization
//! - [`ComponentHandle`] - Extension point of a component, open until finalize
//! - [`Plan`] - The finalized, validated graph
//!
//! # Example
//!
//! ```
//! use stratus_graph::prelude::*;
//!
//! let mut graph = ResourceGraph::new();
//! let group = graph
//!     .declare(ResourceInput::new("lab", "azure-native:resources:ResourceGroup"))
//!     .unwrap();
//! let farm = graph
//!     .declare(
//!         ResourceInput::new("plan", "azure-native:web:AppServicePlan")
//!             .property("resourceGroupName", group.output_str("name"))
//!             .parent(&group),
//!     )
//!     .unwrap();
//!
//! let plan = graph.finalize().unwrap();
//! assert_eq!(plan.children(group.id()).count(), 1);
//! assert_eq!(plan.get(farm.id()).unwrap().dependencies(), vec![group.id()]);
//! ```
//!
//! # Phases
//!
//! 1. **Declare**: resources, components and outputs are registered in one
//!    synchronous pass. Every reference is checked as it is made.
//! 2. **Finalize**: components freeze their pending settings and emit their
//!    configuration resources, then the whole graph is validated.
//! 3. **Resolve**: the engine (or the [`dev::PreviewEngine`]) materializes
//!    resources and deferred values are evaluated against the outputs.

/// Components and their extension points.
pub mod component;

/// Deferred values and their composition.
pub mod deferred;

/// Local preview engine.
pub mod dev;

/// Edge types for resource graphs.
pub mod edge;

/// Graph builder and validation.
pub mod graph;

/// Materialized resource outputs.
pub mod output;

/// Finalized plans and their serialized forms.
pub mod plan;

/// Resource property values.
pub mod property;

/// Resource identifiers, inputs and handles.
pub mod resource;

/// In-memory output store.
pub mod resolve;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::component::{
        ComponentContext, ComponentHandle, ConnectionStringKind, FinalizeContext, PendingSettings,
    };
    pub use crate::deferred::{Deferred, Dependency, OutputSource, Part, ResolveError, combine};
    pub use crate::edge::{Edge, EdgeId};
    pub use crate::graph::{DeclarationError, ResourceGraph, ValidationError};
    pub use crate::output::OutputBag;
    pub use crate::plan::{Plan, PlanDocument, ResolvedPlan};
    pub use crate::property::Property;
    pub use crate::resolve::Materialized;
    pub use crate::resource::{
        GraphId, ResourceHandle, ResourceId, ResourceInput, ResourceKind, ResourceMode,
        ResourceSpec,
    };
}

// Re-export key types at crate root for convenience
pub use component::{ComponentContext, ComponentHandle, ConnectionStringKind};
pub use deferred::{Deferred, ResolveError, combine};
pub use graph::{DeclarationError, ResourceGraph, ValidationError};
pub use output::OutputBag;
pub use plan::Plan;
pub use property::Property;
pub use resource::{ResourceHandle, ResourceId, ResourceInput, ResourceKind, ResourceMode, ResourceSpec};
