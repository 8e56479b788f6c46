//! Component trait for defining reusable resource groupings.
//!
//! The `Component` trait encapsulates a group of resources as a reusable,
//! parameterized unit. A component declares its resources into a
//! [`ComponentContext`], may register finalizers that emit configuration
//! resources once its settings are frozen, and returns typed outputs for the
//! code that declared it.
//!
//! # Architecture
//!
//! - **`stratus_graph`**: Core graph primitives (`ResourceGraph`, `Deferred`, `Plan`)
//! - **`stratus_component`**: Component pattern definition (this crate)
//! - **Stack programs**: Concrete components and the stacks that use them
//!
//! # Example
//!
//! ```
//! use stratus_component::{Component, ComponentExt};
//! use stratus_graph::prelude::*;
//!
//! struct StaticSite {
//!     index: String,
//! }
//!
//! impl Component for StaticSite {
//!     type Outputs = Deferred<String>;
//!
//!     fn build(&self, ctx: &mut ComponentContext<'_>) -> Result<Self::Outputs, DeclarationError> {
//!         let bucket = ctx.declare(
//!             ResourceInput::new("bucket", "aws:s3:Bucket").property("index", self.index.as_str()),
//!         )?;
//!         Ok(bucket.output_str("websiteEndpoint"))
//!     }
//! }
//!
//! let site = StaticSite { index: "index.html".into() };
//! let (graph, (_handle, endpoint)) = site.to_graph("site").unwrap();
//! assert_eq!(graph.len(), 2);
//! assert_eq!(endpoint.dependencies().len(), 1);
//! ```

use stratus_graph::component::{ComponentContext, ComponentHandle};
use stratus_graph::graph::{DeclarationError, ResourceGraph};
use stratus_graph::resource::{ResourceHandle, ResourceInput, ResourceKind};

/// Defines a reusable group of resources.
///
/// # Design Notes
///
/// - Components are **builders**, not provisioners. They describe resources
///   that an external engine will create.
/// - Configuration lives in the implementing type; `build` reads it through
///   `&self`, so one value can be declared several times under different
///   names.
/// - Tier-style toggles should be computed from `&self` inside `build`, once
///   per declaration.
pub trait Component: Send + Sync + 'static {
    /// Values handed back to the declaring code.
    type Outputs;

    /// Declares the component's resources.
    ///
    /// Resources declared through `ctx` default to the component as parent.
    fn build(&self, ctx: &mut ComponentContext<'_>) -> Result<Self::Outputs, DeclarationError>;

    /// Returns the type token of the component resource.
    ///
    /// Defaults to the type name.
    fn kind(&self) -> ResourceKind {
        ResourceKind::new(core::any::type_name::<Self>())
    }
}

/// Extension trait for declaring components.
pub trait ComponentExt: Component {
    /// Declares the component in a graph, optionally under a parent.
    fn declare_in(
        &self,
        graph: &mut ResourceGraph,
        name: &str,
        parent: Option<&ResourceHandle>,
    ) -> Result<(ComponentHandle, Self::Outputs), DeclarationError> {
        let mut input = ResourceInput::component(name, self.kind());
        if let Some(parent) = parent {
            input = input.parent(parent);
        }
        graph.build_component(input, |ctx| self.build(ctx))
    }

    /// Declares the component inside another component.
    fn declare_nested(
        &self,
        ctx: &mut ComponentContext<'_>,
        name: &str,
    ) -> Result<(ComponentHandle, Self::Outputs), DeclarationError> {
        ctx.build_component(ResourceInput::component(name, self.kind()), |inner| {
            self.build(inner)
        })
    }

    /// Builds and returns a fresh graph holding only this component.
    ///
    /// Convenience method for tests and previews.
    fn to_graph(
        &self,
        name: &str,
    ) -> Result<(ResourceGraph, (ComponentHandle, Self::Outputs)), DeclarationError> {
        let mut graph = ResourceGraph::new();
        let declared = self.declare_in(&mut graph, name, None)?;
        Ok((graph, declared))
    }
}

// Blanket implementation for all components
impl<T: Component> ComponentExt for T {}

#[cfg(test)]
mod tests {
    use super::*;
    use stratus_graph::dev::PreviewEngine;
    use stratus_graph::prelude::*;

    struct Pair {
        settings: bool,
    }

    impl Component for Pair {
        type Outputs = (ResourceHandle, ResourceHandle);

        fn build(&self, ctx: &mut ComponentContext<'_>) -> Result<Self::Outputs, DeclarationError> {
            let first = ctx.declare(ResourceInput::new("first", "test:pair:Item"))?;
            let second = ctx.declare(
                ResourceInput::new("second", "test:pair:Item")
                    .property("peer", first.output_str("name")),
            )?;
            if self.settings {
                ctx.add_setting("PEER", second.output_str("name"))?;
                let owner = second.clone();
                ctx.on_finalize(move |fin| {
                    let settings = fin.pending().settings_property();
                    fin.declare(
                        ResourceInput::new("settings", "test:pair:Settings")
                            .property("properties", settings)
                            .parent(&owner),
                    )?;
                    Ok(())
                });
            }
            Ok((first, second))
        }

        fn kind(&self) -> ResourceKind {
            "test:pair:Pair".into()
        }
    }

    struct Unnamed;

    impl Component for Unnamed {
        type Outputs = ();

        fn build(&self, _ctx: &mut ComponentContext<'_>) -> Result<(), DeclarationError> {
            Ok(())
        }
    }

    #[test]
    fn component_builds_graph() {
        let (graph, (handle, (first, second))) = Pair { settings: false }.to_graph("pair").unwrap();

        assert_eq!(graph.len(), 3);
        assert_eq!(handle.resource().kind().as_str(), "test:pair:Pair");
        assert_eq!(graph.get(first.id()).unwrap().parent(), Some(handle.id()));
        assert_eq!(graph.get(second.id()).unwrap().dependencies(), vec![first.id()]);
    }

    #[test]
    fn component_default_kind() {
        assert!(Unnamed.kind().as_str().contains("Unnamed"));
    }

    #[test]
    fn same_component_declared_twice() {
        let pair = Pair { settings: true };
        let mut graph = ResourceGraph::new();
        let root = graph
            .declare(ResourceInput::new("root", "test:pair:Root"))
            .unwrap();

        pair.declare_in(&mut graph, "a", Some(&root)).unwrap();
        pair.declare_in(&mut graph, "b", Some(&root)).unwrap();
        let err = pair.declare_in(&mut graph, "a", Some(&root)).unwrap_err();
        assert!(matches!(err, DeclarationError::DuplicateName { .. }));

        let plan = graph.finalize().unwrap();
        assert_eq!(plan.by_kind("test:pair:Settings").count(), 2);
    }

    #[test]
    fn nested_declaration() {
        struct Outer;

        impl Component for Outer {
            type Outputs = ComponentHandle;

            fn build(&self, ctx: &mut ComponentContext<'_>) -> Result<ComponentHandle, DeclarationError> {
                let (inner, _) = Pair { settings: true }.declare_nested(ctx, "inner")?;
                Ok(inner)
            }
        }

        let (graph, (outer, inner)) = Outer.to_graph("outer").unwrap();
        assert_eq!(graph.get(inner.id()).unwrap().parent(), Some(outer.id()));

        inner.add_setting("EXTRA", "1").unwrap();
        let plan = graph.finalize().unwrap();
        assert!(inner.add_setting("LATE", "1").is_err());

        let (_, resolved) = PreviewEngine::new().preview(&plan).unwrap();
        let settings = resolved.resource("settings").unwrap();
        assert_eq!(
            settings.properties["properties"],
            serde_json::json!({ "PEER": "second", "EXTRA": "1" })
        );
    }
}
