//! Resource graph builder.
//!
//! [`ResourceGraph`] collects resource declarations in program order, checks
//! each one as it arrives, and produces a [`Plan`] for the external engine.
//!
//! Declaration is a single synchronous pass. Handles are only returned by
//! [`ResourceGraph::declare`], so any value built from a handle can only
//! reference a resource declared earlier; the graph still verifies this,
//! together with handle ownership, on every declaration.

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use hashbrown::HashSet;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::component::{ComponentContext, ComponentHandle, FinalizeContext, Finalizer};
use crate::deferred::{Deferred, Dependency, ResolveError};
use crate::edge::{DependsOnEdge, Edge, EdgeId, ParentEdge, ReferenceEdge};
use crate::output::OutputBag;
use crate::plan::Plan;
use crate::property::Property;
use crate::resource::{
    GraphId, ResourceHandle, ResourceId, ResourceInput, ResourceMode, ResourceSpec,
};

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Errors raised while declaring resources.
///
/// All of these indicate a mistake in the declaring program rather than a
/// runtime condition.
#[derive(Debug, thiserror::Error)]
pub enum DeclarationError {
    /// A resource with the same name already exists in the parent scope.
    #[error("duplicate resource name '{name}' in scope {scope}")]
    DuplicateName {
        /// Parent scope (`<root>` at the top level).
        scope: String,
        /// The colliding name.
        name: String,
    },
    /// A value references a resource that is not declared yet.
    #[error("resource '{resource}' references {dependency}, which is not declared yet")]
    ForwardReference {
        /// The declaring resource or output.
        resource: String,
        /// The missing resource.
        dependency: ResourceId,
    },
    /// A handle or deferred value belongs to another graph.
    #[error("{handle} belongs to {graph}, not to this graph")]
    ForeignHandle {
        /// Description of the offending reference.
        handle: String,
        /// The graph that issued it.
        graph: GraphId,
    },
    /// A component's settings were changed after it finalized.
    #[error("component '{component}' is already finalized")]
    ComponentFinalized {
        /// Component name.
        component: String,
    },
    /// A property declared secret holds a plain value.
    #[error("property '{property}' of '{resource}' must be a secret value")]
    PlaintextSecret {
        /// Resource or component name.
        resource: String,
        /// Property or setting key.
        property: String,
    },
    /// A stack output with the same name was already exported.
    #[error("output '{0}' is already exported")]
    DuplicateOutput(String),
    /// Structural validation failed.
    #[error("graph validation failed: {}", format_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A structural problem in a resource graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Two resources share a name in one parent scope.
    DuplicateName {
        /// Parent of the scope, `None` at the top level.
        scope: Option<ResourceId>,
        /// The shared name.
        name: String,
    },
    /// A resource's parent does not exist.
    MissingParent {
        /// The child.
        resource: ResourceId,
        /// The missing parent.
        parent: ResourceId,
    },
    /// A resource's parent was declared after it.
    ParentDeclaredLater {
        /// The child.
        resource: ResourceId,
        /// The parent.
        parent: ResourceId,
    },
    /// A resource depends on one declared after it.
    ForwardReference {
        /// The dependent resource.
        resource: ResourceId,
        /// The later resource.
        dependency: ResourceId,
    },
    /// An edge names a resource that does not exist.
    DanglingEdge {
        /// The edge.
        edge: EdgeId,
        /// The unknown resource.
        resource: ResourceId,
    },
    /// A stack output reads a resource that does not exist.
    DanglingOutput {
        /// Output name.
        output: String,
        /// The unknown resource.
        resource: ResourceId,
    },
    /// A read-only lookup owns children.
    ReadResourceAsParent {
        /// The child.
        resource: ResourceId,
        /// The read-only parent.
        parent: ResourceId,
    },
    /// The dependency relation contains a cycle.
    Cycle {
        /// Resources on or behind the cycle.
        resources: Vec<ResourceId>,
    },
}

impl core::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ValidationError::DuplicateName { scope, name } => match scope {
                Some(parent) => write!(f, "duplicate resource name '{name}' under {parent}"),
                None => write!(f, "duplicate resource name '{name}' at the top level"),
            },
            ValidationError::MissingParent { resource, parent } => {
                write!(f, "resource {resource} has unknown parent {parent}")
            }
            ValidationError::ParentDeclaredLater { resource, parent } => {
                write!(f, "resource {resource} is declared before its parent {parent}")
            }
            ValidationError::ForwardReference {
                resource,
                dependency,
            } => {
                write!(
                    f,
                    "resource {resource} depends on {dependency}, which is declared later"
                )
            }
            ValidationError::DanglingEdge { edge, resource } => {
                write!(f, "edge {edge} references unknown resource {resource}")
            }
            ValidationError::DanglingOutput { output, resource } => {
                write!(f, "output '{output}' reads unknown resource {resource}")
            }
            ValidationError::ReadResourceAsParent { resource, parent } => {
                write!(
                    f,
                    "resource {resource} is parented to read-only resource {parent}"
                )
            }
            ValidationError::Cycle { resources } => {
                let list = resources
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "dependency cycle among resources: {list}")
            }
        }
    }
}

impl core::error::Error for ValidationError {}

// ─────────────────────────────────────────────────────────────────────────────
// ResourceGraph
// ─────────────────────────────────────────────────────────────────────────────

struct ComponentEntry {
    handle: ComponentHandle,
    finalizers: Vec<Finalizer>,
}

#[derive(Debug, Clone, Copy)]
struct Checkpoint {
    resources: usize,
    edges: usize,
    components: usize,
}

/// Builder for a declarative resource graph.
///
/// # Example
///
/// ```
/// use stratus_graph::prelude::*;
///
/// let mut graph = ResourceGraph::new();
/// let group = graph
///     .declare(ResourceInput::new("lab", "azure-native:resources:ResourceGroup"))
///     .unwrap();
/// let (site, host) = graph
///     .build_component(
///         ResourceInput::component("site", "example:Site").parent(&group),
///         |ctx| {
///             let app = ctx.declare(ResourceInput::new("app", "azure-native:web:WebApp"))?;
///             ctx.add_setting("MODE", "recommended")?;
///             let settings = app.clone();
///             ctx.on_finalize(move |fin| {
///                 let map = fin.pending().settings_property();
///                 fin.declare(
///                     ResourceInput::new("settings", "azure-native:web:WebAppApplicationSettings")
///                         .property("properties", map)
///                         .parent(&settings),
///                 )?;
///                 Ok(())
///             });
///             Ok(app.output_str("defaultHostName"))
///         },
///     )
///     .unwrap();
///
/// site.add_setting("EXTRA", "1").unwrap();
/// graph
///     .export("url", combine(["https://".into(), host.into(), "/".into()]))
///     .unwrap();
///
/// let plan = graph.finalize().unwrap();
/// assert_eq!(plan.len(), 4);
/// assert!(site.add_setting("LATE", "2").is_err());
/// ```
pub struct ResourceGraph {
    id: GraphId,
    resources: Vec<ResourceSpec>,
    edges: Vec<Edge>,
    scopes: HashSet<(Option<ResourceId>, Arc<str>)>,
    components: Vec<ComponentEntry>,
    outputs: IndexMap<String, Deferred<Value>>,
}

impl Default for ResourceGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceGraph {
    /// Creates an empty graph with a fresh identity.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: GraphId::new(),
            resources: Vec::new(),
            edges: Vec::new(),
            scopes: HashSet::new(),
            components: Vec::new(),
            outputs: IndexMap::new(),
        }
    }

    /// Returns the graph's identity.
    #[must_use]
    pub fn id(&self) -> &GraphId {
        &self.id
    }

    /// Returns all declared resources in declaration order.
    #[must_use]
    pub fn resources(&self) -> &[ResourceSpec] {
        &self.resources
    }

    /// Returns all edges.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Returns a resource by ID.
    #[must_use]
    pub fn get(&self, id: ResourceId) -> Option<&ResourceSpec> {
        self.resources.get(id.0)
    }

    /// Returns the number of declared resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns true if nothing has been declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Returns the number of components awaiting finalization.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Returns the names of the exported outputs.
    pub fn output_names(&self) -> impl Iterator<Item = &str> {
        self.outputs.keys().map(String::as_str)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Declaration
    // ─────────────────────────────────────────────────────────────────────────

    /// Registers a resource.
    ///
    /// # Errors
    ///
    /// - [`DeclarationError::ForeignHandle`] if the parent, a `depends_on`
    ///   entry or a deferred property belongs to another graph.
    /// - [`DeclarationError::ForwardReference`] if any of them names a
    ///   resource that is not declared yet.
    /// - [`DeclarationError::PlaintextSecret`] if a property added with
    ///   [`ResourceInput::secret`] holds no secret value.
    /// - [`DeclarationError::DuplicateName`] if the name is taken in the
    ///   parent scope.
    /// - [`DeclarationError::Invalid`] if the parent is a read-only lookup.
    pub fn declare(&mut self, input: ResourceInput) -> Result<ResourceHandle, DeclarationError> {
        let ResourceInput {
            name,
            kind,
            mode,
            properties,
            parent,
            depends_on,
            mut secret_properties,
        } = input;
        let id = ResourceId(self.resources.len());

        let parent = match &parent {
            Some(handle) => {
                let parent_id = self.check_handle(handle, &name)?;
                if handle.mode() == ResourceMode::Read {
                    return Err(DeclarationError::Invalid(vec![
                        ValidationError::ReadResourceAsParent {
                            resource: id,
                            parent: parent_id,
                        },
                    ]));
                }
                Some(parent_id)
            }
            None => None,
        };

        let mut explicit = Vec::with_capacity(depends_on.len());
        for handle in &depends_on {
            let dep = self.check_handle(handle, &name)?;
            if !explicit.contains(&dep) {
                explicit.push(dep);
            }
        }

        let mut references: Vec<(String, ResourceId)> = Vec::new();
        for (key, property) in &properties {
            for dependency in property.dependencies() {
                if let Some(dep) = self.check_dependency(&dependency, &name)? {
                    references.push((key.clone(), dep));
                }
            }
        }

        for key in &secret_properties {
            if !properties.get(key).is_some_and(Property::is_secret) {
                return Err(DeclarationError::PlaintextSecret {
                    resource: name.to_string(),
                    property: key.clone(),
                });
            }
        }
        for (key, property) in &properties {
            if property.is_secret() && !secret_properties.contains(key) {
                secret_properties.push(key.clone());
            }
        }

        if !self.scopes.insert((parent, Arc::clone(&name))) {
            return Err(DeclarationError::DuplicateName {
                scope: self.scope_label(parent),
                name: name.to_string(),
            });
        }

        if let Some(parent) = parent {
            self.edges.push(Edge::Parent(ParentEdge::new(id, parent)));
        }
        for dep in &explicit {
            self.edges.push(Edge::DependsOn(DependsOnEdge::new(id, *dep)));
        }
        for (key, dep) in references {
            self.edges
                .push(Edge::Reference(ReferenceEdge::new(id, dep, key)));
        }

        tracing::debug!(
            resource = %id,
            name = %name,
            kind = %kind,
            mode = ?mode,
            parent = ?parent,
            "declared resource"
        );

        let handle = ResourceHandle {
            graph: self.id.clone(),
            id,
            name: Arc::clone(&name),
            kind: kind.clone(),
            mode,
        };
        self.resources.push(ResourceSpec {
            id,
            name,
            kind,
            mode,
            properties,
            parent,
            depends_on: explicit,
            secret_properties,
        });
        Ok(handle)
    }

    /// Defers a projection over a declared resource's outputs.
    ///
    /// The projector is not invoked here.
    pub fn defer_from<T, F>(
        &self,
        handle: &ResourceHandle,
        projector: F,
    ) -> Result<Deferred<T>, DeclarationError>
    where
        T: 'static,
        F: Fn(&OutputBag) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        self.check_handle(handle, "defer_from")?;
        Ok(handle.defer(projector))
    }

    /// Declares a component and runs its factory in a nested scope.
    ///
    /// The component's resource is declared with mode
    /// [`ResourceMode::Component`]. Resources declared through the context
    /// default to the component as parent. Components finalize in the order
    /// they were declared.
    ///
    /// If the factory fails, every resource, edge and nested component
    /// declared since the call is discarded and the error is returned.
    pub fn build_component<O, F>(
        &mut self,
        input: ResourceInput,
        factory: F,
    ) -> Result<(ComponentHandle, O), DeclarationError>
    where
        F: FnOnce(&mut ComponentContext<'_>) -> Result<O, DeclarationError>,
    {
        let checkpoint = self.checkpoint();
        let resource = self.declare(input.with_mode(ResourceMode::Component))?;
        let handle = ComponentHandle::new(resource);

        let slot = self.components.len();
        self.components.push(ComponentEntry {
            handle: handle.clone(),
            finalizers: Vec::new(),
        });

        let mut ctx = ComponentContext::new(self, handle.clone());
        let result = factory(&mut ctx);
        let finalizers = ctx.into_finalizers();
        match result {
            Ok(outputs) => {
                self.components[slot].finalizers = finalizers;
                tracing::debug!(component = %handle.name(), "built component");
                Ok((handle, outputs))
            }
            Err(err) => {
                let discarded = self.resources.len() - checkpoint.resources;
                self.rollback(checkpoint);
                tracing::debug!(
                    component = %handle.name(),
                    discarded,
                    error = %err,
                    "component factory failed, declarations rolled back"
                );
                Err(err)
            }
        }
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            resources: self.resources.len(),
            edges: self.edges.len(),
            components: self.components.len(),
        }
    }

    /// Drops everything declared since `checkpoint`.
    fn rollback(&mut self, checkpoint: Checkpoint) {
        for spec in self.resources.drain(checkpoint.resources..) {
            self.scopes.remove(&(spec.parent, spec.name));
        }
        self.edges.truncate(checkpoint.edges);
        self.components.truncate(checkpoint.components);
    }

    /// Registers a named stack output.
    pub fn export<T>(
        &mut self,
        name: impl Into<String>,
        value: Deferred<T>,
    ) -> Result<(), DeclarationError>
    where
        T: Serialize + 'static,
    {
        let name = name.into();
        if self.outputs.contains_key(&name) {
            return Err(DeclarationError::DuplicateOutput(name));
        }
        for dependency in value.dependencies() {
            self.check_dependency(dependency, &name)?;
        }
        tracing::debug!(output = %name, "exported output");
        self.outputs.insert(name, value.into_value());
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Finalization
    // ─────────────────────────────────────────────────────────────────────────

    /// Finalizes every component, validates the graph and returns the plan.
    ///
    /// Components are processed in declaration order: each one's pending maps
    /// are frozen, then its finalizers run and may declare further
    /// resources.
    pub fn finalize(mut self) -> Result<Plan, DeclarationError> {
        let mut index = 0;
        while index < self.components.len() {
            let handle = self.components[index].handle.clone();
            let finalizers = core::mem::take(&mut self.components[index].finalizers);
            let pending = handle.freeze();
            let count = finalizers.len();

            let mut ctx = FinalizeContext::new(&mut self, handle.resource().clone(), pending);
            for finalizer in finalizers {
                finalizer(&mut ctx)?;
            }
            tracing::debug!(
                component = %handle.name(),
                finalizers = count,
                "finalized component"
            );
            index += 1;
        }

        self.validate().map_err(DeclarationError::Invalid)?;

        tracing::info!(
            graph = %self.id,
            resources = self.resources.len(),
            edges = self.edges.len(),
            outputs = self.outputs.len(),
            "finalized resource graph"
        );

        Ok(Plan::new(self.id, self.resources, self.edges, self.outputs))
    }

    /// Checks the graph's structure.
    ///
    /// Verifies that names are unique per scope, parents exist, precede their
    /// children and are not read-only, dependencies precede dependents,
    /// edges and outputs reference known resources, and the dependency
    /// relation is acyclic.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        let count = self.resources.len();

        let mut seen: HashSet<(Option<ResourceId>, &str)> = HashSet::new();
        for spec in &self.resources {
            if !seen.insert((spec.parent, spec.name())) {
                errors.push(ValidationError::DuplicateName {
                    scope: spec.parent,
                    name: spec.name().to_owned(),
                });
            }

            if let Some(parent) = spec.parent {
                match self.resources.get(parent.0) {
                    None => errors.push(ValidationError::MissingParent {
                        resource: spec.id,
                        parent,
                    }),
                    Some(owner) => {
                        if parent >= spec.id {
                            errors.push(ValidationError::ParentDeclaredLater {
                                resource: spec.id,
                                parent,
                            });
                        }
                        if owner.mode == ResourceMode::Read {
                            errors.push(ValidationError::ReadResourceAsParent {
                                resource: spec.id,
                                parent,
                            });
                        }
                    }
                }
            }

            for dependency in spec.dependencies() {
                if dependency >= spec.id {
                    errors.push(ValidationError::ForwardReference {
                        resource: spec.id,
                        dependency,
                    });
                }
            }
        }

        for edge in &self.edges {
            for endpoint in [edge.from(), edge.to()] {
                if endpoint.0 >= count {
                    errors.push(ValidationError::DanglingEdge {
                        edge: edge.id(),
                        resource: endpoint,
                    });
                }
            }
        }

        for (name, value) in &self.outputs {
            for resource in value.resource_dependencies() {
                if resource.0 >= count {
                    errors.push(ValidationError::DanglingOutput {
                        output: name.clone(),
                        resource,
                    });
                }
            }
        }

        if let Some(resources) = self.find_cycle() {
            errors.push(ValidationError::Cycle { resources });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Kahn's algorithm over the edge set. Returns the resources that could
    /// not be ordered, if any.
    fn find_cycle(&self) -> Option<Vec<ResourceId>> {
        let count = self.resources.len();
        let mut pending = vec![0_usize; count];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); count];

        let mut pairs = BTreeSet::new();
        for edge in &self.edges {
            let (from, to) = (edge.from().0, edge.to().0);
            if from < count && to < count {
                pairs.insert((from, to));
            }
        }
        for (from, to) in pairs {
            pending[from] += 1;
            dependents[to].push(from);
        }

        let mut queue: VecDeque<usize> = (0..count).filter(|&i| pending[i] == 0).collect();
        let mut ordered = 0;
        while let Some(node) = queue.pop_front() {
            ordered += 1;
            for &dependent in &dependents[node] {
                pending[dependent] -= 1;
                if pending[dependent] == 0 {
                    queue.push_back(dependent);
                }
            }
        }

        (ordered < count).then(|| {
            (0..count)
                .filter(|&i| pending[i] > 0)
                .map(ResourceId)
                .collect()
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────

    fn check_handle(
        &self,
        handle: &ResourceHandle,
        declaring: &str,
    ) -> Result<ResourceId, DeclarationError> {
        if handle.graph != self.id {
            return Err(DeclarationError::ForeignHandle {
                handle: handle.to_string(),
                graph: handle.graph.clone(),
            });
        }
        if handle.id.0 >= self.resources.len() {
            return Err(DeclarationError::ForwardReference {
                resource: declaring.to_owned(),
                dependency: handle.id,
            });
        }
        Ok(handle.id)
    }

    fn check_dependency(
        &self,
        dependency: &Dependency,
        declaring: &str,
    ) -> Result<Option<ResourceId>, DeclarationError> {
        match dependency {
            Dependency::Resource { graph, id } => {
                if *graph != self.id {
                    return Err(DeclarationError::ForeignHandle {
                        handle: format!("deferred value over {id}"),
                        graph: graph.clone(),
                    });
                }
                if id.0 >= self.resources.len() {
                    return Err(DeclarationError::ForwardReference {
                        resource: declaring.to_owned(),
                        dependency: *id,
                    });
                }
                Ok(Some(*id))
            }
            Dependency::Secret(_) => Ok(None),
        }
    }

    fn scope_label(&self, parent: Option<ResourceId>) -> String {
        match parent.and_then(|id| self.get(id)) {
            Some(spec) => format!("'{}' ({})", spec.name(), spec.id),
            None => "<root>".to_owned(),
        }
    }
}

impl core::fmt::Debug for ResourceGraph {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ResourceGraph")
            .field("id", &self.id)
            .field("resources", &self.resources.len())
            .field("edges", &self.edges.len())
            .field("components", &self.components.len())
            .field("outputs", &self.outputs.keys().collect::<Vec<_>>())
            .finish()
    }
}
