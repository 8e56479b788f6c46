//! Resource declarations.
//!
//! A resource is one vertex of the graph: a named, typed description of a
//! desired external object. Callers describe it with a [`ResourceInput`], the
//! graph stores it as a [`ResourceSpec`] and hands back a [`ResourceHandle`]
//! that later declarations use to reference its eventual outputs.

use core::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::Serialize;

use crate::deferred::{Deferred, ResolveError};
use crate::output::OutputBag;
use crate::property::Property;

// ─────────────────────────────────────────────────────────────────────────────
// Identifiers
// ─────────────────────────────────────────────────────────────────────────────

/// Identifier of a resource within its graph.
///
/// IDs are assigned in declaration order, so comparing two IDs of the same
/// graph tells which resource was declared first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceId(pub(crate) usize);

impl ResourceId {
    /// Creates a new resource ID.
    #[must_use]
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the position of the resource in declaration order.
    #[must_use]
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "res_{}", self.0)
    }
}

/// Identity of one [`ResourceGraph`](crate::ResourceGraph).
///
/// Generated with nanoid so handles and deferred values can be traced back to
/// the graph that issued them without coordination between graphs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GraphId(Arc<str>);

impl GraphId {
    /// Creates a fresh, globally unique graph ID.
    #[must_use]
    pub fn new() -> Self {
        Self(nanoid::nanoid!().into())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for GraphId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GraphId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "graph_{}", self.0)
    }
}

/// Type token of a resource, e.g. `azure-native:web:WebApp`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ResourceKind(Arc<str>);

impl ResourceKind {
    /// Creates a resource kind from its type token.
    #[must_use]
    pub fn new(token: impl Into<Arc<str>>) -> Self {
        Self(token.into())
    }

    /// Returns the full type token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the package segment of the token (before the first `:`).
    #[must_use]
    pub fn package(&self) -> &str {
        self.0.split(':').next().unwrap_or_default()
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceKind {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl From<String> for ResourceKind {
    fn from(token: String) -> Self {
        Self::new(token)
    }
}

/// How the external engine treats a declared resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceMode {
    /// A resource whose lifecycle the engine manages.
    #[default]
    Managed,
    /// A logical grouping that owns other resources and has no provider state.
    Component,
    /// A read-only lookup of something that already exists (a data source).
    Read,
}

// ─────────────────────────────────────────────────────────────────────────────
// ResourceInput
// ─────────────────────────────────────────────────────────────────────────────

/// Arguments for [`ResourceGraph::declare`](crate::ResourceGraph::declare).
///
/// # Example
///
/// ```
/// use stratus_graph::prelude::*;
///
/// let mut graph = ResourceGraph::new();
/// let group = graph
///     .declare(ResourceInput::new("lab", "azure-native:resources:ResourceGroup")
///         .property("location", "westeurope"))
///     .unwrap();
///
/// let plan = graph
///     .declare(ResourceInput::new("plan", "azure-native:web:AppServicePlan")
///         .property("resourceGroupName", group.output_str("name"))
///         .property("reserved", true)
///         .parent(&group))
///     .unwrap();
/// assert_eq!(plan.name(), "plan");
/// ```
#[derive(Debug, Clone)]
pub struct ResourceInput {
    pub(crate) name: Arc<str>,
    pub(crate) kind: ResourceKind,
    pub(crate) mode: ResourceMode,
    pub(crate) properties: IndexMap<String, Property>,
    pub(crate) parent: Option<ResourceHandle>,
    pub(crate) depends_on: Vec<ResourceHandle>,
    pub(crate) secret_properties: Vec<String>,
}

impl ResourceInput {
    /// Describes a managed resource.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>, kind: impl Into<ResourceKind>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            mode: ResourceMode::Managed,
            properties: IndexMap::new(),
            parent: None,
            depends_on: Vec::new(),
            secret_properties: Vec::new(),
        }
    }

    /// Describes a read-only lookup of an existing object.
    #[must_use]
    pub fn read(name: impl Into<Arc<str>>, kind: impl Into<ResourceKind>) -> Self {
        Self::new(name, kind).with_mode(ResourceMode::Read)
    }

    /// Describes a component resource.
    ///
    /// Usually passed to
    /// [`ResourceGraph::build_component`](crate::ResourceGraph::build_component),
    /// which forces this mode anyway.
    #[must_use]
    pub fn component(name: impl Into<Arc<str>>, kind: impl Into<ResourceKind>) -> Self {
        Self::new(name, kind).with_mode(ResourceMode::Component)
    }

    /// Sets the resource mode.
    #[must_use]
    pub fn with_mode(mut self, mode: ResourceMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets a property. A later call with the same key replaces the value.
    #[must_use]
    pub fn property(mut self, key: impl Into<String>, value: impl Into<Property>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Sets a property that must carry secret material.
    ///
    /// Declaration fails with
    /// [`DeclarationError::PlaintextSecret`](crate::DeclarationError::PlaintextSecret)
    /// unless the value contains a deferred value marked secret.
    #[must_use]
    pub fn secret(mut self, key: impl Into<String>, value: impl Into<Property>) -> Self {
        let key = key.into();
        self.properties.insert(key.clone(), value.into());
        if !self.secret_properties.contains(&key) {
            self.secret_properties.push(key);
        }
        self
    }

    /// Sets the parent resource.
    #[must_use]
    pub fn parent(mut self, parent: &ResourceHandle) -> Self {
        self.parent = Some(parent.clone());
        self
    }

    /// Adds an explicit ordering dependency on another resource.
    #[must_use]
    pub fn depends_on(mut self, resource: &ResourceHandle) -> Self {
        self.depends_on.push(resource.clone());
        self
    }

    /// Returns the logical name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the resource kind.
    #[must_use]
    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    /// Returns true if a parent was set explicitly.
    #[must_use]
    pub fn has_parent(&self) -> bool {
        self.parent.is_some()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ResourceSpec
// ─────────────────────────────────────────────────────────────────────────────

/// A declared resource, as stored in the graph and handed to the engine.
#[derive(Debug, Clone)]
pub struct ResourceSpec {
    pub(crate) id: ResourceId,
    pub(crate) name: Arc<str>,
    pub(crate) kind: ResourceKind,
    pub(crate) mode: ResourceMode,
    pub(crate) properties: IndexMap<String, Property>,
    pub(crate) parent: Option<ResourceId>,
    pub(crate) depends_on: Vec<ResourceId>,
    pub(crate) secret_properties: Vec<String>,
}

impl ResourceSpec {
    /// Returns the resource ID.
    #[must_use]
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Returns the logical name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the resource kind.
    #[must_use]
    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    /// Returns the resource mode.
    #[must_use]
    pub fn mode(&self) -> ResourceMode {
        self.mode
    }

    /// Returns the parent resource, if any.
    #[must_use]
    pub fn parent(&self) -> Option<ResourceId> {
        self.parent
    }

    /// Returns the explicit `depends_on` set.
    #[must_use]
    pub fn depends_on(&self) -> &[ResourceId] {
        &self.depends_on
    }

    /// Returns all properties in insertion order.
    #[must_use]
    pub fn properties(&self) -> &IndexMap<String, Property> {
        &self.properties
    }

    /// Returns one property.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&Property> {
        self.properties.get(key)
    }

    /// Returns the keys of properties declared secret.
    #[must_use]
    pub fn secret_properties(&self) -> &[String] {
        &self.secret_properties
    }

    /// Returns the resources this one must be ordered after: explicit
    /// `depends_on` entries plus every resource referenced by a deferred
    /// property, deduplicated and sorted. The parent is not included.
    #[must_use]
    pub fn dependencies(&self) -> Vec<ResourceId> {
        let mut ids: Vec<ResourceId> = self.depends_on.clone();
        for property in self.properties.values() {
            ids.extend(property.resource_dependencies());
        }
        ids.sort();
        ids.dedup();
        ids
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ResourceHandle
// ─────────────────────────────────────────────────────────────────────────────

/// Reference to a declared resource.
///
/// Handles are cheap to clone. Their only use is to build deferred values
/// over the resource's eventual [`OutputBag`] and to name the resource as a
/// parent or dependency.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceHandle {
    pub(crate) graph: GraphId,
    pub(crate) id: ResourceId,
    pub(crate) name: Arc<str>,
    pub(crate) kind: ResourceKind,
    pub(crate) mode: ResourceMode,
}

impl ResourceHandle {
    /// Returns the resource ID.
    #[must_use]
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Returns the graph that issued this handle.
    #[must_use]
    pub fn graph(&self) -> &GraphId {
        &self.graph
    }

    /// Returns the logical name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the resource kind.
    #[must_use]
    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    /// Returns the resource mode.
    #[must_use]
    pub fn mode(&self) -> ResourceMode {
        self.mode
    }

    /// Defers a projection over this resource's outputs.
    ///
    /// The projector runs only when the value is resolved against
    /// materialized outputs.
    #[must_use]
    pub fn defer<T, F>(&self, projector: F) -> Deferred<T>
    where
        T: 'static,
        F: Fn(&OutputBag) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        Deferred::from_resource(self, projector)
    }

    /// Defers one output field as a raw JSON value.
    #[must_use]
    pub fn output(&self, field: impl Into<String>) -> Deferred<serde_json::Value> {
        let field = field.into();
        self.defer(move |bag| bag.field(&field).cloned())
    }

    /// Defers one string output field.
    #[must_use]
    pub fn output_str(&self, field: impl Into<String>) -> Deferred<String> {
        let field = field.into();
        self.defer(move |bag| bag.str(&field).map(str::to_owned))
    }

    /// Defers a nested output addressed by a JSON pointer such as
    /// `/identity/principalId`.
    #[must_use]
    pub fn output_at(&self, pointer: impl Into<String>) -> Deferred<serde_json::Value> {
        let pointer = pointer.into();
        self.defer(move |bag| bag.pointer(&pointer).cloned())
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}' ({})", self.kind, self.name, self.id)
    }
}
