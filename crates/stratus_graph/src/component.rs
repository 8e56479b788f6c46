//! Components: resource groupings with an open/finalized lifecycle.
//!
//! A component is a resource of mode [`Component`](crate::ResourceMode::Component)
//! that owns other resources and exposes an extension point: a map of pending
//! application settings and connection strings. Code inside or outside the
//! component may append to it through a [`ComponentHandle`] until the graph
//! finalizes the component. Finalization freezes the maps and runs the
//! component's finalizers, which declare the configuration-bearing resources
//! from the latest state.

use core::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use crate::deferred::Dependency;
use crate::graph::{DeclarationError, ResourceGraph};
use crate::property::Property;
use crate::resource::{ResourceHandle, ResourceId, ResourceInput};

// ─────────────────────────────────────────────────────────────────────────────
// Pending settings
// ─────────────────────────────────────────────────────────────────────────────

/// Type of a connection string, as understood by the hosting platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConnectionStringKind {
    /// MySQL.
    MySql,
    /// SQL Server.
    #[serde(rename = "SQLServer")]
    SqlServer,
    /// Azure SQL Database.
    #[serde(rename = "SQLAzure")]
    SqlAzure,
    /// Anything else.
    Custom,
    /// Notification hub.
    NotificationHub,
    /// Service bus.
    ServiceBus,
    /// Event hub.
    EventHub,
    /// API hub.
    ApiHub,
    /// Document database.
    DocDb,
    /// Redis cache.
    RedisCache,
    /// PostgreSQL.
    #[serde(rename = "PostgreSQL")]
    PostgreSql,
}

impl ConnectionStringKind {
    /// Returns the platform's name for the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionStringKind::MySql => "MySql",
            ConnectionStringKind::SqlServer => "SQLServer",
            ConnectionStringKind::SqlAzure => "SQLAzure",
            ConnectionStringKind::Custom => "Custom",
            ConnectionStringKind::NotificationHub => "NotificationHub",
            ConnectionStringKind::ServiceBus => "ServiceBus",
            ConnectionStringKind::EventHub => "EventHub",
            ConnectionStringKind::ApiHub => "ApiHub",
            ConnectionStringKind::DocDb => "DocDb",
            ConnectionStringKind::RedisCache => "RedisCache",
            ConnectionStringKind::PostgreSql => "PostgreSQL",
        }
    }
}

impl fmt::Display for ConnectionStringKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One pending connection string.
#[derive(Debug, Clone)]
pub struct ConnectionString {
    /// Connection string type.
    pub kind: ConnectionStringKind,
    /// The connection string itself.
    pub value: Property,
}

/// Settings accumulated by a component before it finalizes.
///
/// Keys keep insertion order. Adding a key twice replaces the earlier value.
#[derive(Debug, Clone, Default)]
pub struct PendingSettings {
    settings: IndexMap<String, Property>,
    connection_strings: IndexMap<String, ConnectionString>,
}

impl PendingSettings {
    /// Returns the application settings.
    #[must_use]
    pub fn settings(&self) -> &IndexMap<String, Property> {
        &self.settings
    }

    /// Returns the connection strings.
    #[must_use]
    pub fn connection_strings(&self) -> &IndexMap<String, ConnectionString> {
        &self.connection_strings
    }

    /// Returns true if nothing was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.settings.is_empty() && self.connection_strings.is_empty()
    }

    /// Renders the settings as one object property.
    #[must_use]
    pub fn settings_property(&self) -> Property {
        Property::Object(self.settings.clone())
    }

    /// Renders the connection strings as one object property of the form
    /// `{ name: { "type": kind, "value": value } }`.
    #[must_use]
    pub fn connection_strings_property(&self) -> Property {
        Property::Object(
            self.connection_strings
                .iter()
                .map(|(name, conn)| {
                    let entry = Property::object([
                        ("type", Property::Value(Value::from(conn.kind.as_str()))),
                        ("value", conn.value.clone()),
                    ]);
                    (name.clone(), entry)
                })
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Open,
    Finalized,
}

#[derive(Debug)]
struct ComponentState {
    phase: Phase,
    pending: PendingSettings,
}

// ─────────────────────────────────────────────────────────────────────────────
// ComponentHandle
// ─────────────────────────────────────────────────────────────────────────────

/// Shared handle to a component's extension point.
///
/// Clones share the same pending maps. Every `add_*` call fails with
/// [`DeclarationError::ComponentFinalized`] once the graph has finalized the
/// component.
#[derive(Clone)]
pub struct ComponentHandle {
    resource: ResourceHandle,
    state: Arc<Mutex<ComponentState>>,
}

impl ComponentHandle {
    pub(crate) fn new(resource: ResourceHandle) -> Self {
        Self {
            resource,
            state: Arc::new(Mutex::new(ComponentState {
                phase: Phase::Open,
                pending: PendingSettings::default(),
            })),
        }
    }

    /// Returns the component's own resource.
    #[must_use]
    pub fn resource(&self) -> &ResourceHandle {
        &self.resource
    }

    /// Returns the component's resource ID.
    #[must_use]
    pub fn id(&self) -> ResourceId {
        self.resource.id()
    }

    /// Returns the component's logical name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.resource.name()
    }

    /// Returns true once the component has been finalized.
    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.state.lock().phase == Phase::Finalized
    }

    /// Returns a copy of the current pending settings.
    #[must_use]
    pub fn pending(&self) -> PendingSettings {
        self.state.lock().pending.clone()
    }

    /// Adds an application setting.
    ///
    /// Fails with [`DeclarationError::ForeignHandle`] if the value reads a
    /// resource of another graph, and with
    /// [`DeclarationError::ComponentFinalized`] once the component froze.
    pub fn add_setting(
        &self,
        key: impl Into<String>,
        value: impl Into<Property>,
    ) -> Result<(), DeclarationError> {
        let key = key.into();
        let value = value.into();
        self.check_graph(&value)?;
        self.with_open(|pending| {
            pending.settings.insert(key, value);
        })
    }

    /// Adds an application setting whose value must be secret.
    pub fn add_secret_setting(
        &self,
        key: impl Into<String>,
        value: impl Into<Property>,
    ) -> Result<(), DeclarationError> {
        let key = key.into();
        let value = value.into();
        if !value.is_secret() {
            return Err(DeclarationError::PlaintextSecret {
                resource: self.name().to_owned(),
                property: key,
            });
        }
        self.add_setting(key, value)
    }

    /// Adds a connection string. Fails like [`ComponentHandle::add_setting`].
    pub fn add_connection_string(
        &self,
        name: impl Into<String>,
        kind: ConnectionStringKind,
        value: impl Into<Property>,
    ) -> Result<(), DeclarationError> {
        let name = name.into();
        let value = value.into();
        self.check_graph(&value)?;
        self.with_open(|pending| {
            pending
                .connection_strings
                .insert(name, ConnectionString { kind, value });
        })
    }

    fn check_graph(&self, value: &Property) -> Result<(), DeclarationError> {
        for dependency in value.dependencies() {
            if let Dependency::Resource { graph, id } = &dependency
                && graph != self.resource.graph()
            {
                return Err(DeclarationError::ForeignHandle {
                    handle: format!("deferred value over {id}"),
                    graph: graph.clone(),
                });
            }
        }
        Ok(())
    }

    fn with_open(&self, f: impl FnOnce(&mut PendingSettings)) -> Result<(), DeclarationError> {
        let mut state = self.state.lock();
        if state.phase == Phase::Finalized {
            return Err(DeclarationError::ComponentFinalized {
                component: self.name().to_owned(),
            });
        }
        f(&mut state.pending);
        Ok(())
    }

    /// Closes the extension point and returns its final contents.
    pub(crate) fn freeze(&self) -> PendingSettings {
        let mut state = self.state.lock();
        state.phase = Phase::Finalized;
        state.pending.clone()
    }
}

impl fmt::Debug for ComponentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ComponentHandle")
            .field("resource", &self.resource)
            .field("phase", &state.phase)
            .field("settings", &state.pending.settings.len())
            .field("connection_strings", &state.pending.connection_strings.len())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Contexts
// ─────────────────────────────────────────────────────────────────────────────

/// Deferred work run when a component finalizes.
pub type Finalizer =
    Box<dyn FnOnce(&mut FinalizeContext<'_>) -> Result<(), DeclarationError> + Send>;

/// Scope handed to a component factory.
///
/// Resources declared here default to the component as their parent.
pub struct ComponentContext<'g> {
    graph: &'g mut ResourceGraph,
    handle: ComponentHandle,
    finalizers: Vec<Finalizer>,
}

impl<'g> ComponentContext<'g> {
    pub(crate) fn new(graph: &'g mut ResourceGraph, handle: ComponentHandle) -> Self {
        Self {
            graph,
            handle,
            finalizers: Vec::new(),
        }
    }

    pub(crate) fn into_finalizers(self) -> Vec<Finalizer> {
        self.finalizers
    }

    /// Returns the component being built.
    #[must_use]
    pub fn handle(&self) -> &ComponentHandle {
        &self.handle
    }

    /// Returns the component's own resource.
    #[must_use]
    pub fn component(&self) -> &ResourceHandle {
        self.handle.resource()
    }

    /// Declares a resource inside the component.
    pub fn declare(&mut self, input: ResourceInput) -> Result<ResourceHandle, DeclarationError> {
        let input = self.scoped(input);
        self.graph.declare(input)
    }

    /// Builds a nested component inside this one.
    pub fn build_component<O, F>(
        &mut self,
        input: ResourceInput,
        factory: F,
    ) -> Result<(ComponentHandle, O), DeclarationError>
    where
        F: FnOnce(&mut ComponentContext<'_>) -> Result<O, DeclarationError>,
    {
        let input = self.scoped(input);
        self.graph.build_component(input, factory)
    }

    /// See [`ComponentHandle::add_setting`].
    pub fn add_setting(
        &self,
        key: impl Into<String>,
        value: impl Into<Property>,
    ) -> Result<(), DeclarationError> {
        self.handle.add_setting(key, value)
    }

    /// See [`ComponentHandle::add_secret_setting`].
    pub fn add_secret_setting(
        &self,
        key: impl Into<String>,
        value: impl Into<Property>,
    ) -> Result<(), DeclarationError> {
        self.handle.add_secret_setting(key, value)
    }

    /// See [`ComponentHandle::add_connection_string`].
    pub fn add_connection_string(
        &self,
        name: impl Into<String>,
        kind: ConnectionStringKind,
        value: impl Into<Property>,
    ) -> Result<(), DeclarationError> {
        self.handle.add_connection_string(name, kind, value)
    }

    /// Registers work to run when the component finalizes.
    ///
    /// Finalizers run in registration order, after the pending maps are
    /// frozen.
    pub fn on_finalize<F>(&mut self, finalizer: F)
    where
        F: FnOnce(&mut FinalizeContext<'_>) -> Result<(), DeclarationError> + Send + 'static,
    {
        self.finalizers.push(Box::new(finalizer));
    }

    fn scoped(&self, input: ResourceInput) -> ResourceInput {
        if input.has_parent() {
            input
        } else {
            input.parent(self.handle.resource())
        }
    }
}

/// Scope handed to a finalizer.
pub struct FinalizeContext<'g> {
    graph: &'g mut ResourceGraph,
    component: ResourceHandle,
    pending: PendingSettings,
}

impl<'g> FinalizeContext<'g> {
    pub(crate) fn new(
        graph: &'g mut ResourceGraph,
        component: ResourceHandle,
        pending: PendingSettings,
    ) -> Self {
        Self {
            graph,
            component,
            pending,
        }
    }

    /// Returns the component being finalized.
    #[must_use]
    pub fn component(&self) -> &ResourceHandle {
        &self.component
    }

    /// Returns the frozen settings.
    #[must_use]
    pub fn pending(&self) -> &PendingSettings {
        &self.pending
    }

    /// Declares a resource. The parent defaults to the component.
    pub fn declare(&mut self, input: ResourceInput) -> Result<ResourceHandle, DeclarationError> {
        let input = if input.has_parent() {
            input
        } else {
            input.parent(&self.component)
        };
        self.graph.declare(input)
    }
}
