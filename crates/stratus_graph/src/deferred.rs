//! Deferred values.
//!
//! A [`Deferred<T>`] stands for a value that is only known once other
//! resources have been materialized, or once a secret has been fetched from
//! the secret store. It is declared now and resolved later against an
//! [`OutputSource`], which keeps declaration and materialization as two
//! separate phases.
//!
//! Every deferred value carries the set of [`Dependency`]s it reads and a
//! secret flag. Both are propagated through composition, so an interpolated
//! connection string built from a secret stays secret and still names every
//! resource it reads.

use core::fmt;
use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::output::OutputBag;
use crate::resource::{GraphId, ResourceHandle, ResourceId};

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Failure to resolve a deferred value against materialized outputs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolveError {
    /// The referenced resource has no outputs yet.
    #[error("resource {resource} has not been materialized")]
    Unresolved {
        /// The resource that was read.
        resource: ResourceId,
    },
    /// The resource was materialized but lacks the requested field.
    #[error("output field '{field}' is missing")]
    MissingOutput {
        /// Field name or JSON pointer.
        field: String,
    },
    /// The field exists but has the wrong JSON type.
    #[error("output field '{field}' is not a {expected}")]
    TypeMismatch {
        /// Field name.
        field: String,
        /// The expected JSON type.
        expected: &'static str,
    },
    /// The secret store has no value for the key.
    #[error("secret '{key}' is not available")]
    MissingSecret {
        /// Secret key.
        key: String,
    },
    /// A resolved value could not be converted to JSON.
    #[error("failed to serialize resolved value: {0}")]
    Serialization(String),
    /// A resource property failed to resolve.
    #[error("property '{property}' of resource '{resource}' failed to resolve")]
    Property {
        /// Resource name.
        resource: String,
        /// Property key.
        property: String,
        /// Underlying failure.
        #[source]
        source: Box<ResolveError>,
    },
    /// A stack output failed to resolve.
    #[error("output '{name}' failed to resolve")]
    Output {
        /// Output name.
        name: String,
        /// Underlying failure.
        #[source]
        source: Box<ResolveError>,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Dependencies and sources
// ─────────────────────────────────────────────────────────────────────────────

/// Something a deferred value reads when resolved.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Dependency {
    /// Outputs of a declared resource.
    Resource {
        /// Graph that declared the resource.
        graph: GraphId,
        /// The resource.
        id: ResourceId,
    },
    /// A value held by the secret store.
    Secret(Arc<str>),
}

impl Dependency {
    /// Returns the resource ID for resource dependencies.
    #[must_use]
    pub fn resource(&self) -> Option<ResourceId> {
        match self {
            Dependency::Resource { id, .. } => Some(*id),
            Dependency::Secret(_) => None,
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dependency::Resource { id, .. } => write!(f, "{id}"),
            Dependency::Secret(key) => write!(f, "secret:{key}"),
        }
    }
}

/// Provider of materialized outputs and secrets.
///
/// Implemented by [`Materialized`](crate::resolve::Materialized); an engine
/// adapter implements it over whatever state the engine keeps.
pub trait OutputSource {
    /// Returns the outputs of a materialized resource.
    fn outputs(&self, id: ResourceId) -> Option<&OutputBag>;

    /// Returns a secret by key.
    fn secret(&self, key: &str) -> Option<&str>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Deferred
// ─────────────────────────────────────────────────────────────────────────────

type Resolver<T> = dyn Fn(&dyn OutputSource) -> Result<T, ResolveError> + Send + Sync;

/// A value known only after materialization.
///
/// Construction never runs the projection. [`Deferred::resolve`] is the only
/// place user closures are invoked.
///
/// # Example
///
/// ```
/// use stratus_graph::prelude::*;
///
/// let mut graph = ResourceGraph::new();
/// let app = graph
///     .declare(ResourceInput::new("app", "azure-native:web:WebApp"))
///     .unwrap();
///
/// let url = combine(["https://".into(), app.output_str("defaultHostName").into(), "/".into()]);
/// assert!(!url.is_secret());
/// assert_eq!(url.dependencies().len(), 1);
/// ```
pub struct Deferred<T> {
    resolver: Arc<Resolver<T>>,
    dependencies: Arc<BTreeSet<Dependency>>,
    secret: bool,
}

impl<T> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            resolver: Arc::clone(&self.resolver),
            dependencies: Arc::clone(&self.dependencies),
            secret: self.secret,
        }
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("dependencies", &self.dependencies)
            .field("secret", &self.secret)
            .finish_non_exhaustive()
    }
}

impl<T: 'static> Deferred<T> {
    fn from_parts<F>(dependencies: BTreeSet<Dependency>, secret: bool, resolver: F) -> Self
    where
        F: Fn(&dyn OutputSource) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        Self {
            resolver: Arc::new(resolver),
            dependencies: Arc::new(dependencies),
            secret,
        }
    }

    /// Defers a projection over a resource's outputs.
    ///
    /// Prefer [`ResourceHandle::defer`] or
    /// [`ResourceGraph::defer_from`](crate::ResourceGraph::defer_from).
    #[must_use]
    pub fn from_resource<F>(handle: &ResourceHandle, projector: F) -> Self
    where
        F: Fn(&OutputBag) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        let id = handle.id();
        let dependencies = BTreeSet::from([Dependency::Resource {
            graph: handle.graph().clone(),
            id,
        }]);
        Self::from_parts(dependencies, false, move |source| {
            let bag = source
                .outputs(id)
                .ok_or(ResolveError::Unresolved { resource: id })?;
            projector(bag)
        })
    }

    /// Applies a function to the resolved value.
    #[must_use]
    pub fn map<U, F>(self, f: F) -> Deferred<U>
    where
        U: 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        self.try_map(move |value| Ok(f(value)))
    }

    /// Applies a fallible function to the resolved value.
    #[must_use]
    pub fn try_map<U, F>(self, f: F) -> Deferred<U>
    where
        U: 'static,
        F: Fn(T) -> Result<U, ResolveError> + Send + Sync + 'static,
    {
        let inner = self.resolver;
        Deferred {
            resolver: Arc::new(move |source: &dyn OutputSource| f(inner(source)?)),
            dependencies: self.dependencies,
            secret: self.secret,
        }
    }

    /// Pairs two deferred values. The result depends on both and is secret if
    /// either is.
    #[must_use]
    pub fn zip<U: 'static>(self, other: Deferred<U>) -> Deferred<(T, U)> {
        let dependencies = self
            .dependencies
            .union(&other.dependencies)
            .cloned()
            .collect();
        let (left, right) = (self.resolver, other.resolver);
        Deferred::from_parts(dependencies, self.secret || other.secret, move |source| {
            Ok((left(source)?, right(source)?))
        })
    }

    /// Collects deferred values into one deferred list, preserving order.
    #[must_use]
    pub fn all(values: impl IntoIterator<Item = Deferred<T>>) -> Deferred<Vec<T>> {
        let values: Vec<Deferred<T>> = values.into_iter().collect();
        let dependencies = values
            .iter()
            .flat_map(|value| value.dependencies.iter().cloned())
            .collect();
        let secret = values.iter().any(Deferred::is_secret);
        Deferred::from_parts(dependencies, secret, move |source| {
            values.iter().map(|value| value.resolve(source)).collect()
        })
    }

    /// Marks the value as secret.
    #[must_use]
    pub fn as_secret(mut self) -> Self {
        self.secret = true;
        self
    }

    /// Returns true if the value carries secret material.
    #[must_use]
    pub fn is_secret(&self) -> bool {
        self.secret
    }

    /// Returns everything the value reads.
    #[must_use]
    pub fn dependencies(&self) -> &BTreeSet<Dependency> {
        &self.dependencies
    }

    /// Returns the resources the value reads.
    pub fn resource_dependencies(&self) -> impl Iterator<Item = ResourceId> + '_ {
        self.dependencies.iter().filter_map(Dependency::resource)
    }

    /// Resolves the value against materialized outputs.
    pub fn resolve(&self, source: &dyn OutputSource) -> Result<T, ResolveError> {
        (self.resolver)(source)
    }
}

impl<T: Clone + Send + Sync + 'static> Deferred<T> {
    /// Wraps a value that is already known.
    #[must_use]
    pub fn known(value: T) -> Self {
        Self::from_parts(BTreeSet::new(), false, move |_| Ok(value.clone()))
    }
}

impl Deferred<String> {
    /// References a value held by the secret store.
    ///
    /// The result is always secret.
    #[must_use]
    pub fn from_secret(key: impl Into<Arc<str>>) -> Self {
        let key: Arc<str> = key.into();
        let dependencies = BTreeSet::from([Dependency::Secret(Arc::clone(&key))]);
        Self::from_parts(dependencies, true, move |source| {
            source
                .secret(&key)
                .map(str::to_owned)
                .ok_or_else(|| ResolveError::MissingSecret {
                    key: key.to_string(),
                })
        })
    }
}

impl<T: Serialize + 'static> Deferred<T> {
    /// Converts the resolved value to JSON.
    #[must_use]
    pub fn into_value(self) -> Deferred<Value> {
        self.try_map(|value| {
            serde_json::to_value(value).map_err(|err| ResolveError::Serialization(err.to_string()))
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Interpolation
// ─────────────────────────────────────────────────────────────────────────────

/// One segment of an interpolated string.
#[derive(Debug, Clone)]
pub enum Part {
    /// Text copied as is.
    Literal(String),
    /// Text known after materialization.
    Deferred(Deferred<String>),
}

impl From<&str> for Part {
    fn from(text: &str) -> Self {
        Part::Literal(text.to_owned())
    }
}

impl From<String> for Part {
    fn from(text: String) -> Self {
        Part::Literal(text)
    }
}

impl From<Deferred<String>> for Part {
    fn from(value: Deferred<String>) -> Self {
        Part::Deferred(value)
    }
}

impl From<&Deferred<String>> for Part {
    fn from(value: &Deferred<String>) -> Self {
        Part::Deferred(value.clone())
    }
}

/// Interpolates literals and deferred strings into one deferred string.
///
/// Parts are concatenated in order. The result depends on the union of the
/// parts' dependencies and is secret if any part is.
#[must_use]
pub fn combine(parts: impl IntoIterator<Item = Part>) -> Deferred<String> {
    let parts: Vec<Part> = parts.into_iter().collect();
    let mut dependencies = BTreeSet::new();
    let mut secret = false;
    for part in &parts {
        if let Part::Deferred(value) = part {
            dependencies.extend(value.dependencies.iter().cloned());
            secret |= value.secret;
        }
    }
    Deferred::from_parts(dependencies, secret, move |source| {
        let mut out = String::new();
        for part in &parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Deferred(value) => out.push_str(&value.resolve(source)?),
            }
        }
        Ok(out)
    })
}
