//! Edge types for resource graphs.
//!
//! Edges record why one resource must exist before another: ownership
//! (parent/child), an explicit ordering request, or a deferred property that
//! reads another resource's outputs.

use core::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::resource::ResourceId;

/// Unique identifier for an edge in the graph.
///
/// Edge IDs are generated using nanoid, providing globally unique identifiers
/// that don't require coordination between graph instances.
///
/// Internally uses `Arc<str>` for cheap cloning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct EdgeId(Arc<str>);

impl EdgeId {
    /// Creates a new edge ID with a unique nanoid.
    #[must_use]
    pub fn new() -> Self {
        Self(nanoid::nanoid!().into())
    }

    /// Creates an edge ID from a specific string value.
    ///
    /// Mostly useful in tests.
    #[must_use]
    pub fn from_string(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for EdgeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "edge_{}", self.0)
    }
}

/// A relationship between two resources.
///
/// Every edge points from the resource that must come later (`from`) to the
/// resource it needs (`to`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edge {
    /// `child` is owned by `parent`.
    Parent(ParentEdge),
    /// `from` is explicitly ordered after `to`.
    DependsOn(DependsOnEdge),
    /// A property of `from` reads outputs of `to`.
    Reference(ReferenceEdge),
}

impl Edge {
    /// Returns the edge's ID.
    #[must_use]
    pub fn id(&self) -> EdgeId {
        match self {
            Edge::Parent(edge) => edge.id.clone(),
            Edge::DependsOn(edge) => edge.id.clone(),
            Edge::Reference(edge) => edge.id.clone(),
        }
    }

    /// Returns the dependent resource.
    #[must_use]
    pub fn from(&self) -> ResourceId {
        match self {
            Edge::Parent(edge) => edge.child,
            Edge::DependsOn(edge) => edge.from,
            Edge::Reference(edge) => edge.from,
        }
    }

    /// Returns the resource depended on.
    #[must_use]
    pub fn to(&self) -> ResourceId {
        match self {
            Edge::Parent(edge) => edge.parent,
            Edge::DependsOn(edge) => edge.to,
            Edge::Reference(edge) => edge.to,
        }
    }

    /// Returns a short label for the edge kind.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Edge::Parent(_) => "parent",
            Edge::DependsOn(_) => "dependsOn",
            Edge::Reference(_) => "reference",
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Edge::Reference(edge) => write!(
                f,
                "{} -[{}.{}]-> {}",
                edge.from, self.kind(), edge.property, edge.to
            ),
            _ => write!(f, "{} -[{}]-> {}", self.from(), self.kind(), self.to()),
        }
    }
}

/// Ownership edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentEdge {
    /// Unique identifier for this edge.
    pub id: EdgeId,
    /// The owned resource.
    pub child: ResourceId,
    /// The owner.
    pub parent: ResourceId,
}

impl ParentEdge {
    /// Creates a new parent edge.
    #[must_use]
    pub fn new(child: ResourceId, parent: ResourceId) -> Self {
        Self {
            id: EdgeId::new(),
            child,
            parent,
        }
    }
}

/// Explicit ordering edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependsOnEdge {
    /// Unique identifier for this edge.
    pub id: EdgeId,
    /// The dependent resource.
    pub from: ResourceId,
    /// The resource depended on.
    pub to: ResourceId,
}

impl DependsOnEdge {
    /// Creates a new ordering edge.
    #[must_use]
    pub fn new(from: ResourceId, to: ResourceId) -> Self {
        Self {
            id: EdgeId::new(),
            from,
            to,
        }
    }
}

/// Data edge implied by a deferred property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceEdge {
    /// Unique identifier for this edge.
    pub id: EdgeId,
    /// The resource whose property reads outputs.
    pub from: ResourceId,
    /// The resource whose outputs are read.
    pub to: ResourceId,
    /// The reading property.
    pub property: String,
}

impl ReferenceEdge {
    /// Creates a new reference edge.
    #[must_use]
    pub fn new(from: ResourceId, to: ResourceId, property: impl Into<String>) -> Self {
        Self {
            id: EdgeId::new(),
            from,
            to,
            property: property.into(),
        }
    }
}
