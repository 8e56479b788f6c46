//! Finalized plans.
//!
//! A [`Plan`] is the only artifact that crosses into the external engine. It
//! can be rendered as a JSON document in which deferred values appear as
//! placeholders, or resolved against materialized outputs.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::deferred::{Deferred, OutputSource, ResolveError};
use crate::edge::Edge;
use crate::property::Property;
use crate::resource::{GraphId, ResourceId, ResourceKind, ResourceMode, ResourceSpec};

/// A validated, frozen resource graph.
#[derive(Debug, Clone)]
pub struct Plan {
    graph: GraphId,
    resources: Vec<ResourceSpec>,
    edges: Vec<Edge>,
    outputs: IndexMap<String, Deferred<Value>>,
}

impl Plan {
    pub(crate) fn new(
        graph: GraphId,
        resources: Vec<ResourceSpec>,
        edges: Vec<Edge>,
        outputs: IndexMap<String, Deferred<Value>>,
    ) -> Self {
        Self {
            graph,
            resources,
            edges,
            outputs,
        }
    }

    /// Returns the identity of the graph the plan came from.
    #[must_use]
    pub fn graph(&self) -> &GraphId {
        &self.graph
    }

    /// Returns the resources in declaration order. Every resource appears
    /// after everything it depends on.
    #[must_use]
    pub fn resources(&self) -> &[ResourceSpec] {
        &self.resources
    }

    /// Returns all edges.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Returns the named stack outputs.
    #[must_use]
    pub fn outputs(&self) -> &IndexMap<String, Deferred<Value>> {
        &self.outputs
    }

    /// Returns one stack output.
    #[must_use]
    pub fn output(&self, name: &str) -> Option<&Deferred<Value>> {
        self.outputs.get(name)
    }

    /// Returns the number of resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Returns true if the plan declares nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Returns a resource by ID.
    #[must_use]
    pub fn get(&self, id: ResourceId) -> Option<&ResourceSpec> {
        self.resources.get(id.0)
    }

    /// Returns the first resource with the given name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&ResourceSpec> {
        self.resources.iter().find(|spec| spec.name() == name)
    }

    /// Returns the resource with the given name under the given parent.
    #[must_use]
    pub fn find_in(&self, parent: Option<ResourceId>, name: &str) -> Option<&ResourceSpec> {
        self.resources
            .iter()
            .find(|spec| spec.parent() == parent && spec.name() == name)
    }

    /// Returns every resource of a kind.
    pub fn by_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a ResourceSpec> + 'a {
        self.resources
            .iter()
            .filter(move |spec| spec.kind().as_str() == kind)
    }

    /// Returns the direct children of a resource.
    pub fn children(&self, parent: ResourceId) -> impl Iterator<Item = &ResourceSpec> {
        self.resources
            .iter()
            .filter(move |spec| spec.parent() == Some(parent))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Handoff
    // ─────────────────────────────────────────────────────────────────────────

    /// Renders the plan as a serializable document.
    #[must_use]
    pub fn to_document(&self) -> PlanDocument {
        PlanDocument {
            graph: self.graph.as_str().to_owned(),
            resources: self
                .resources
                .iter()
                .map(|spec| ResourceDocument {
                    id: spec.id().to_string(),
                    name: spec.name().to_owned(),
                    kind: spec.kind().clone(),
                    mode: spec.mode(),
                    parent: spec.parent().map(|id| id.to_string()),
                    depends_on: spec.dependencies().iter().map(ToString::to_string).collect(),
                    properties: spec
                        .properties()
                        .iter()
                        .map(|(k, v)| (k.clone(), v.placeholder()))
                        .collect(),
                    secret_properties: spec.secret_properties().to_vec(),
                })
                .collect(),
            edges: self
                .edges
                .iter()
                .map(|edge| EdgeDocument {
                    kind: edge.kind(),
                    from: edge.from().to_string(),
                    to: edge.to().to_string(),
                    property: match edge {
                        Edge::Reference(reference) => Some(reference.property.clone()),
                        _ => None,
                    },
                })
                .collect(),
            outputs: self
                .outputs
                .iter()
                .map(|(name, value)| {
                    (name.clone(), Property::Deferred(value.clone()).placeholder())
                })
                .collect(),
        }
    }

    /// Renders the plan document as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.to_document())
    }

    /// Resolves every property and output against materialized outputs.
    pub fn resolve(&self, source: &dyn OutputSource) -> Result<ResolvedPlan, ResolveError> {
        let mut resources = Vec::with_capacity(self.resources.len());
        for spec in &self.resources {
            let mut properties = IndexMap::with_capacity(spec.properties().len());
            for (key, property) in spec.properties() {
                let value = property
                    .resolve(source)
                    .map_err(|source| ResolveError::Property {
                        resource: spec.name().to_owned(),
                        property: key.clone(),
                        source: Box::new(source),
                    })?;
                properties.insert(key.clone(), value);
            }
            resources.push(ResolvedResource {
                id: spec.id(),
                name: spec.name().to_owned(),
                kind: spec.kind().clone(),
                properties,
                secret_properties: spec.secret_properties().to_vec(),
            });
        }

        let mut outputs = IndexMap::with_capacity(self.outputs.len());
        let mut secret_outputs = Vec::new();
        for (name, value) in &self.outputs {
            let resolved = value.resolve(source).map_err(|source| ResolveError::Output {
                name: name.clone(),
                source: Box::new(source),
            })?;
            if value.is_secret() {
                secret_outputs.push(name.clone());
            }
            outputs.insert(name.clone(), resolved);
        }

        Ok(ResolvedPlan {
            resources,
            outputs,
            secret_outputs,
        })
    }
}

/// Serializable form of a [`Plan`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDocument {
    /// Graph identity.
    pub graph: String,
    /// Resources in declaration order.
    pub resources: Vec<ResourceDocument>,
    /// Edges.
    pub edges: Vec<EdgeDocument>,
    /// Stack outputs as placeholders.
    pub outputs: IndexMap<String, Value>,
}

/// Serializable form of a [`ResourceSpec`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDocument {
    /// Resource ID (`res_N`).
    pub id: String,
    /// Logical name.
    pub name: String,
    /// Type token.
    pub kind: ResourceKind,
    /// Resource mode.
    pub mode: ResourceMode,
    /// Parent ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// IDs of resources this one must follow.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    /// Properties with deferred values as placeholders.
    pub properties: IndexMap<String, Value>,
    /// Keys of secret-bearing properties.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub secret_properties: Vec<String>,
}

/// Serializable form of an [`Edge`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeDocument {
    /// Edge kind.
    pub kind: &'static str,
    /// Dependent resource ID.
    pub from: String,
    /// Required resource ID.
    pub to: String,
    /// Reading property for reference edges.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property: Option<String>,
}

/// A plan with every deferred value resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPlan {
    /// Resources with concrete properties.
    pub resources: Vec<ResolvedResource>,
    /// Stack outputs.
    pub outputs: IndexMap<String, Value>,
    /// Names of outputs that carry secret material.
    pub secret_outputs: Vec<String>,
}

impl ResolvedPlan {
    /// Returns the first resolved resource with the given name.
    #[must_use]
    pub fn resource(&self, name: &str) -> Option<&ResolvedResource> {
        self.resources.iter().find(|r| r.name == name)
    }

    /// Returns one output.
    #[must_use]
    pub fn output(&self, name: &str) -> Option<&Value> {
        self.outputs.get(name)
    }

    /// Returns the outputs with secret values replaced by `"[secret]"`.
    #[must_use]
    pub fn public_outputs(&self) -> IndexMap<String, Value> {
        self.outputs
            .iter()
            .map(|(name, value)| {
                if self.secret_outputs.contains(name) {
                    (name.clone(), Value::from("[secret]"))
                } else {
                    (name.clone(), value.clone())
                }
            })
            .collect()
    }
}

/// A resource with concrete properties.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedResource {
    /// Resource ID.
    #[serde(serialize_with = "serialize_id")]
    pub id: ResourceId,
    /// Logical name.
    pub name: String,
    /// Type token.
    pub kind: ResourceKind,
    /// Resolved properties.
    pub properties: IndexMap<String, Value>,
    /// Keys of secret-bearing properties.
    pub secret_properties: Vec<String>,
}

fn serialize_id<S: serde::Serializer>(id: &ResourceId, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(id)
}
