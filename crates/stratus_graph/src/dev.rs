//! Development tools: a local stand-in for the external engine.
//!
//! [`PreviewEngine`] walks a [`Plan`] in declaration order and produces an
//! [`OutputBag`] for every resource without touching any cloud API. Each
//! resource's inputs are resolved against the bags of resources already
//! visited, so a preview exercises exactly the dependency wiring the real
//! engine would follow.
//!
//! # Example
//!
//! ```
//! use stratus_graph::dev::PreviewEngine;
//! use stratus_graph::prelude::*;
//!
//! let mut graph = ResourceGraph::new();
//! let app = graph
//!     .declare(ResourceInput::new("app", "azure-native:web:WebApp"))
//!     .unwrap();
//! graph
//!     .export("url", combine(["https://".into(), app.output_str("defaultHostName").into()]))
//!     .unwrap();
//! let plan = graph.finalize().unwrap();
//!
//! let engine = PreviewEngine::new().synthesize("azure-native:web:WebApp", |spec, bag| {
//!     bag.insert("defaultHostName", format!("{}.example.net", spec.name()));
//! });
//! let (_, resolved) = engine.preview(&plan).unwrap();
//! assert_eq!(
//!     resolved.output("url").and_then(|v| v.as_str()),
//!     Some("https://app.example.net")
//! );
//! ```

use core::fmt;

use hashbrown::HashMap;

use crate::deferred::ResolveError;
use crate::output::OutputBag;
use crate::plan::{Plan, ResolvedPlan};
use crate::resolve::Materialized;
use crate::resource::{ResourceKind, ResourceSpec};

/// Produces kind-specific outputs for a previewed resource.
///
/// The bag already holds the resolved inputs plus `id` and `name`.
pub type Synthesizer = Box<dyn Fn(&ResourceSpec, &mut OutputBag) + Send + Sync>;

/// In-process materializer used for previews and tests.
#[derive(Default)]
pub struct PreviewEngine {
    synthesizers: HashMap<ResourceKind, Synthesizer>,
    secrets: HashMap<String, String>,
}

impl PreviewEngine {
    /// Creates an engine with no synthesizers or secrets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the synthesizer for a resource kind, replacing any previous
    /// one.
    #[must_use]
    pub fn synthesize<F>(mut self, kind: impl Into<ResourceKind>, synthesizer: F) -> Self
    where
        F: Fn(&ResourceSpec, &mut OutputBag) + Send + Sync + 'static,
    {
        self.synthesizers.insert(kind.into(), Box::new(synthesizer));
        self
    }

    /// Makes a secret available to resolution.
    #[must_use]
    pub fn with_secret(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(key.into(), value.into());
        self
    }

    /// Makes several secrets available to resolution.
    #[must_use]
    pub fn with_secrets<K, V>(mut self, secrets: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.secrets
            .extend(secrets.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Materializes every resource of the plan in declaration order.
    pub fn materialize(&self, plan: &Plan) -> Result<Materialized, ResolveError> {
        let mut store = Materialized::new();
        for (key, value) in &self.secrets {
            store.insert_secret(key.clone(), value.clone());
        }

        for spec in plan.resources() {
            let mut bag = OutputBag::new();
            for (key, property) in spec.properties() {
                let value = property
                    .resolve(&store)
                    .map_err(|source| ResolveError::Property {
                        resource: spec.name().to_owned(),
                        property: key.clone(),
                        source: Box::new(source),
                    })?;
                bag.insert(key.clone(), value);
            }
            bag.insert("id", format!("/preview/{}/{}", spec.kind(), spec.name()));
            if bag.get("name").is_none() {
                bag.insert("name", spec.name());
            }
            if let Some(synthesizer) = self.synthesizers.get(spec.kind()) {
                synthesizer(spec, &mut bag);
            }

            tracing::debug!(
                resource = %spec.id(),
                name = %spec.name(),
                fields = bag.len(),
                "previewed resource"
            );
            store.insert(spec.id(), bag);
        }

        tracing::info!(resources = store.len(), "preview materialized plan");
        Ok(store)
    }

    /// Materializes the plan and resolves it against the result.
    pub fn preview(&self, plan: &Plan) -> Result<(Materialized, ResolvedPlan), ResolveError> {
        let store = self.materialize(plan)?;
        let resolved = plan.resolve(&store)?;
        Ok((store, resolved))
    }
}

impl fmt::Debug for PreviewEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreviewEngine")
            .field("synthesizers", &self.synthesizers.keys().collect::<Vec<_>>())
            .field("secrets", &self.secrets.len())
            .finish()
    }
}
