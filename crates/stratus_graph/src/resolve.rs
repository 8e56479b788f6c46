//! In-memory output store.

use core::fmt;

use hashbrown::HashMap;

use crate::deferred::OutputSource;
use crate::output::OutputBag;
use crate::resource::ResourceId;

/// Materialized outputs and secrets held in memory.
///
/// Filled by the [`PreviewEngine`](crate::dev::PreviewEngine) or by an engine
/// adapter that copies state reported by the external engine. `Debug` never
/// prints secret values.
#[derive(Clone, Default)]
pub struct Materialized {
    outputs: HashMap<ResourceId, OutputBag>,
    secrets: HashMap<String, String>,
}

impl Materialized {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outputs of a resource, returning any previous bag.
    pub fn insert(&mut self, id: ResourceId, outputs: OutputBag) -> Option<OutputBag> {
        self.outputs.insert(id, outputs)
    }

    /// Adds a secret, builder style.
    #[must_use]
    pub fn with_secret(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert_secret(key, value);
        self
    }

    /// Records a secret.
    pub fn insert_secret(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.secrets.insert(key.into(), value.into());
    }

    /// Returns the outputs of a resource.
    #[must_use]
    pub fn get(&self, id: ResourceId) -> Option<&OutputBag> {
        self.outputs.get(&id)
    }

    /// Returns the number of materialized resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    /// Returns true if nothing is materialized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

impl OutputSource for Materialized {
    fn outputs(&self, id: ResourceId) -> Option<&OutputBag> {
        self.outputs.get(&id)
    }

    fn secret(&self, key: &str) -> Option<&str> {
        self.secrets.get(key).map(String::as_str)
    }
}

impl fmt::Debug for Materialized {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.secrets.keys().map(String::as_str).collect();
        keys.sort_unstable();
        f.debug_struct("Materialized")
            .field("outputs", &self.outputs)
            .field("secrets", &keys)
            .finish()
    }
}
