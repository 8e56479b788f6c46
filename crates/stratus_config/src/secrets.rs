//! Secret store.

use core::fmt;

use indexmap::IndexMap;

/// Secret values keyed by name.
///
/// Values are only handed out through [`SecretStore::get`] and
/// [`SecretStore::iter`]; `Debug` prints key names only. Declarations never
/// read the store directly. They reference secrets through
/// [`Deferred::from_secret`](stratus_graph::Deferred::from_secret), which the
/// engine resolves against the store at materialization time.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SecretStore {
    values: IndexMap<String, String>,
}

impl SecretStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a secret, replacing any previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Returns a secret value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Returns true if the store holds a non-empty value for the key.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some_and(|value| !value.is_empty())
    }

    /// Iterates over secret names.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Iterates over names and values.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the number of secrets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for SecretStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.values.keys().map(|k| (k, "[redacted]")))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_never_prints_values() {
        let mut store = SecretStore::new();
        store.insert("registryPassword", "hunter2");

        let rendered = format!("{store:?}");
        assert!(rendered.contains("registryPassword"));
        assert!(rendered.contains("[redacted]"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn empty_values_do_not_count() {
        let mut store = SecretStore::new();
        store.insert("a", "");
        store.insert("b", "x");
        assert!(!store.contains("a"));
        assert!(store.contains("b"));
        assert!(!store.contains("c"));
        assert_eq!(store.len(), 2);
    }
}
