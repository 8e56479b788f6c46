//! Resource property values.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::deferred::{Deferred, Dependency, OutputSource, ResolveError};
use crate::resource::ResourceId;

/// Key of the placeholder object that stands in for a deferred value in a
/// plan document.
pub const DEFERRED_KEY: &str = "$deferred";

/// A property value: a literal, a deferred value, or a structure of either.
///
/// Structures let a single property mix literal and deferred leaves, e.g. an
/// access policy whose `tenantId` comes from a lookup but whose permission
/// lists are literals.
#[derive(Debug, Clone)]
pub enum Property {
    /// A literal JSON value.
    Value(Value),
    /// A value known after materialization.
    Deferred(Deferred<Value>),
    /// An ordered list.
    List(Vec<Property>),
    /// An object with ordered keys.
    Object(IndexMap<String, Property>),
}

impl Property {
    /// Builds an object property from key/value pairs.
    #[must_use]
    pub fn object<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Property>,
    {
        Property::Object(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Builds a list property.
    #[must_use]
    pub fn list<V: Into<Property>>(items: impl IntoIterator<Item = V>) -> Self {
        Property::List(items.into_iter().map(Into::into).collect())
    }

    /// Returns the literal value if this property holds no deferred leaves.
    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Property::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Returns true if any leaf is deferred.
    #[must_use]
    pub fn is_deferred(&self) -> bool {
        match self {
            Property::Value(_) => false,
            Property::Deferred(_) => true,
            Property::List(items) => items.iter().any(Property::is_deferred),
            Property::Object(entries) => entries.values().any(Property::is_deferred),
        }
    }

    /// Returns true if any leaf carries secret material.
    #[must_use]
    pub fn is_secret(&self) -> bool {
        match self {
            Property::Value(_) => false,
            Property::Deferred(value) => value.is_secret(),
            Property::List(items) => items.iter().any(Property::is_secret),
            Property::Object(entries) => entries.values().any(Property::is_secret),
        }
    }

    /// Adds every dependency of the deferred leaves to `out`.
    pub fn collect_dependencies(&self, out: &mut BTreeSet<Dependency>) {
        match self {
            Property::Value(_) => {}
            Property::Deferred(value) => out.extend(value.dependencies().iter().cloned()),
            Property::List(items) => items.iter().for_each(|p| p.collect_dependencies(out)),
            Property::Object(entries) => entries.values().for_each(|p| p.collect_dependencies(out)),
        }
    }

    /// Returns every dependency of the deferred leaves.
    #[must_use]
    pub fn dependencies(&self) -> BTreeSet<Dependency> {
        let mut out = BTreeSet::new();
        self.collect_dependencies(&mut out);
        out
    }

    /// Returns the resources read by the deferred leaves.
    #[must_use]
    pub fn resource_dependencies(&self) -> Vec<ResourceId> {
        self.dependencies()
            .iter()
            .filter_map(Dependency::resource)
            .collect()
    }

    /// Resolves every deferred leaf, producing plain JSON.
    pub fn resolve(&self, source: &dyn OutputSource) -> Result<Value, ResolveError> {
        match self {
            Property::Value(value) => Ok(value.clone()),
            Property::Deferred(value) => value.resolve(source),
            Property::List(items) => items
                .iter()
                .map(|item| item.resolve(source))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Property::Object(entries) => {
                let mut map = Map::with_capacity(entries.len());
                for (key, value) in entries {
                    map.insert(key.clone(), value.resolve(source)?);
                }
                Ok(Value::Object(map))
            }
        }
    }

    /// Renders the property for a plan document. Deferred leaves become
    /// `{"$deferred": {"dependsOn": [...], "secret": bool}}`.
    #[must_use]
    pub fn placeholder(&self) -> Value {
        match self {
            Property::Value(value) => value.clone(),
            Property::Deferred(value) => {
                let depends_on: Vec<String> = value
                    .dependencies()
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                let mut map = Map::new();
                map.insert(
                    DEFERRED_KEY.to_owned(),
                    json!({ "dependsOn": depends_on, "secret": value.is_secret() }),
                );
                Value::Object(map)
            }
            Property::List(items) => Value::Array(items.iter().map(Property::placeholder).collect()),
            Property::Object(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.placeholder()))
                    .collect(),
            ),
        }
    }
}

impl From<Value> for Property {
    fn from(value: Value) -> Self {
        Property::Value(value)
    }
}

impl From<&str> for Property {
    fn from(value: &str) -> Self {
        Property::Value(Value::from(value))
    }
}

impl From<String> for Property {
    fn from(value: String) -> Self {
        Property::Value(Value::from(value))
    }
}

impl From<bool> for Property {
    fn from(value: bool) -> Self {
        Property::Value(Value::from(value))
    }
}

impl From<i32> for Property {
    fn from(value: i32) -> Self {
        Property::Value(Value::from(value))
    }
}

impl From<i64> for Property {
    fn from(value: i64) -> Self {
        Property::Value(Value::from(value))
    }
}

impl From<u32> for Property {
    fn from(value: u32) -> Self {
        Property::Value(Value::from(value))
    }
}

impl From<u64> for Property {
    fn from(value: u64) -> Self {
        Property::Value(Value::from(value))
    }
}

impl<T: Serialize + 'static> From<Deferred<T>> for Property {
    fn from(value: Deferred<T>) -> Self {
        Property::Deferred(value.into_value())
    }
}

impl<T: Serialize + 'static> From<&Deferred<T>> for Property {
    fn from(value: &Deferred<T>) -> Self {
        Property::Deferred(value.clone().into_value())
    }
}

impl From<Vec<Property>> for Property {
    fn from(items: Vec<Property>) -> Self {
        Property::List(items)
    }
}

impl From<IndexMap<String, Property>> for Property {
    fn from(entries: IndexMap<String, Property>) -> Self {
        Property::Object(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputBag;

    struct Empty;

    impl OutputSource for Empty {
        fn outputs(&self, _id: ResourceId) -> Option<&OutputBag> {
            None
        }

        fn secret(&self, key: &str) -> Option<&str> {
            (key == "token").then_some("s3cr3t")
        }
    }

    #[test]
    fn nested_structures_resolve() {
        let property = Property::object([
            ("name", Property::from("kv")),
            (
                "permissions",
                Property::list(["get", "list"]),
            ),
            ("token", Deferred::from_secret("token").into()),
        ]);

        assert!(property.is_deferred());
        assert!(property.is_secret());
        assert_eq!(
            property.resolve(&Empty),
            Ok(json!({ "name": "kv", "permissions": ["get", "list"], "token": "s3cr3t" }))
        );
    }

    #[test]
    fn placeholder_hides_secret_values() {
        let property = Property::from(Deferred::from_secret("token"));
        let rendered = property.placeholder();

        assert_eq!(
            rendered,
            json!({ "$deferred": { "dependsOn": ["secret:token"], "secret": true } })
        );
        assert!(!rendered.to_string().contains("s3cr3t"));
    }

    #[test]
    fn literal_properties_are_not_deferred() {
        let property = Property::from(42_i64);
        assert!(!property.is_deferred());
        assert_eq!(property.as_value(), Some(&json!(42)));
        assert!(property.dependencies().is_empty());
    }
}
