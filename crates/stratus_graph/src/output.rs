//! Materialized resource outputs.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::deferred::ResolveError;

/// Output fields of one materialized resource.
///
/// Populated by the external engine after apply, or by the
/// [`PreviewEngine`](crate::dev::PreviewEngine) during local previews. Field
/// order is preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputBag {
    fields: IndexMap<String, Value>,
}

impl OutputBag {
    /// Creates an empty bag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field, builder style.
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    /// Sets a field, returning the previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.fields.insert(field.into(), value.into())
    }

    /// Returns a field if present.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Returns a field or [`ResolveError::MissingOutput`].
    pub fn field(&self, field: &str) -> Result<&Value, ResolveError> {
        self.fields
            .get(field)
            .ok_or_else(|| ResolveError::MissingOutput {
                field: field.to_owned(),
            })
    }

    /// Returns a string field.
    pub fn str(&self, field: &str) -> Result<&str, ResolveError> {
        self.field(field)?
            .as_str()
            .ok_or_else(|| ResolveError::TypeMismatch {
                field: field.to_owned(),
                expected: "string",
            })
    }

    /// Returns a boolean field.
    pub fn bool(&self, field: &str) -> Result<bool, ResolveError> {
        self.field(field)?
            .as_bool()
            .ok_or_else(|| ResolveError::TypeMismatch {
                field: field.to_owned(),
                expected: "bool",
            })
    }

    /// Returns a nested value addressed by a JSON pointer
    /// (`/identity/principalId`).
    pub fn pointer(&self, pointer: &str) -> Result<&Value, ResolveError> {
        let missing = || ResolveError::MissingOutput {
            field: pointer.to_owned(),
        };
        let rest = pointer.strip_prefix('/').ok_or_else(missing)?;
        let (head, tail) = match rest.split_once('/') {
            Some((head, tail)) => (head, Some(tail)),
            None => (rest, None),
        };
        let head = head.replace("~1", "/").replace("~0", "~");
        let root = self.fields.get(head.as_str()).ok_or_else(missing)?;
        match tail {
            Some(tail) => root.pointer(&format!("/{tail}")).ok_or_else(missing),
            None => Ok(root),
        }
    }

    /// Returns the number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the bag has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates over fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, Value)> for OutputBag {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn typed_accessors() {
        let bag = OutputBag::new()
            .with("name", "app")
            .with("enabled", true)
            .with("identity", json!({ "principalId": "p-1" }));

        assert_eq!(bag.str("name"), Ok("app"));
        assert_eq!(bag.bool("enabled"), Ok(true));
        assert_eq!(bag.pointer("/identity/principalId"), Ok(&json!("p-1")));
        assert_eq!(bag.pointer("/name"), Ok(&json!("app")));
    }

    #[test]
    fn missing_and_mismatched_fields() {
        let bag = OutputBag::new().with("count", 3);

        assert_eq!(
            bag.str("name"),
            Err(ResolveError::MissingOutput {
                field: "name".into()
            })
        );
        assert_eq!(
            bag.str("count"),
            Err(ResolveError::TypeMismatch {
                field: "count".into(),
                expected: "string"
            })
        );
        assert!(bag.pointer("count").is_err());
        assert!(bag.pointer("/count/inner").is_err());
    }

    #[test]
    fn pointer_unescapes_every_segment() {
        let bag = OutputBag::new()
            .with("tags/env", json!({ "a~b": "dev" }))
            .with("x~y", 1);

        assert_eq!(bag.pointer("/tags~1env/a~0b"), Ok(&json!("dev")));
        assert_eq!(bag.pointer("/x~0y"), Ok(&json!(1)));
        assert!(bag.pointer("/tags/env").is_err());
    }

    #[test]
    fn serializes_as_plain_object() {
        let bag = OutputBag::new().with("b", 1).with("a", 2);
        let json = serde_json::to_string(&bag).unwrap();
        assert_eq!(json, r#"{"b":1,"a":2}"#);
    }
}
