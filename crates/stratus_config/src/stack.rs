//! Stack configuration.
//!
//! Values come from two sources, lowest precedence first:
//!
//! 1. The stack file `Stratus.<stack>.toml`
//! 2. Environment variables `STRATUS_CONFIG_<key>` and `STRATUS_SECRET_<key>`
//!
//! # Stack file format
//!
//! ```toml
//! project = "InfraLab"
//!
//! [config]
//! "InfraLab:appServicePlanSize" = "F1"
//! appServicePlanTier = "Free"
//!
//! [secrets]
//! registryPassword = "..."
//! ```
//!
//! Keys namespaced with the stack's own project (`InfraLab:key`) are stored
//! without the namespace. Keys of other namespaces are kept verbatim.

use core::str::FromStr;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;
use stratus_graph::Deferred;

use crate::error::ConfigError;
use crate::secrets::SecretStore;

/// Project name used when neither the stack file nor the caller names one.
pub const DEFAULT_PROJECT: &str = "InfraLab";

/// Environment prefix for plain values.
pub const CONFIG_ENV_PREFIX: &str = "STRATUS_CONFIG_";

/// Environment prefix for secrets.
pub const SECRET_ENV_PREFIX: &str = "STRATUS_SECRET_";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct StackFile {
    project: Option<String>,
    #[serde(default)]
    config: IndexMap<String, toml::Value>,
    #[serde(default)]
    secrets: IndexMap<String, toml::Value>,
}

/// Returns the conventional stack file path for a stack, relative to `dir`.
#[must_use]
pub fn stack_file_path(dir: impl AsRef<Path>, stack: &str) -> PathBuf {
    dir.as_ref().join(format!("Stratus.{stack}.toml"))
}

/// Configuration of one stack: project and stack names, plain values and
/// secrets.
///
/// # Example
///
/// ```
/// use stratus_config::StackConfig;
///
/// let config = StackConfig::new("InfraLab", "dev")
///     .with_value("appServicePlanTier", "Free")
///     .with_secret("registryPassword", "hunter2");
///
/// assert_eq!(config.require("appServicePlanTier").unwrap(), "Free");
/// assert!(config.require("appServicePlanSize").is_err());
///
/// let password = config.require_secret("registryPassword").unwrap();
/// assert!(password.is_secret());
/// ```
#[derive(Debug, Clone)]
pub struct StackConfig {
    project: String,
    stack: String,
    values: IndexMap<String, String>,
    secrets: SecretStore,
}

impl StackConfig {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new(project: impl Into<String>, stack: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            stack: stack.into(),
            values: IndexMap::new(),
            secrets: SecretStore::new(),
        }
    }

    /// Loads a stack file.
    pub fn load(path: impl AsRef<Path>, stack: &str) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(stack, &text)?;
        tracing::debug!(
            path = %path.display(),
            project = %config.project,
            stack = %config.stack,
            values = config.values.len(),
            secrets = config.secrets.len(),
            "loaded stack file"
        );
        Ok(config)
    }

    /// Parses stack file contents.
    pub fn from_toml_str(stack: &str, text: &str) -> Result<Self, ConfigError> {
        let file: StackFile = toml::from_str(text)?;
        let project = file
            .project
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PROJECT.to_owned());
        let mut config = Self::new(project, stack);

        for (key, value) in file.config {
            let key = config.local_key(&key);
            let value = scalar(&key, value)?;
            config.values.insert(key, value);
        }
        for (key, value) in file.secrets {
            let key = config.local_key(&key);
            let value = scalar(&key, value)?;
            config.secrets.insert(key, value);
        }
        Ok(config)
    }

    /// Replaces the project name.
    ///
    /// Keys still namespaced with the new project lose their namespace. If
    /// both `key` and `<project>:key` are present, the namespaced value wins.
    #[must_use]
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = project.into();
        let values = self.relocalize(self.values());
        let secrets = self.relocalize(self.secrets.iter());

        self.values = values;
        self.secrets = SecretStore::new();
        for (key, value) in secrets {
            self.secrets.insert(key, value);
        }
        self
    }

    /// Sets a plain value, builder style.
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Sets a secret, builder style.
    #[must_use]
    pub fn with_secret(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_secret(key, value);
        self
    }

    /// Sets a plain value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = self.local_key(&key.into());
        self.values.insert(key, value.into());
    }

    /// Sets a secret.
    pub fn set_secret(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = self.local_key(&key.into());
        self.secrets.insert(key, value.into());
    }

    /// Overlays values from environment variables.
    ///
    /// `STRATUS_CONFIG_<key>` sets a value and `STRATUS_SECRET_<key>` sets a
    /// secret; other variables are ignored. Returns the number of variables
    /// applied.
    pub fn apply_env<K, V>(&mut self, vars: impl IntoIterator<Item = (K, V)>) -> usize
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut applied = 0;
        for (name, value) in vars {
            let name = name.as_ref();
            let (key, secret) = if let Some(key) = name.strip_prefix(CONFIG_ENV_PREFIX) {
                (key, false)
            } else if let Some(key) = name.strip_prefix(SECRET_ENV_PREFIX) {
                (key, true)
            } else {
                continue;
            };

            if key.is_empty() {
                tracing::warn!(variable = %name, "ignoring configuration override without a key");
                continue;
            }

            if secret {
                self.set_secret(key, value);
                tracing::debug!(key = %key, "secret overridden from environment");
            } else {
                self.set(key, value);
                tracing::debug!(key = %key, "configuration overridden from environment");
            }
            applied += 1;
        }
        applied
    }

    /// Overlays values from the process environment.
    pub fn apply_process_env(&mut self) -> usize {
        self.apply_env(std::env::vars())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns the project name.
    #[must_use]
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Returns the stack name.
    #[must_use]
    pub fn stack(&self) -> &str {
        &self.stack
    }

    /// Returns a value if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Returns a value, or `default` if absent.
    #[must_use]
    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Returns a required value.
    ///
    /// Absent and blank values both fail with [`ConfigError::Missing`].
    pub fn require(&self, key: &str) -> Result<&str, ConfigError> {
        match self.get(key) {
            Some(value) if !value.trim().is_empty() => Ok(value),
            _ => Err(ConfigError::Missing {
                key: key.to_owned(),
            }),
        }
    }

    /// Returns a required value parsed with [`FromStr`].
    pub fn require_parsed<T>(&self, key: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: core::fmt::Display,
    {
        let raw = self.require(key)?;
        raw.parse()
            .map_err(|err: T::Err| ConfigError::invalid(key, raw, err.to_string()))
    }

    /// Returns a deferred reference to a required secret.
    ///
    /// The value itself stays in the store; the returned deferred value is
    /// marked secret and resolves against the store at materialization time.
    pub fn require_secret(&self, key: &str) -> Result<Deferred<String>, ConfigError> {
        if !self.secrets.contains(key) {
            return Err(ConfigError::Missing {
                key: key.to_owned(),
            });
        }
        Ok(Deferred::from_secret(key))
    }

    /// Returns the secret store.
    #[must_use]
    pub fn secret_store(&self) -> &SecretStore {
        &self.secrets
    }

    /// Iterates over plain values.
    pub fn values(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn relocalize<'a>(
        &self,
        entries: impl Iterator<Item = (&'a str, &'a str)>,
    ) -> IndexMap<String, String> {
        let mut out = IndexMap::new();
        let mut namespaced = Vec::new();
        for (key, value) in entries {
            let local = self.local_key(key);
            if local == key {
                out.insert(local, value.to_owned());
            } else {
                namespaced.push((local, value.to_owned()));
            }
        }
        out.extend(namespaced);
        out
    }

    fn local_key(&self, key: &str) -> String {
        match key.split_once(':') {
            Some((namespace, rest)) if namespace == self.project && !rest.is_empty() => {
                rest.to_owned()
            }
            _ => key.to_owned(),
        }
    }
}

fn scalar(key: &str, value: toml::Value) -> Result<String, ConfigError> {
    match value {
        toml::Value::String(s) => Ok(s),
        toml::Value::Integer(i) => Ok(i.to_string()),
        toml::Value::Float(f) => Ok(f.to_string()),
        toml::Value::Boolean(b) => Ok(b.to_string()),
        toml::Value::Datetime(d) => Ok(d.to_string()),
        other @ (toml::Value::Array(_) | toml::Value::Table(_)) => Err(ConfigError::invalid(
            key,
            other.to_string(),
            "expected a string, number or boolean",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILE: &str = r#"
project = "InfraLab"

[config]
"InfraLab:appServicePlanSize" = "F1"
appServicePlanTier = "Free"
"azure-native:location" = "westeurope"
instanceCount = 2

[secrets]
registryPassword = "from-file"
"#;

    #[test]
    fn parses_stack_file() {
        let config = StackConfig::from_toml_str("dev", FILE).unwrap();

        assert_eq!(config.project(), "InfraLab");
        assert_eq!(config.stack(), "dev");
        assert_eq!(config.get("appServicePlanSize"), Some("F1"));
        assert_eq!(config.get("appServicePlanTier"), Some("Free"));
        assert_eq!(config.get("azure-native:location"), Some("westeurope"));
        assert_eq!(config.require_parsed::<u32>("instanceCount").unwrap(), 2);
        assert_eq!(config.secret_store().get("registryPassword"), Some("from-file"));
    }

    #[test]
    fn default_project_when_file_has_none() {
        let config = StackConfig::from_toml_str("dev", "[config]\na = \"b\"\n").unwrap();
        assert_eq!(config.project(), DEFAULT_PROJECT);
    }

    #[test]
    fn rejects_structured_values() {
        let err = StackConfig::from_toml_str("dev", "[config]\nsku = { name = \"F1\" }\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == "sku"));
    }

    #[test]
    fn rejects_unknown_sections() {
        let err = StackConfig::from_toml_str("dev", "[settings]\na = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn environment_overrides_file() {
        let mut config = StackConfig::from_toml_str("dev", FILE).unwrap();
        let applied = config.apply_env([
            ("STRATUS_CONFIG_appServicePlanTier", "Standard"),
            ("STRATUS_SECRET_registryPassword", "from-env"),
            ("STRATUS_CONFIG_", "ignored"),
            ("PATH", "/usr/bin"),
        ]);

        assert_eq!(applied, 2);
        assert_eq!(config.get("appServicePlanTier"), Some("Standard"));
        assert_eq!(config.secret_store().get("registryPassword"), Some("from-env"));
        assert_eq!(config.get("PATH"), None);
    }

    #[test]
    fn project_override_localizes_its_keys() {
        let text = r#"
project = "InfraLab"

[config]
"WebLab:appServicePlanSize" = "S1"
appServicePlanTier = "Free"
"WebLab:appServicePlanTier" = "Standard"

[secrets]
"WebLab:registryPassword" = "pw"
"#;
        let config = StackConfig::from_toml_str("dev", text)
            .unwrap()
            .with_project("WebLab");

        assert_eq!(config.project(), "WebLab");
        assert_eq!(config.require("appServicePlanSize").unwrap(), "S1");
        assert_eq!(config.require("appServicePlanTier").unwrap(), "Standard");
        assert_eq!(config.get("WebLab:appServicePlanSize"), None);
        assert!(config.require_secret("registryPassword").is_ok());
    }

    #[test]
    fn blank_values_are_missing() {
        let config = StackConfig::new("p", "dev").with_value("tier", "  ");
        assert!(matches!(
            config.require("tier"),
            Err(ConfigError::Missing { ref key }) if key == "tier"
        ));
        assert_eq!(config.get_or("other", "fallback"), "fallback");
    }

    #[test]
    fn parse_failures_are_invalid() {
        let config = StackConfig::new("p", "dev").with_value("count", "many");
        let err = config.require_parsed::<u32>("count").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { ref value, .. } if value == "many"
        ));
    }

    #[test]
    fn secrets_are_referenced_not_copied() {
        let config = StackConfig::new("p", "dev").with_secret("pw", "hunter2");
        let value = config.require_secret("pw").unwrap();

        assert!(value.is_secret());
        assert!(!format!("{value:?}").contains("hunter2"));
        assert!(!format!("{config:?}").contains("hunter2"));
        assert!(matches!(
            config.require_secret("other"),
            Err(ConfigError::Missing { .. })
        ));
    }
}
