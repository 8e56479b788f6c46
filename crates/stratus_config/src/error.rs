//! Configuration errors.

use std::path::PathBuf;

/// Errors raised while loading or reading stack configuration.
///
/// All of these surface before any resource is declared.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required value or secret is absent (or empty).
    #[error("missing required configuration '{key}'")]
    Missing {
        /// The missing key.
        key: String,
    },
    /// A value is present but malformed.
    #[error("invalid value '{value}' for '{key}': {reason}")]
    Invalid {
        /// The offending key.
        key: String,
        /// The value as written.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
    /// The stack file could not be read.
    #[error("failed to read stack file {}: {source}", path.display())]
    Io {
        /// Path of the stack file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The stack file is not valid TOML or has the wrong shape.
    #[error("failed to parse stack file: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ConfigError {
    /// Shorthand for [`ConfigError::Invalid`].
    pub fn invalid(
        key: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        ConfigError::Invalid {
            key: key.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}
