//! Stack configuration for Stratus programs.
//!
//! A stack is one deployment of a project (`dev`, `prod`, ...). Its
//! configuration is a flat set of string values plus a separate set of
//! secrets, loaded from `Stratus.<stack>.toml` and overlaid by environment
//! variables.
//!
//! Everything here is read before the first resource is declared, so a
//! missing or malformed value fails the program with a [`ConfigError`]
//! before any graph exists.
//!
//! # Example
//!
//! ```
//! use stratus_config::StackConfig;
//!
//! let mut config = StackConfig::from_toml_str(
//!     "dev",
//!     r#"
//!     [config]
//!     appServicePlanTier = "Free"
//!     "#,
//! )
//! .unwrap();
//! config.apply_env([("STRATUS_CONFIG_appServicePlanSize", "F1")]);
//!
//! assert_eq!(config.project(), "InfraLab");
//! assert_eq!(config.require("appServicePlanSize").unwrap(), "F1");
//! ```

mod error;
mod secrets;
mod stack;

pub use error::ConfigError;
pub use secrets::SecretStore;
pub use stack::{
    CONFIG_ENV_PREFIX, DEFAULT_PROJECT, SECRET_ENV_PREFIX, StackConfig, stack_file_path,
};
