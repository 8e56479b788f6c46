//! Core infrastructure for Stratus programs.
//!
//! This crate provides the ambient pieces most Stratus programs need:
//!
//! - [`Tracing`] - Logging and observability via the `tracing` crate
//! - [`BuildInfo`] - Version and build profile of the running program
//!
//! # Example
//!
//! ```
//! use stratus_core::{BuildInfo, Tracing, TracingFormat};
//! use tracing::Level;
//!
//! Tracing::new()
//!     .with_level(Level::DEBUG)
//!     .with_format(TracingFormat::Compact)
//!     .init();
//!
//! let info = BuildInfo::default();
//! tracing::info!(version = info.version, "starting");
//! ```

mod logging;

pub use logging::{ParseFormatError, Tracing, TracingConfig, TracingFormat};

/// Version and build profile of the Stratus libraries.
///
/// # Fields
///
/// - `version` - Crate version string (from `CARGO_PKG_VERSION`)
/// - `debug` - Whether the build has debug assertions enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildInfo {
    /// Library version string.
    pub version: &'static str,
    /// Whether running a debug build.
    pub debug: bool,
}

impl Default for BuildInfo {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            debug: cfg!(debug_assertions),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_info_default() {
        let info = BuildInfo::default();
        assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(info.debug, cfg!(debug_assertions));
    }
}
