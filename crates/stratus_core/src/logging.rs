//! Logging setup.
//!
//! Provides [`Tracing`], a builder that installs a `tracing` subscriber for a
//! Stratus program, and [`TracingConfig`], the settings it was built with.
//!
//! # Example
//!
//! ```
//! use stratus_core::{Tracing, TracingFormat};
//! use tracing::Level;
//!
//! Tracing::default()
//!     .with_level(Level::DEBUG)
//!     .with_format(TracingFormat::Compact)
//!     .with_env_filter("stratus_graph=debug,stratus_config=info")
//!     .init();
//! ```

use core::fmt;
use core::str::FromStr;

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::BuildInfo;

// ─────────────────────────────────────────────────────────────────────────────
// TracingFormat
// ─────────────────────────────────────────────────────────────────────────────

/// Tracing output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable colored output (default).
    #[default]
    Pretty,
    /// Compact single-line output.
    Compact,
    /// JSON structured output for log aggregation.
    Json,
}

impl fmt::Display for TracingFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TracingFormat::Pretty => "pretty",
            TracingFormat::Compact => "compact",
            TracingFormat::Json => "json",
        })
    }
}

/// Error returned when parsing an unknown [`TracingFormat`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown log format '{0}', expected one of: pretty, compact, json")]
pub struct ParseFormatError(String);

impl FromStr for TracingFormat {
    type Err = ParseFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(TracingFormat::Pretty),
            "compact" => Ok(TracingFormat::Compact),
            "json" => Ok(TracingFormat::Json),
            _ => Err(ParseFormatError(s.to_owned())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TracingConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Settings a [`Tracing`] builder was configured with.
///
/// # Fields
///
/// - `level` - The configured maximum log level
/// - `format` - The output format (Pretty, Compact, or Json)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TracingConfig {
    /// The configured log level.
    pub level: Level,
    /// The configured output format.
    pub format: TracingFormat,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tracing
// ─────────────────────────────────────────────────────────────────────────────

/// Logging setup for Stratus programs.
///
/// Installs a `tracing_subscriber` registry with an [`EnvFilter`] and a
/// formatting layer. Installing twice is harmless: the second call leaves
/// the existing subscriber in place.
///
/// # Configuration Options
///
/// ```
/// use stratus_core::{Tracing, TracingFormat};
/// use tracing::Level;
///
/// // Development: pretty output with span enter/exit events
/// let dev = Tracing::default()
///     .with_level(Level::DEBUG)
///     .with_span_events(true);
///
/// // CI: JSON output for log aggregation
/// let ci = Tracing::default()
///     .with_format(TracingFormat::Json)
///     .with_env_filter("stratus_graph=info,stratus_config=warn");
/// # let _ = (dev, ci);
/// ```
#[derive(Debug, Clone)]
pub struct Tracing {
    /// Maximum log level.
    level: Level,
    /// Output format.
    format: TracingFormat,
    /// Environment filter (e.g., "stratus_graph=debug").
    env_filter: Option<String>,
    /// Whether to include span events (enter/exit).
    span_events: bool,
}

impl Default for Tracing {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: TracingFormat::Pretty,
            env_filter: None,
            span_events: false,
        }
    }
}

impl Tracing {
    /// Creates a builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum log level.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the output format.
    #[must_use]
    pub fn with_format(mut self, format: TracingFormat) -> Self {
        self.format = format;
        self
    }

    /// Sets a custom environment filter string.
    ///
    /// Format: `target=level,target=level,...`. An unparsable filter falls
    /// back to the configured level.
    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    /// Enables span enter/exit events in output.
    #[must_use]
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.span_events = enabled;
        self
    }

    /// Returns the configured settings.
    #[must_use]
    pub fn config(&self) -> TracingConfig {
        TracingConfig {
            level: self.level,
            format: self.format,
        }
    }

    fn filter(&self) -> EnvFilter {
        match &self.env_filter {
            Some(filter) => {
                EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new(self.level.as_str()))
            }
            None => EnvFilter::new(self.level.as_str()),
        }
    }

    /// Installs the global subscriber.
    ///
    /// Returns false if a subscriber was already installed.
    pub fn init(&self) -> bool {
        let env_filter = self.filter();

        let span_events = if self.span_events {
            FmtSpan::ENTER | FmtSpan::EXIT
        } else {
            FmtSpan::NONE
        };

        // Logs go to stderr so stdout stays clean for plan documents.
        let installed = match self.format {
            TracingFormat::Pretty => tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .pretty()
                        .with_writer(std::io::stderr)
                        .with_span_events(span_events),
                )
                .try_init()
                .is_ok(),
            TracingFormat::Compact => tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_writer(std::io::stderr)
                        .with_span_events(span_events),
                )
                .try_init()
                .is_ok(),
            TracingFormat::Json => tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_span_events(span_events),
                )
                .try_init()
                .is_ok(),
        };

        if installed {
            let info = BuildInfo::default();
            tracing::info!(
                level = %self.level,
                format = %self.format,
                version = info.version,
                debug = info.debug,
                "tracing initialized"
            );
        }
        installed
    }
}
