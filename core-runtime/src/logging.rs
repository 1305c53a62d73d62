//! # Logging
//!
//! Installs the global `tracing` subscriber for a host or the demo binary.
//! Workspace crates log at the configured level; dependencies (reqwest,
//! symphonia, cpal) stay at `warn` unless a custom filter overrides them.
//!
//! Clip locators carry download tokens in their query string; log them
//! through [`redact_url`].
//!
//! ```ignore
//! use core_runtime::logging::{init_logging, LoggingConfig};
//!
//! init_logging(LoggingConfig::from_env())?;
//! tracing::info!("Application started");
//! ```

use crate::error::{Error, Result};
use tracing::Level;
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub use bridge_traits::logging::redact_url;

/// Environment variable holding `EnvFilter` directives.
pub const ENV_LOG_FILTER: &str = "CLIPDECK_LOG";

/// Crates whose events follow the configured level.
const WORKSPACE_TARGETS: &[&str] = &[
    "clipdeck",
    "core_runtime",
    "core_sync",
    "core_playback",
    "core_service",
    "bridge_desktop",
];

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Single-line human-readable output
    #[default]
    Compact,
    /// One JSON object per event
    Json,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Level for workspace crates when no custom filter is set.
    pub level: Level,
    /// Full `EnvFilter` directive string; replaces the per-crate defaults.
    pub filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: Level::INFO,
            filter: None,
        }
    }
}

impl LoggingConfig {
    /// Defaults, with the filter taken from `CLIPDECK_LOG` when set.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            filter: lookup(ENV_LOG_FILTER).filter(|f| !f.trim().is_empty()),
            ..Self::default()
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    fn directives(&self) -> String {
        if let Some(custom) = &self.filter {
            return custom.clone();
        }
        let level = self.level.as_str().to_ascii_lowercase();
        std::iter::once("warn".to_string())
            .chain(
                WORKSPACE_TARGETS
                    .iter()
                    .map(|target| format!("{}={}", target, level)),
            )
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Install the global subscriber.
///
/// # Errors
///
/// - `Error::Config` when the filter string does not parse
/// - `Error::Logging` when a global subscriber is already installed
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_new(config.directives())
        .map_err(|e| Error::Config(format!("Invalid log filter: {}", e)))?;
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.format {
        LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().flatten_event(true).with_current_span(true))
            .try_init(),
    };
    installed.map_err(|e| Error::Logging(format!("Failed to initialize logging: {}", e)))
}
