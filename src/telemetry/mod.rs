//! Tracing Initialization
//!
//! `TigerStyle`: Optional telemetry with graceful fallback. Never panics if
//! a subscriber is already installed.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use lesson_memory::telemetry::{TelemetryConfig, init_tracing};
//!
//! // Initialize with defaults (reads RUST_LOG)
//! init_tracing(TelemetryConfig::default()).expect("tracing init");
//!
//! // Or configure explicitly
//! let config = TelemetryConfig::builder()
//!     .default_directive("lesson_memory=debug")
//!     .with_target(false)
//!     .build();
//! init_tracing(config).expect("tracing init");
//! ```
//!
//! ## Environment Variables
//!
//! - `RUST_LOG` - Filter directives (default: "info")

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Telemetry configuration errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// Tracing initialization failed
    #[error("tracing initialization failed: {reason}")]
    InitFailed {
        /// The reason for the failure
        reason: String,
    },

    /// Invalid filter directive
    #[error("invalid filter directive: {directive}")]
    InvalidDirective {
        /// The rejected directive string
        directive: String,
    },
}

/// Result type for telemetry operations
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Configuration for tracing output.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub default_directive: String,

    /// Include event targets in output
    pub with_target: bool,

    /// Include span close timings in output
    pub with_timing: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            default_directive: "info".to_string(),
            with_target: true,
            with_timing: false,
        }
    }
}

impl TelemetryConfig {
    /// Create a new builder for `TelemetryConfig`
    #[must_use]
    pub fn builder() -> TelemetryConfigBuilder {
        TelemetryConfigBuilder::default()
    }

    fn validate(&self) -> Result<()> {
        if self.default_directive.is_empty() {
            return Err(TelemetryError::InvalidDirective {
                directive: "default directive cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Builder for `TelemetryConfig`
#[derive(Default)]
pub struct TelemetryConfigBuilder {
    default_directive: Option<String>,
    with_target: Option<bool>,
    with_timing: Option<bool>,
}

impl TelemetryConfigBuilder {
    /// Set the fallback filter directive
    #[must_use]
    pub fn default_directive(mut self, directive: impl Into<String>) -> Self {
        self.default_directive = Some(directive.into());
        self
    }

    /// Toggle event targets in output
    #[must_use]
    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = Some(enabled);
        self
    }

    /// Toggle span close timings in output
    #[must_use]
    pub fn with_timing(mut self, enabled: bool) -> Self {
        self.with_timing = Some(enabled);
        self
    }

    /// Build the `TelemetryConfig`
    #[must_use]
    pub fn build(self) -> TelemetryConfig {
        let default = TelemetryConfig::default();
        TelemetryConfig {
            default_directive: self.default_directive.unwrap_or(default.default_directive),
            with_target: self.with_target.unwrap_or(default.with_target),
            with_timing: self.with_timing.unwrap_or(default.with_timing),
        }
    }
}

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured default directive. Calling this twice
/// (or alongside another subscriber, e.g. in tests) returns `InitFailed`
/// rather than panicking.
///
/// # Errors
/// Returns `TelemetryError::InitFailed` if a global subscriber is already
/// set, or `InvalidDirective` for an unusable config.
pub fn init_tracing(config: TelemetryConfig) -> Result<()> {
    config.validate()?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_directive))
        .map_err(|e| TelemetryError::InvalidDirective {
            directive: format!("{}: {e}", config.default_directive),
        })?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target);

    let result = if config.with_timing {
        builder
            .with_span_events(tracing_subscriber::fmt::format::FmtSpan::CLOSE)
            .try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|e| TelemetryError::InitFailed {
        reason: e.to_string(),
    })?;

    tracing::info!("tracing initialized");
    Ok(())
}
