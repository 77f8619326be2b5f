//! Subscriber setup for suite runs.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::result::{E2eError, E2eResult};

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Default filter directive, overridden by `RUST_LOG`
    pub filter: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "mezon_e2e=info".to_string(),
            json: false,
        }
    }
}

impl LogConfig {
    /// Filter for a verbosity count (`-v`, `-vv`) or quiet mode
    #[must_use]
    pub fn from_verbosity(verbose: u8, quiet: bool) -> Self {
        let filter = if quiet {
            "error"
        } else {
            match verbose {
                0 => "warn,mezon_e2e=info",
                1 => "info,mezon_e2e=debug",
                _ => "debug,mezon_e2e=trace",
            }
        };
        Self {
            filter: filter.to_string(),
            json: false,
        }
    }

    /// Emit JSON lines
    #[must_use]
    pub const fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    fn env_filter(&self) -> E2eResult<EnvFilter> {
        match std::env::var(EnvFilter::DEFAULT_ENV) {
            Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives),
            _ => EnvFilter::try_new(&self.filter),
        }
        .map_err(|e| E2eError::config(format!("invalid log filter: {e}")))
    }
}

/// Install the global subscriber
///
/// Returns `Ok(false)` when a subscriber was already installed.
pub fn init_logging(config: &LogConfig) -> E2eResult<bool> {
    let filter = config.env_filter()?;
    let registry = tracing_subscriber::registry().with(filter);
    let installed = if config.json {
        registry
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };
    Ok(installed.is_ok())
}
