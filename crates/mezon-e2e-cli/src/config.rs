//! CLI configuration

use mezon_e2e::{LogConfig, SuiteConfig};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::commands::RunArgs;
use crate::error::{CliError, CliResult};

/// CLI verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Verbosity {
    /// Quiet - failures only
    Quiet,
    /// Normal - default output
    #[default]
    Normal,
    /// Verbose - extra output
    Verbose,
    /// Debug - maximum output
    Debug,
}

impl Verbosity {
    /// Level for a `-v` count, or quiet
    #[must_use]
    pub const fn from_flags(verbose: u8, quiet: bool) -> Self {
        if quiet {
            return Self::Quiet;
        }
        match verbose {
            0 => Self::Normal,
            1 => Self::Verbose,
            _ => Self::Debug,
        }
    }

    /// Check if quiet mode
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// Check if verbose or higher
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug)
    }

    const fn verbose_count(self) -> u8 {
        match self {
            Self::Quiet | Self::Normal => 0,
            Self::Verbose => 1,
            Self::Debug => 2,
        }
    }
}

/// Color output choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorChoice {
    /// Always use colors
    Always,
    /// Use colors when output is a terminal
    #[default]
    Auto,
    /// Never use colors
    Never,
}

impl ColorChoice {
    /// Should use colors based on output detection
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => console::Term::stderr().features().colors_supported(),
        }
    }
}

/// Global CLI options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Verbosity level
    pub verbosity: Verbosity,
    /// Color output choice
    pub color: ColorChoice,
    /// Log as JSON lines
    pub log_json: bool,
}

impl CliConfig {
    /// Create new default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set verbosity
    #[must_use]
    pub const fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set color choice
    #[must_use]
    pub const fn with_color(mut self, color: ColorChoice) -> Self {
        self.color = color;
        self
    }

    /// Set JSON logging
    #[must_use]
    pub const fn with_log_json(mut self, json: bool) -> Self {
        self.log_json = json;
        self
    }

    /// Subscriber configuration for these options
    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        LogConfig::from_verbosity(self.verbosity.verbose_count(), self.verbosity.is_quiet())
            .with_json(self.log_json)
    }
}

/// Apply `run` flags on top of the environment-derived configuration
pub fn apply_run_args(mut config: SuiteConfig, args: &RunArgs) -> CliResult<SuiteConfig> {
    if let Some(url) = &args.base_url {
        config.base_url = url.trim().trim_end_matches('/').to_string();
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(retries) = args.retries {
        config.retries = retries;
    }
    if let Some(ms) = args.timeout {
        config.test_timeout = Duration::from_millis(ms);
    }
    if let Some(dir) = &args.output {
        config.output_dir.clone_from(dir);
    }
    if args.headed {
        config.headless = false;
    }
    config
        .validate()
        .map_err(|e| CliError::invalid_argument(e.to_string()))?;
    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod verbosity_tests {
        use super::*;

        #[test]
        fn test_from_flags() {
            assert_eq!(Verbosity::from_flags(0, false), Verbosity::Normal);
            assert_eq!(Verbosity::from_flags(1, false), Verbosity::Verbose);
            assert_eq!(Verbosity::from_flags(5, false), Verbosity::Debug);
            assert_eq!(Verbosity::from_flags(3, true), Verbosity::Quiet);
        }

        #[test]
        fn test_is_verbose() {
            assert!(!Verbosity::Quiet.is_verbose());
            assert!(!Verbosity::Normal.is_verbose());
            assert!(Verbosity::Verbose.is_verbose());
            assert!(Verbosity::Debug.is_verbose());
        }

        #[test]
        fn test_log_config_follows_verbosity() {
            let quiet = CliConfig::new().with_verbosity(Verbosity::Quiet).log_config();
            assert_eq!(quiet.filter, "error");
            let debug = CliConfig::new()
                .with_verbosity(Verbosity::Debug)
                .with_log_json(true)
                .log_config();
            assert!(debug.filter.contains("mezon_e2e=trace"));
            assert!(debug.json);
        }
    }

    mod color_tests {
        use super::*;

        #[test]
        fn test_explicit_choices() {
            assert!(ColorChoice::Always.should_color());
            assert!(!ColorChoice::Never.should_color());
        }
    }

    mod run_args_tests {
        use super::*;

        #[test]
        fn test_flags_override_environment() {
            let args = RunArgs {
                base_url: Some("https://dev.mezon.test/".into()),
                workers: Some(2),
                retries: Some(3),
                timeout: Some(45_000),
                output: Some("out/e2e".into()),
                headed: true,
                ..RunArgs::default()
            };
            let config = apply_run_args(SuiteConfig::default(), &args).unwrap();
            assert_eq!(config.base_url, "https://dev.mezon.test");
            assert_eq!(config.workers, 2);
            assert_eq!(config.retries, 3);
            assert_eq!(config.test_timeout, Duration::from_secs(45));
            assert_eq!(config.output_dir, std::path::PathBuf::from("out/e2e"));
            assert!(!config.headless);
        }

        #[test]
        fn test_absent_flags_keep_environment() {
            let base = SuiteConfig::default().with_retries(1);
            let config = apply_run_args(base.clone(), &RunArgs::default()).unwrap();
            assert_eq!(config, base);
        }

        #[test]
        fn test_zero_workers_rejected() {
            let args = RunArgs {
                workers: Some(0),
                ..RunArgs::default()
            };
            let err = apply_run_args(SuiteConfig::default(), &args).unwrap_err();
            assert!(err.to_string().contains("E2E_WORKERS"));
        }
    }
}
