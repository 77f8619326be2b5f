//! mezon-e2e CLI library
//!
//! Argument parsing, configuration and the scenario catalogue behind the
//! `mezon-e2e` binary.

#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod config;
mod error;
mod output;
mod runner;
pub mod scenarios;

pub use commands::{Cli, ColorArg, Commands, FormatArg, ListArgs, RunArgs, SeedSessionArgs};
pub use config::{apply_run_args, CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::{summary_line, OutputFormat, ProgressReporter};
pub use runner::{check, launch_browser, load_accounts, run, CliRunner, RunPlan, REPORT_FILE};
pub use scenarios::{catalogue, Target};
