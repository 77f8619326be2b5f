//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// mezon-e2e: end-to-end scenario runner for the Mezon chat client
#[derive(Parser, Debug)]
#[command(name = "mezon-e2e")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (only failures and errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorArg,

    /// Log as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the scenario suite against the configured application
    Run(RunArgs),

    /// List scenarios by feature
    List(ListArgs),

    /// Print the resolved configuration as JSON
    Config,

    /// Print the storage values that log an account in
    SeedSession(SeedSessionArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Only scenarios of this feature area
    #[arg(long)]
    pub feature: Option<String>,

    /// Only scenarios whose name contains this text (case-insensitive)
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Scenarios run in parallel
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Retries per failing scenario
    #[arg(long)]
    pub retries: Option<u32>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Application base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Per-scenario deadline in milliseconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Directory for the report, screenshots and traces
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Skip remaining scenarios after the first failure
    #[arg(long)]
    pub fail_fast: bool,

    /// Clan the message scenarios run in
    #[arg(long, env = "E2E_CLAN", default_value = "QA Clan")]
    pub clan: String,

    /// Channel the message scenarios run in
    #[arg(long, env = "E2E_CHANNEL", default_value = "general")]
    pub channel: String,

    /// Usernames the direct-message scenarios talk to (comma-separated)
    #[arg(
        long = "peer",
        env = "E2E_PEERS",
        value_delimiter = ',',
        default_value = "qa.bob,qa.carol"
    )]
    pub peers: Vec<String>,

    /// Output format
    #[arg(long, default_value = "text")]
    pub format: FormatArg,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Only scenarios of this feature area
    #[arg(long)]
    pub feature: Option<String>,
}

/// Arguments for the seed-session command
#[derive(Parser, Debug)]
pub struct SeedSessionArgs {
    /// Username in the accounts file
    #[arg(long)]
    pub account: String,

    /// Accounts file (overrides E2E_ACCOUNTS_FILE)
    #[arg(long)]
    pub accounts_file: Option<PathBuf>,
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}

/// Output format argument
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum FormatArg {
    /// Human-readable lines
    #[default]
    Text,
    /// The JSON run report on stdout
    Json,
}

impl From<FormatArg> for crate::output::OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Text => Self::Text,
            FormatArg::Json => Self::Json,
        }
    }
}
