//! mezon-e2e: end-to-end scenario runner for the Mezon chat client
//!
//! ## Usage
//!
//! ```bash
//! mezon-e2e run                          # Run every scenario
//! mezon-e2e run --feature messages       # One feature area
//! mezon-e2e run -f pin --headed          # Filter by name, show the browser
//! mezon-e2e list                         # Scenarios by feature
//! mezon-e2e config                       # Resolved configuration
//! mezon-e2e seed-session --account qa.alice
//! ```

use clap::Parser;
use mezon_e2e::{init_logging, AccountPool, SuiteConfig};
use mezon_e2e_cli::{
    catalogue, Cli, CliConfig, CliError, CliResult, ColorChoice, Commands, ListArgs,
    SeedSessionArgs, Target, Verbosity,
};
use std::process::ExitCode;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> CliResult<()> {
    let cli = Cli::parse();
    let config = build_config(&cli);
    init_logging(&config.log_config())?;

    match cli.command {
        Commands::Run(args) => runtime()?.block_on(mezon_e2e_cli::run(&config, &args)),
        Commands::List(args) => {
            run_list(&args);
            Ok(())
        }
        Commands::Config => run_config(),
        Commands::SeedSession(args) => run_seed_session(&args),
    }
}

fn build_config(cli: &Cli) -> CliConfig {
    let color: ColorChoice = cli.color.into();
    CliConfig::new()
        .with_verbosity(Verbosity::from_flags(cli.verbose, cli.quiet))
        .with_color(color)
        .with_log_json(cli.log_json)
}

fn runtime() -> CliResult<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?)
}

fn run_list(args: &ListArgs) {
    let suite = catalogue(&Target::default());
    for feature in suite.features() {
        if args.feature.as_deref().is_some_and(|f| f != feature) {
            continue;
        }
        println!("{feature}");
        for scenario in suite.scenarios.iter().filter(|s| s.feature == feature) {
            if scenario.tags.is_empty() {
                println!("  {}", scenario.name);
            } else {
                println!("  {} [{}]", scenario.name, scenario.tags.join(", "));
            }
        }
    }
}

fn run_config() -> CliResult<()> {
    let config = SuiteConfig::from_env()?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn run_seed_session(args: &SeedSessionArgs) -> CliResult<()> {
    let config = SuiteConfig::from_env()?;
    let path = args
        .accounts_file
        .clone()
        .or_else(|| config.accounts_file.clone())
        .ok_or_else(|| {
            CliError::config("no accounts file; pass --accounts-file or set E2E_ACCOUNTS_FILE")
        })?;

    let pool = runtime()?.block_on(AccountPool::load(&path))?;
    let account = pool
        .get(&args.account)
        .ok_or_else(|| CliError::invalid_argument(format!("unknown account: {}", args.account)))?;

    let seed = account.session_seed(config.session_endpoint.clone());
    for (key, value) in seed.storage_entries()? {
        println!("{key}={value}");
    }
    Ok(())
}
