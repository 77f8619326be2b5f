//! Suite execution for `mezon-e2e run`

use mezon_e2e::{
    AccountPool, EngineFactory, FailureMode, RunReport, ScenarioFilter, Suite, SuiteConfig,
    SuiteRunner,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::commands::RunArgs;
use crate::config::{apply_run_args, CliConfig};
use crate::error::{CliError, CliResult};
use crate::output::{OutputFormat, ProgressReporter};
use crate::scenarios::{catalogue, Target};

/// File name of the JSON report inside the output directory
pub const REPORT_FILE: &str = "report.json";

/// Everything `run` needs, resolved from environment and flags
#[derive(Debug, Clone)]
pub struct RunPlan {
    /// Suite configuration
    pub config: SuiteConfig,
    /// Clan, channel and peers the scenarios use
    pub target: Target,
    /// Scenario selection
    pub filter: ScenarioFilter,
    /// Stop after the first failure or run everything
    pub failure_mode: FailureMode,
    /// Result output format
    pub format: OutputFormat,
}

impl RunPlan {
    /// Plan from environment-derived `base` and the `run` flags
    pub fn from_args(base: SuiteConfig, args: &RunArgs) -> CliResult<Self> {
        let config = apply_run_args(base, args)?;
        let mut filter = ScenarioFilter::all();
        if let Some(feature) = &args.feature {
            filter = filter.with_feature(feature.trim());
        }
        if let Some(pattern) = &args.filter {
            filter = filter.with_pattern(pattern.trim());
        }
        let peers = args
            .peers
            .iter()
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        Ok(Self {
            config,
            target: Target::new(args.clan.trim(), args.channel.trim()).with_peers(peers),
            filter,
            failure_mode: if args.fail_fast {
                FailureMode::FailFast
            } else {
                FailureMode::CollectAll
            },
            format: args.format.into(),
        })
    }

    /// Where the JSON report is written
    #[must_use]
    pub fn report_path(&self) -> PathBuf {
        self.config.output_dir.join(REPORT_FILE)
    }
}

/// Runs a suite and reports progress on the terminal
#[derive(Debug)]
pub struct CliRunner {
    reporter: ProgressReporter,
}

impl CliRunner {
    /// Runner reporting per the global options
    #[must_use]
    pub fn new(cli: &CliConfig) -> Self {
        Self {
            reporter: ProgressReporter::new(cli.color.should_color(), cli.verbosity.is_quiet()),
        }
    }

    /// Run the selected scenarios of `suite` and write the JSON report
    pub async fn execute(
        &mut self,
        factory: Arc<dyn EngineFactory>,
        plan: &RunPlan,
        suite: &Suite,
        accounts: Option<AccountPool>,
    ) -> CliResult<RunReport> {
        let selected = suite
            .scenarios
            .iter()
            .filter(|s| plan.filter.matches(s))
            .count();
        if selected == 0 {
            return Err(CliError::invalid_argument("no scenario matches the filter"));
        }

        self.reporter.header(&format!("Running {selected} scenarios"));
        self.reporter
            .info(&format!("Target: {}", plan.config.base_url));

        let mut runner = SuiteRunner::new(Arc::clone(&factory), plan.config.clone())
            .with_failure_mode(plan.failure_mode);
        if let Some(pool) = accounts {
            runner = runner.with_accounts(pool);
        }

        self.reporter.start_spinner(&suite.name);
        let report = runner.run(suite, &plan.filter).await;
        self.reporter.finish();

        if let Err(e) = runner.shutdown().await {
            warn!(error = %e, "engine shutdown failed");
        }

        let path = plan.report_path();
        report.write_json(&path).await?;
        debug!(path = %path.display(), "report written");

        match plan.format {
            OutputFormat::Text => {
                for scenario in &report.scenarios {
                    self.reporter.scenario(scenario);
                }
                self.reporter.summary(&report);
                self.reporter.info(&format!("Report: {}", path.display()));
            }
            OutputFormat::Json => println!("{}", report.to_json()?),
        }
        Ok(report)
    }
}

/// Fail when any scenario or suite hook failed
pub fn check(report: &RunReport) -> CliResult<()> {
    if report.all_passed() {
        Ok(())
    } else {
        Err(CliError::suite_failed(report.summary()))
    }
}

/// Account pool from the configured accounts file, if any
pub async fn load_accounts(config: &SuiteConfig) -> CliResult<Option<AccountPool>> {
    match &config.accounts_file {
        Some(path) => Ok(Some(AccountPool::load(path).await?)),
        None => Ok(None),
    }
}

/// Shared Chromium for the run
#[cfg(feature = "browser")]
pub async fn launch_browser(config: &SuiteConfig) -> CliResult<Arc<dyn EngineFactory>> {
    use mezon_e2e::{CdpEngineFactory, CdpOptions};

    let mut options = CdpOptions::default()
        .with_headless(config.headless)
        .with_navigation_timeout(config.navigation_timeout);
    if config.ci {
        options = options.without_sandbox();
    }
    Ok(Arc::new(CdpEngineFactory::launch(options).await?))
}

/// Shared Chromium for the run
#[cfg(not(feature = "browser"))]
#[allow(clippy::unused_async)]
pub async fn launch_browser(_config: &SuiteConfig) -> CliResult<Arc<dyn EngineFactory>> {
    Err(CliError::config(
        "this build has no browser support; rebuild with --features browser",
    ))
}

/// `mezon-e2e run`
pub async fn run(cli: &CliConfig, args: &RunArgs) -> CliResult<()> {
    let plan = RunPlan::from_args(SuiteConfig::from_env()?, args)?;
    let suite = catalogue(&plan.target);
    let accounts = load_accounts(&plan.config).await?;
    if accounts.is_none() {
        warn!("no accounts file configured; scenarios run logged out");
    }
    let factory = launch_browser(&plan.config).await?;
    let report = CliRunner::new(cli)
        .execute(factory, &plan, &suite, accounts)
        .await?;
    check(&report)
}
