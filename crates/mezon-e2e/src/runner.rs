//! Suite Runner
//!
//! Runs scenarios in parallel up to `workers`, each attempt in a fresh engine
//! context with its own [`Deadline`]. Failing scenarios are retried up to
//! `retries` times; screenshots and traces are captured per the configured
//! modes and referenced from the [`RunReport`].

use futures::future::BoxFuture;
use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::accounts::AccountPool;
use crate::config::{SuiteConfig, VideoMode};
use crate::context::TestContext;
use crate::deadline::Deadline;
use crate::engine::EngineFactory;
use crate::fixture::{AuthFixture, Fixture, FixtureManager};
use crate::reporter::{FailureMode, RunReport, ScenarioReport};
use crate::result::{E2eError, E2eResult};
use crate::trace::StepTrace;

type ScenarioBody = dyn Fn(TestContext) -> BoxFuture<'static, E2eResult<()>> + Send + Sync;
type FixtureFactory = dyn Fn() -> Vec<Box<dyn Fixture>> + Send + Sync;
type SuiteHook = dyn Fn(Arc<SuiteConfig>) -> BoxFuture<'static, E2eResult<()>> + Send + Sync;

/// One named test with its body
#[derive(Clone)]
pub struct Scenario {
    /// Scenario name, unique within a suite
    pub name: String,
    /// Feature area (`messages`, `direct_messages`, ...)
    pub feature: String,
    /// Free-form tags for filtering
    pub tags: Vec<String>,
    body: Arc<ScenarioBody>,
    fixtures: Option<Arc<FixtureFactory>>,
}

impl fmt::Debug for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("feature", &self.feature)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

impl Scenario {
    /// Scenario running `body` against each attempt's context
    pub fn new<F, Fut>(name: impl Into<String>, feature: impl Into<String>, body: F) -> Self
    where
        F: Fn(TestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = E2eResult<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            feature: feature.into(),
            tags: Vec::new(),
            body: Arc::new(move |ctx| body(ctx).boxed()),
            fixtures: None,
        }
    }

    /// Add a tag
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Fixtures built fresh for every attempt
    #[must_use]
    pub fn with_fixtures(
        mut self,
        factory: impl Fn() -> Vec<Box<dyn Fixture>> + Send + Sync + 'static,
    ) -> Self {
        self.fixtures = Some(Arc::new(factory));
        self
    }
}

/// Named collection of scenarios with suite-level hooks
#[derive(Clone, Default)]
pub struct Suite {
    /// Suite name
    pub name: String,
    /// Scenarios, in report order
    pub scenarios: Vec<Scenario>,
    before_all: Option<Arc<SuiteHook>>,
    after_all: Option<Arc<SuiteHook>>,
}

impl fmt::Debug for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suite")
            .field("name", &self.name)
            .field("scenarios", &self.scenarios.len())
            .field("before_all", &self.before_all.is_some())
            .field("after_all", &self.after_all.is_some())
            .finish()
    }
}

impl Suite {
    /// Empty suite
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add a scenario
    #[must_use]
    pub fn with_scenario(mut self, scenario: Scenario) -> Self {
        self.scenarios.push(scenario);
        self
    }

    /// Add a scenario in place
    pub fn add(&mut self, scenario: Scenario) {
        self.scenarios.push(scenario);
    }

    /// Hook run once before any scenario
    #[must_use]
    pub fn with_before_all<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Arc<SuiteConfig>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = E2eResult<()>> + Send + 'static,
    {
        self.before_all = Some(Arc::new(move |config| hook(config).boxed()));
        self
    }

    /// Hook run once after every scenario finished
    #[must_use]
    pub fn with_after_all<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn(Arc<SuiteConfig>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = E2eResult<()>> + Send + 'static,
    {
        self.after_all = Some(Arc::new(move |config| hook(config).boxed()));
        self
    }

    /// Distinct feature names, in first-seen order
    #[must_use]
    pub fn features(&self) -> Vec<&str> {
        let mut features: Vec<&str> = Vec::new();
        for scenario in &self.scenarios {
            if !features.contains(&scenario.feature.as_str()) {
                features.push(&scenario.feature);
            }
        }
        features
    }
}

/// Which scenarios of a suite to run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScenarioFilter {
    /// Exact feature name
    pub feature: Option<String>,
    /// Case-insensitive substring of the scenario name
    pub pattern: Option<String>,
    /// Every tag must be present
    pub tags: Vec<String>,
}

impl ScenarioFilter {
    /// Filter accepting everything
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Restrict to a feature
    #[must_use]
    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.feature = Some(feature.into());
        self
    }

    /// Restrict to names containing `pattern`
    #[must_use]
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    /// Require a tag
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Whether `scenario` is selected
    #[must_use]
    pub fn matches(&self, scenario: &Scenario) -> bool {
        if self.feature.as_ref().is_some_and(|f| *f != scenario.feature) {
            return false;
        }
        if let Some(pattern) = &self.pattern {
            if !scenario
                .name
                .to_lowercase()
                .contains(&pattern.to_lowercase())
            {
                return false;
            }
        }
        self.tags.iter().all(|t| scenario.tags.contains(t))
    }
}

struct AttemptOutcome {
    result: E2eResult<()>,
    screenshot: Option<PathBuf>,
    trace: Option<PathBuf>,
}

/// Runs suites against engine contexts from a factory
#[derive(Debug, Clone)]
pub struct SuiteRunner {
    factory: Arc<dyn EngineFactory>,
    config: Arc<SuiteConfig>,
    failure_mode: FailureMode,
    accounts: Option<AccountPool>,
}

impl SuiteRunner {
    /// Runner creating contexts from `factory`
    #[must_use]
    pub fn new(factory: Arc<dyn EngineFactory>, config: SuiteConfig) -> Self {
        Self {
            factory,
            config: Arc::new(config),
            failure_mode: FailureMode::default(),
            accounts: None,
        }
    }

    /// Set the failure mode
    #[must_use]
    pub const fn with_failure_mode(mut self, mode: FailureMode) -> Self {
        self.failure_mode = mode;
        self
    }

    /// Log every attempt in with an account leased from `pool`
    #[must_use]
    pub fn with_accounts(mut self, pool: AccountPool) -> Self {
        self.accounts = Some(pool);
        self
    }

    /// Suite configuration
    #[must_use]
    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Shut down the engine factory
    pub async fn shutdown(&self) -> E2eResult<()> {
        self.factory.shutdown().await
    }

    /// Run the scenarios of `suite` selected by `filter`
    pub async fn run(&self, suite: &Suite, filter: &ScenarioFilter) -> RunReport {
        let started = Instant::now();
        let mut report = RunReport::new(&suite.name);
        let selected: Vec<&Scenario> = suite
            .scenarios
            .iter()
            .filter(|s| filter.matches(s))
            .collect();
        info!(
            suite = %suite.name,
            scenarios = selected.len(),
            workers = self.config.workers,
            "suite started"
        );
        if self.config.video != VideoMode::Off {
            warn!(
                mode = ?self.config.video,
                "video recording is not supported by this runner; ignoring"
            );
        }

        let before = match &suite.before_all {
            Some(hook) => hook(Arc::clone(&self.config)).await,
            None => Ok(()),
        };

        match before {
            Ok(()) => {
                for scenario_report in self.run_selected(&selected).await {
                    report.push(scenario_report);
                }
            }
            Err(e) => {
                warn!(error = %e, "before_all failed; no scenario runs");
                report.hook_errors.push(format!("before_all: {e}"));
                for scenario in &selected {
                    report.push(ScenarioReport::skipped(&scenario.name, &scenario.feature));
                }
            }
        }

        if let Some(hook) = &suite.after_all {
            if let Err(e) = hook(Arc::clone(&self.config)).await {
                warn!(error = %e, "after_all failed");
                report.hook_errors.push(format!("after_all: {e}"));
            }
        }

        report.duration = started.elapsed();
        info!(summary = %report.summary(), "suite finished");
        report
    }

    async fn run_selected(&self, selected: &[&Scenario]) -> Vec<ScenarioReport> {
        let permits = Arc::new(Semaphore::new(self.config.workers.max(1)));
        let stop = Arc::new(AtomicBool::new(false));
        let mut tasks = JoinSet::new();

        for (index, scenario) in selected.iter().enumerate() {
            let runner = self.clone();
            let scenario = (*scenario).clone();
            let permits = Arc::clone(&permits);
            let stop = Arc::clone(&stop);
            let _ = tasks.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return (index, ScenarioReport::skipped(&scenario.name, &scenario.feature));
                };
                if stop.load(Ordering::SeqCst) {
                    debug!(scenario = %scenario.name, "skipped after earlier failure");
                    return (index, ScenarioReport::skipped(&scenario.name, &scenario.feature));
                }
                let report = runner.run_scenario(&scenario).await;
                if report.status.is_failed() && runner.failure_mode == FailureMode::FailFast {
                    stop.store(true, Ordering::SeqCst);
                }
                (index, report)
            });
        }

        let mut slots: Vec<Option<ScenarioReport>> = vec![None; selected.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, report)) => slots[index] = Some(report),
                Err(e) => warn!(error = %e, "scenario task did not complete"),
            }
        }

        slots
            .into_iter()
            .zip(selected)
            .map(|(slot, scenario)| {
                slot.unwrap_or_else(|| {
                    let err = E2eError::engine("scenario task panicked");
                    ScenarioReport::finished(
                        &scenario.name,
                        &scenario.feature,
                        1,
                        std::time::Duration::ZERO,
                        Some(&err),
                    )
                })
            })
            .collect()
    }

    /// Run one scenario with retries
    pub async fn run_scenario(&self, scenario: &Scenario) -> ScenarioReport {
        let started = Instant::now();
        let max_attempts = self.config.retries.saturating_add(1);
        let mut attempts = 0;
        let mut last_error = None;
        let mut screenshot = None;
        let mut trace = None;

        for attempt in 0..max_attempts {
            attempts += 1;
            let outcome = self.run_attempt(scenario, attempt).await;
            screenshot = outcome.screenshot.or(screenshot);
            trace = outcome.trace.or(trace);
            match outcome.result {
                Ok(()) => {
                    last_error = None;
                    break;
                }
                Err(e) => {
                    warn!(scenario = %scenario.name, attempt, error = %e, "attempt failed");
                    last_error = Some(e);
                }
            }
        }

        let mut report = ScenarioReport::finished(
            &scenario.name,
            &scenario.feature,
            attempts,
            started.elapsed(),
            last_error.as_ref(),
        );
        report.screenshot = screenshot;
        report.trace = trace;
        info!(scenario = %scenario.name, status = %report.status, attempts, "scenario finished");
        report
    }

    async fn run_attempt(&self, scenario: &Scenario, attempt: u32) -> AttemptOutcome {
        let engine = match self.factory.new_context().await {
            Ok(engine) => engine,
            Err(e) => {
                return AttemptOutcome {
                    result: Err(e),
                    screenshot: None,
                    trace: None,
                }
            }
        };
        let deadline = Deadline::after(self.config.test_timeout);
        let step_trace = self.config.trace.records(attempt).then(StepTrace::new);
        let mut ctx = TestContext::new(
            Arc::clone(&engine),
            Arc::clone(&self.config),
            scenario.name.clone(),
            deadline.clone(),
        );
        if let Some(t) = &step_trace {
            ctx = ctx.with_trace(t.clone());
        }

        let mut fixtures = FixtureManager::new();
        if let Some(pool) = &self.accounts {
            fixtures.register(AuthFixture::new(pool.clone()));
        }
        if let Some(factory) = &scenario.fixtures {
            for fixture in factory() {
                fixtures.register_boxed(fixture);
            }
        }

        debug!(scenario = %scenario.name, attempt, "attempt started");
        let result = match fixtures.setup_all(&ctx).await {
            Ok(()) => {
                let body = deadline
                    .run(&format!("scenario '{}'", scenario.name), (scenario.body)(ctx.clone()))
                    .await;
                let teardown = fixtures.teardown_all(&ctx).await;
                match (body, teardown) {
                    (Err(e), Err(t)) => {
                        warn!(error = %t, "fixture teardown failed after a failed body");
                        Err(e)
                    }
                    (Err(e), Ok(())) => Err(e),
                    (Ok(()), teardown) => teardown,
                }
            }
            Err(e) => Err(e),
        };
        deadline.cancel();

        let failed = result.is_err();
        let dir = self.config.output_dir.join(artifact_dir(&scenario.name));
        let mut screenshot = None;
        if self.config.screenshot.captures(failed) {
            let path = dir.join(format!("attempt-{attempt}.png"));
            match engine.screenshot().await {
                Ok(shot) => match shot.save(&path).await {
                    Ok(()) => screenshot = Some(path),
                    Err(e) => warn!(error = %e, "could not save screenshot"),
                },
                Err(e) => warn!(error = %e, "could not capture screenshot"),
            }
        }

        let mut trace = None;
        if let Some(t) = step_trace {
            if self.config.trace.keeps(attempt, failed) {
                let path = dir.join(format!("attempt-{attempt}-trace.json"));
                match t.write(&path, &scenario.name, attempt).await {
                    Ok(()) => trace = Some(path),
                    Err(e) => warn!(error = %e, "could not write trace"),
                }
            }
        }

        if let Err(e) = engine.close().await {
            warn!(error = %e, "engine context did not close cleanly");
        }

        AttemptOutcome {
            result,
            screenshot,
            trace,
        }
    }
}

/// Directory name for a scenario's artifacts
#[must_use]
pub fn artifact_dir(scenario: &str) -> String {
    let mut slug = String::with_capacity(scenario.len());
    for c in scenario.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}
