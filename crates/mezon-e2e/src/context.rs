//! Per-scenario context.
//!
//! Built by the runner for each attempt: one engine context, the resolver
//! stack configured from [`SuiteConfig`], and the attempt's [`Deadline`].

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::catalog;
use crate::config::SuiteConfig;
use crate::deadline::Deadline;
use crate::engine::AutomationEngine;
use crate::interaction::Interactor;
use crate::resolver::{ResolvedElement, Resolver};
use crate::result::{E2eError, E2eResult};
use crate::selector::CandidateList;
use crate::trace::{StepTrace, TraceKind, TraceStatus};
use crate::verify::Verifier;

/// Everything a scenario body needs, cheap to clone
#[derive(Debug, Clone)]
pub struct TestContext {
    engine: Arc<dyn AutomationEngine>,
    resolver: Resolver,
    interactor: Interactor,
    verifier: Verifier,
    config: Arc<SuiteConfig>,
    deadline: Deadline,
    scenario: String,
    trace: Option<StepTrace>,
}

impl TestContext {
    /// Context over `engine` configured from `config`
    #[must_use]
    pub fn new(
        engine: Arc<dyn AutomationEngine>,
        config: Arc<SuiteConfig>,
        scenario: impl Into<String>,
        deadline: Deadline,
    ) -> Self {
        let resolver =
            Resolver::new(Arc::clone(&engine)).with_poll_interval(config.poll_interval);
        let interactor = Interactor::new(resolver.clone())
            .with_resolve_timeout(config.resolve_timeout)
            .with_action_timeout(config.action_timeout);
        let verifier = Verifier::new(resolver.clone(), config.poll_options());
        Self {
            engine,
            resolver,
            interactor,
            verifier,
            config,
            deadline,
            scenario: scenario.into(),
            trace: None,
        }
    }

    /// Record resolutions, actions and navigation into `trace`
    #[must_use]
    pub fn with_trace(mut self, trace: StepTrace) -> Self {
        self.interactor = self.interactor.with_trace(trace.clone());
        self.trace = Some(trace);
        self
    }

    /// Engine context of this attempt
    #[must_use]
    pub fn engine(&self) -> &Arc<dyn AutomationEngine> {
        &self.engine
    }

    /// Resolver
    #[must_use]
    pub const fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Action layer
    #[must_use]
    pub const fn interactor(&self) -> &Interactor {
        &self.interactor
    }

    /// Verification layer
    #[must_use]
    pub const fn verifier(&self) -> &Verifier {
        &self.verifier
    }

    /// Suite configuration
    #[must_use]
    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Deadline of this attempt
    #[must_use]
    pub const fn deadline(&self) -> &Deadline {
        &self.deadline
    }

    /// Scenario name
    #[must_use]
    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    /// Trace of this attempt, if recording
    #[must_use]
    pub const fn trace(&self) -> Option<&StepTrace> {
        self.trace.as_ref()
    }

    /// Append a step to the trace, if recording
    pub fn record(&self, name: &str, kind: TraceKind, duration: Duration, status: TraceStatus) {
        if let Some(trace) = &self.trace {
            trace.record(name, kind, duration, status, [("scenario", self.scenario.as_str())]);
        }
    }

    /// Navigate to an application path (or absolute URL)
    pub async fn goto(&self, path: &str) -> E2eResult<()> {
        let url = self.config.url_for(path);
        let started = Instant::now();
        let outcome = self
            .deadline
            .child(self.config.navigation_timeout)
            .run(&format!("navigation to {url}"), self.engine.navigate(&url))
            .await;
        let status = if outcome.is_ok() {
            TraceStatus::Ok
        } else {
            TraceStatus::Error
        };
        self.record(&format!("goto {path}"), TraceKind::Navigation, started.elapsed(), status);
        match outcome {
            Ok(()) => {
                debug!(url = %url, "navigated");
                Ok(())
            }
            Err(e @ E2eError::Navigation { .. }) => Err(e),
            Err(e) if self.deadline.check("navigation").is_err() => Err(e),
            Err(e) => Err(E2eError::Navigation {
                url,
                message: e.to_string(),
            }),
        }
    }

    /// Resolve with the configured per-candidate timeout
    pub async fn resolve(&self, candidates: &CandidateList) -> E2eResult<ResolvedElement> {
        let started = Instant::now();
        let outcome = self
            .resolver
            .resolve(candidates, self.config.resolve_timeout, &self.deadline)
            .await;
        let (name, status) = match &outcome {
            Ok(found) => (found.candidate.to_string(), TraceStatus::Ok),
            Err(_) => (candidates.to_string(), TraceStatus::Error),
        };
        self.record(&name, TraceKind::Resolution, started.elapsed(), status);
        outcome
    }

    /// Resolve a catalog key
    pub async fn resolve_key(&self, key: &str) -> E2eResult<ResolvedElement> {
        self.resolve(&catalog::candidates(key)?).await
    }

    /// Click the element behind a catalog key
    pub async fn click_key(&self, key: &str) -> E2eResult<ResolvedElement> {
        self.interactor
            .click(&catalog::candidates(key)?, &self.deadline)
            .await
    }

    /// Fill the element behind a catalog key
    pub async fn fill_key(&self, key: &str, text: &str) -> E2eResult<ResolvedElement> {
        self.interactor
            .fill(&catalog::candidates(key)?, text, &self.deadline)
            .await
    }

    /// Poll until the element behind a catalog key is visible
    pub async fn key_visible(&self, key: &str) -> E2eResult<bool> {
        Ok(self
            .verifier
            .poll_until_visible(&catalog::candidates(key)?, &self.deadline)
            .await)
    }
}
