//! State-changing actions on resolved elements.
//!
//! Every action resolves its target fresh, acts, and on failure resolves
//! again once before giving up. Handles never outlive a single action.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::deadline::Deadline;
use crate::engine::{AutomationEngine, ElementHandle};
use crate::resolver::{ResolvedElement, Resolver};
use crate::result::{E2eError, E2eResult};
use crate::selector::CandidateList;
use crate::trace::{StepTrace, TraceKind, TraceStatus};

/// Default per-candidate resolution timeout (5 seconds)
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default upper bound for a single engine action (10 seconds)
pub const DEFAULT_ACTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Performs clicks, fills, key presses and uploads
#[derive(Debug, Clone)]
pub struct Interactor {
    resolver: Resolver,
    resolve_timeout: Duration,
    action_timeout: Duration,
    trace: Option<StepTrace>,
}

impl Interactor {
    /// Interactor with default timeouts
    #[must_use]
    pub fn new(resolver: Resolver) -> Self {
        Self {
            resolver,
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
            action_timeout: DEFAULT_ACTION_TIMEOUT,
            trace: None,
        }
    }

    /// Set the per-candidate resolution timeout
    #[must_use]
    pub const fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout;
        self
    }

    /// Set the per-action timeout
    #[must_use]
    pub const fn with_action_timeout(mut self, timeout: Duration) -> Self {
        self.action_timeout = timeout;
        self
    }

    /// Record every action into `trace`
    #[must_use]
    pub fn with_trace(mut self, trace: StepTrace) -> Self {
        self.trace = Some(trace);
        self
    }

    /// Per-candidate resolution timeout
    #[must_use]
    pub const fn resolve_timeout(&self) -> Duration {
        self.resolve_timeout
    }

    /// Resolver used for targets
    #[must_use]
    pub const fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Click the first visible candidate
    pub async fn click(
        &self,
        candidates: &CandidateList,
        deadline: &Deadline,
    ) -> E2eResult<ResolvedElement> {
        self.act("click", candidates, deadline, |engine, el| async move {
            engine.click(&el).await
        })
        .await
    }

    /// Replace the target's value with `text`
    pub async fn fill(
        &self,
        candidates: &CandidateList,
        text: &str,
        deadline: &Deadline,
    ) -> E2eResult<ResolvedElement> {
        self.act("fill", candidates, deadline, move |engine, el| async move {
            engine.fill(&el, text).await
        })
        .await
    }

    /// Press `key` on the target
    pub async fn press(
        &self,
        candidates: &CandidateList,
        key: &str,
        deadline: &Deadline,
    ) -> E2eResult<ResolvedElement> {
        self.act("press", candidates, deadline, move |engine, el| async move {
            engine.press(&el, key).await
        })
        .await
    }

    /// Hover the target
    pub async fn hover(
        &self,
        candidates: &CandidateList,
        deadline: &Deadline,
    ) -> E2eResult<ResolvedElement> {
        self.act("hover", candidates, deadline, |engine, el| async move {
            engine.hover(&el).await
        })
        .await
    }

    /// Attach `files` to a file input
    pub async fn set_input_files(
        &self,
        candidates: &CandidateList,
        files: &[PathBuf],
        deadline: &Deadline,
    ) -> E2eResult<ResolvedElement> {
        if files.is_empty() {
            return Err(E2eError::invalid_argument("no files to attach"));
        }
        self.act(
            "set_input_files",
            candidates,
            deadline,
            move |engine, el| async move { engine.set_input_files(&el, files).await },
        )
        .await
    }

    /// Fill the input with `text` and submit it with Enter
    ///
    /// # Errors
    ///
    /// `InvalidArgument` when `text` is empty or only whitespace.
    pub async fn send_text(
        &self,
        input: &CandidateList,
        text: &str,
        deadline: &Deadline,
    ) -> E2eResult<()> {
        if text.trim().is_empty() {
            return Err(E2eError::invalid_argument("message text must not be empty"));
        }
        self.fill(input, text, deadline).await?;
        self.press(input, "Enter", deadline).await?;
        Ok(())
    }

    async fn act<F, Fut>(
        &self,
        action: &str,
        candidates: &CandidateList,
        deadline: &Deadline,
        op: F,
    ) -> E2eResult<ResolvedElement>
    where
        F: Fn(Arc<dyn AutomationEngine>, ElementHandle) -> Fut,
        Fut: Future<Output = E2eResult<()>>,
    {
        let started = Instant::now();
        let engine = Arc::clone(self.resolver.engine());

        let first = self
            .resolver
            .resolve(candidates, self.resolve_timeout, deadline)
            .await?;
        let attempt = deadline
            .child(self.action_timeout)
            .run(action, op(Arc::clone(&engine), first.element.clone()))
            .await;
        match attempt {
            Ok(()) => {
                debug!(action, candidate = %first.candidate, "action done");
                self.record(action, &first, started, TraceStatus::Ok);
                return Ok(first);
            }
            Err(e) if deadline.check(action).is_err() => return Err(e),
            Err(e) => {
                warn!(
                    action,
                    candidate = %first.candidate,
                    error = %e,
                    "action failed, re-resolving"
                );
            }
        }

        let second = self
            .resolver
            .resolve(candidates, self.resolve_timeout, deadline)
            .await?;
        let attempt = deadline
            .child(self.action_timeout)
            .run(action, op(engine, second.element.clone()))
            .await;
        match attempt {
            Ok(()) => {
                self.record(action, &second, started, TraceStatus::Ok);
                Ok(second)
            }
            Err(e) if deadline.check(action).is_err() => Err(e),
            Err(e) => {
                self.record(action, &second, started, TraceStatus::Error);
                Err(E2eError::Interaction {
                    action: action.to_string(),
                    candidate: second.candidate.to_string(),
                    message: e.to_string(),
                })
            }
        }
    }

    fn record(
        &self,
        action: &str,
        resolved: &ResolvedElement,
        started: Instant,
        status: TraceStatus,
    ) {
        if let Some(trace) = &self.trace {
            trace.record(
                action,
                TraceKind::Action,
                started.elapsed(),
                status,
                [
                    ("candidate", resolved.candidate.to_string()),
                    ("candidate_index", resolved.candidate_index.to_string()),
                ],
            );
        }
    }
}
