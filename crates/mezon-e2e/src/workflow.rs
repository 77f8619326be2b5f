//! Named multi-step workflows.
//!
//! A [`Workflow`] moves through states one step at a time. A failing step
//! aborts the workflow and its error names both the state it was in and the
//! state it was moving to, so a test failure points at the step.

use std::fmt;
use std::future::Future;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::result::{E2eError, E2eResult};
use crate::trace::{StepTrace, TraceKind, TraceStatus};

/// A state of some workflow
pub trait WorkflowState: Copy + Eq + fmt::Debug + fmt::Display + Send + Sync {}

impl<T> WorkflowState for T where T: Copy + Eq + fmt::Debug + fmt::Display + Send + Sync {}

/// States of the pin-and-jump message workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PinJumpState {
    /// Nothing done yet
    Idle,
    /// The message was sent and is visible
    MessageSent,
    /// The message was pinned
    Pinned,
    /// The pinned-messages modal is open
    ModalOpen,
    /// "Jump" was clicked on the pinned entry
    Jumped,
    /// The original message is highlighted in the channel
    Verified,
}

impl fmt::Display for PinJumpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Step-by-step state machine
#[derive(Debug)]
pub struct Workflow<S: WorkflowState> {
    name: String,
    state: S,
    history: Vec<(S, S)>,
    aborted: Option<(S, S)>,
    trace: Option<StepTrace>,
}

impl<S: WorkflowState> Workflow<S> {
    /// Start `name` in `initial`
    pub fn new(name: impl Into<String>, initial: S) -> Self {
        Self {
            name: name.into(),
            state: initial,
            history: Vec::new(),
            aborted: None,
            trace: None,
        }
    }

    /// Record every transition into `trace`
    #[must_use]
    pub fn with_trace(mut self, trace: Option<StepTrace>) -> Self {
        self.trace = trace;
        self
    }

    /// Workflow name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> S {
        self.state
    }

    /// Completed transitions, oldest first
    #[must_use]
    pub fn history(&self) -> &[(S, S)] {
        &self.history
    }

    /// Failing transition, if the workflow aborted
    #[must_use]
    pub const fn aborted(&self) -> Option<(S, S)> {
        self.aborted
    }

    /// Run `fut` as the step moving to `next`
    ///
    /// # Errors
    ///
    /// `WorkflowStep` wrapping the step's error; `InvalidArgument` when the
    /// workflow already aborted.
    pub async fn step<T, Fut>(&mut self, next: S, fut: Fut) -> E2eResult<T>
    where
        Fut: Future<Output = E2eResult<T>>,
    {
        if let Some((from, to)) = self.aborted {
            return Err(E2eError::invalid_argument(format!(
                "workflow '{}' already aborted in step {from} -> {to}",
                self.name
            )));
        }
        let from = self.state;
        let started = Instant::now();
        match fut.await {
            Ok(value) => {
                info!(workflow = %self.name, step = %format!("{from} -> {next}"), "step done");
                self.record(from, next, started, TraceStatus::Ok);
                self.history.push((from, next));
                self.state = next;
                Ok(value)
            }
            Err(source) => {
                warn!(
                    workflow = %self.name,
                    step = %format!("{from} -> {next}"),
                    error = %source,
                    "step failed"
                );
                self.record(from, next, started, TraceStatus::Error);
                self.aborted = Some((from, next));
                Err(E2eError::WorkflowStep {
                    workflow: self.name.clone(),
                    from: from.to_string(),
                    to: next.to_string(),
                    source: Box::new(source),
                })
            }
        }
    }

    /// Run a verification as the step moving to `next`; `false` fails the step
    pub async fn verify<Fut>(&mut self, next: S, what: &str, fut: Fut) -> E2eResult<()>
    where
        Fut: Future<Output = bool>,
    {
        let what = what.to_string();
        self.step(next, async move {
            if fut.await {
                Ok(())
            } else {
                Err(E2eError::assertion(format!("{what} did not hold")))
            }
        })
        .await
    }

    fn record(&self, from: S, to: S, started: Instant, status: TraceStatus) {
        if let Some(trace) = &self.trace {
            trace.record(
                &format!("{from} -> {to}"),
                TraceKind::WorkflowStep,
                started.elapsed(),
                status,
                [("workflow", self.name.clone())],
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::selector::{Candidate, Selector};

    #[tokio::test]
    async fn test_steps_advance_and_record_history() {
        let mut wf = Workflow::new("pin-and-jump", PinJumpState::Idle);
        wf.step(PinJumpState::MessageSent, async { Ok(()) })
            .await
            .unwrap();
        let n: u32 = wf.step(PinJumpState::Pinned, async { Ok(7) }).await.unwrap();
        assert_eq!(n, 7);
        assert_eq!(wf.state(), PinJumpState::Pinned);
        assert_eq!(
            wf.history(),
            &[
                (PinJumpState::Idle, PinJumpState::MessageSent),
                (PinJumpState::MessageSent, PinJumpState::Pinned)
            ]
        );
    }

    #[tokio::test]
    async fn test_failure_names_the_step() {
        let mut wf = Workflow::new("pin-and-jump", PinJumpState::Pinned);
        let err = wf
            .step::<(), _>(PinJumpState::ModalOpen, async {
                Err(E2eError::ElementNotFound {
                    candidates: vec![Candidate::new(Selector::css("#pinned"))],
                    timeout_ms: 100,
                })
            })
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Pinned -> ModalOpen"), "{msg}");
        assert!(msg.contains("#pinned"), "{msg}");
        assert_eq!(wf.state(), PinJumpState::Pinned);
        assert_eq!(
            wf.aborted(),
            Some((PinJumpState::Pinned, PinJumpState::ModalOpen))
        );
        assert!(err.candidates().is_some());
    }

    #[tokio::test]
    async fn test_aborted_workflow_refuses_more_steps() {
        let mut wf = Workflow::new("w", PinJumpState::Idle);
        let _ = wf
            .step::<(), _>(PinJumpState::MessageSent, async {
                Err(E2eError::engine("down"))
            })
            .await;
        let err = wf
            .step(PinJumpState::MessageSent, async { Ok(()) })
            .await
            .unwrap_err();
        assert!(matches!(err, E2eError::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn test_verify_false_fails_step() {
        let mut wf = Workflow::new("w", PinJumpState::Jumped);
        let err = wf
            .verify(PinJumpState::Verified, "message highlighted", async { false })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("message highlighted"));
    }

    #[tokio::test]
    async fn test_trace_records_transitions() {
        let trace = StepTrace::new();
        let mut wf = Workflow::new("w", PinJumpState::Idle).with_trace(Some(trace.clone()));
        wf.step(PinJumpState::MessageSent, async { Ok(()) })
            .await
            .unwrap();
        assert_eq!(trace.entries()[0].name, "Idle -> MessageSent");
    }
}
