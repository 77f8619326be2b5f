//! Result and error types for mezon-e2e.
//!
//! Verification timeouts are deliberately absent: a polling check that never
//! becomes true is reported as `false`, not as an error.

use crate::selector::Candidate;
use thiserror::Error;

/// Result type for mezon-e2e operations
pub type E2eResult<T> = Result<T, E2eError>;

/// Errors that can occur while driving the application under test
#[derive(Debug, Error)]
pub enum E2eError {
    /// Every candidate of a resolution attempt failed
    #[error(
        "Element not found after trying {} candidate(s) with {timeout_ms}ms each: [{}]",
        .candidates.len(),
        format_candidates(.candidates)
    )]
    ElementNotFound {
        /// Candidates in the exact order they were attempted
        candidates: Vec<Candidate>,
        /// Per-candidate timeout that was used
        timeout_ms: u64,
    },

    /// An element was found but the requested action failed
    #[error("{action} failed on {candidate}: {message}")]
    Interaction {
        /// Action name (click, fill, press, ...)
        action: String,
        /// Candidate the element was resolved through
        candidate: String,
        /// Error message
        message: String,
    },

    /// The element was detached from the document between resolution and action
    #[error("Element {element} is detached from the document")]
    Detached {
        /// Element identifier
        element: String,
    },

    /// A workflow step failed
    #[error("Workflow '{workflow}' failed in step {from} -> {to}: {source}")]
    WorkflowStep {
        /// Workflow name
        workflow: String,
        /// State the workflow was in
        from: String,
        /// State the failing step was moving to
        to: String,
        /// Originating error
        #[source]
        source: Box<E2eError>,
    },

    /// The scenario deadline passed
    #[error("Deadline exceeded while waiting for {waited_for}")]
    DeadlineExceeded {
        /// What was being waited for
        waited_for: String,
    },

    /// The scenario was cancelled
    #[error("Cancelled while waiting for {waited_for}")]
    Cancelled {
        /// What was being waited for
        waited_for: String,
    },

    /// Invalid argument passed to an operation
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// Automation engine error
    #[error("Engine error: {message}")]
    Engine {
        /// Error message
        message: String,
    },

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// Fixture error (setup/teardown failed)
    #[error("Fixture error: {message}")]
    Fixture {
        /// Error message
        message: String,
    },

    /// Assertion failed inside a scenario
    #[error("Assertion failed: {message}")]
    AssertionFailed {
        /// Error message
        message: String,
    },

    /// No account could be leased from the pool
    #[error("Account pool exhausted: {message}")]
    AccountPoolExhausted {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

fn format_candidates(candidates: &[Candidate]) -> String {
    candidates
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl E2eError {
    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create an engine error
    #[must_use]
    pub fn engine(message: impl Into<String>) -> Self {
        Self::Engine {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a fixture error
    #[must_use]
    pub fn fixture(message: impl Into<String>) -> Self {
        Self::Fixture {
            message: message.into(),
        }
    }

    /// Create an assertion error
    #[must_use]
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::AssertionFailed {
            message: message.into(),
        }
    }

    /// Whether this error came from the scenario deadline or cancellation
    #[must_use]
    pub const fn is_deadline(&self) -> bool {
        matches!(self, Self::DeadlineExceeded { .. } | Self::Cancelled { .. })
    }

    /// Candidates attached to this error, following workflow wrapping
    #[must_use]
    pub fn candidates(&self) -> Option<&[Candidate]> {
        match self {
            Self::ElementNotFound { candidates, .. } => Some(candidates),
            Self::WorkflowStep { source, .. } => source.candidates(),
            _ => None,
        }
    }
}

/// Fail the current scenario unless `condition` holds
///
/// # Errors
///
/// Returns `AssertionFailed` carrying `message` when `condition` is false.
pub fn ensure(condition: bool, message: impl Into<String>) -> E2eResult<()> {
    if condition {
        Ok(())
    } else {
        Err(E2eError::assertion(message))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::selector::Selector;

    #[test]
    fn test_element_not_found_lists_candidates_in_order() {
        let err = E2eError::ElementNotFound {
            candidates: vec![
                Candidate::new(Selector::css("#a")),
                Candidate::new(Selector::css("#b")),
            ],
            timeout_ms: 500,
        };
        let msg = err.to_string();
        assert!(msg.contains("2 candidate(s)"));
        assert!(msg.contains("500ms"));
        assert!(msg.find("#a").unwrap() < msg.find("#b").unwrap());
    }

    #[test]
    fn test_workflow_step_exposes_inner_candidates() {
        let inner = E2eError::ElementNotFound {
            candidates: vec![Candidate::new(Selector::css("#pin"))],
            timeout_ms: 100,
        };
        let err = E2eError::WorkflowStep {
            workflow: "pin-and-jump".into(),
            from: "MessageSent".into(),
            to: "Pinned".into(),
            source: Box::new(inner),
        };
        assert_eq!(err.candidates().unwrap().len(), 1);
        assert!(err.to_string().contains("MessageSent -> Pinned"));
    }

    #[test]
    fn test_deadline_classification() {
        assert!(E2eError::Cancelled {
            waited_for: "x".into()
        }
        .is_deadline());
        assert!(!E2eError::engine("boom").is_deadline());
    }

    #[test]
    fn test_ensure() {
        assert!(ensure(true, "fine").is_ok());
        let err = ensure(false, "message mismatch").unwrap_err();
        assert!(err.to_string().contains("message mismatch"));
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: E2eError = io_err.into();
        assert!(err.to_string().contains("I/O"));
    }
}
