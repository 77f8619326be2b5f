//! Bounded polling.
//!
//! [`poll_until`] is the one polling primitive: every wait in the crate goes
//! through it with an explicit budget and a description of what it waits
//! for. It never fails; a condition that does not hold in time is reported
//! through [`WaitResult::satisfied`].

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::deadline::Deadline;
use crate::engine::AutomationEngine;
use crate::page_object::UrlMatcher;
use crate::result::{E2eError, E2eResult};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default verification budget (10 seconds)
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default polling interval (100ms)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

// =============================================================================
// OPTIONS
// =============================================================================

/// Budget and interval for one polling wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    /// Total budget
    pub timeout: Duration,
    /// Pause between attempts
    pub interval: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_WAIT_TIMEOUT,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl PollOptions {
    /// Validated options; both durations must be non-zero
    pub fn new(timeout: Duration, interval: Duration) -> E2eResult<Self> {
        if timeout.is_zero() || interval.is_zero() {
            return Err(E2eError::invalid_argument(
                "poll timeout and interval must be greater than zero",
            ));
        }
        Ok(Self { timeout, interval })
    }

    /// Same interval, different budget
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Same budget, different interval
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

// =============================================================================
// WAIT RESULT
// =============================================================================

/// Outcome of a polling wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitResult {
    /// The condition held before the budget ran out
    pub satisfied: bool,
    /// Time spent waiting
    pub elapsed: Duration,
    /// Number of predicate evaluations
    pub attempts: u32,
    /// Description of what was waited for
    pub waited_for: String,
    /// The scenario deadline or cancellation ended the wait
    pub cancelled: bool,
}

impl WaitResult {
    /// Create a successful wait result
    #[must_use]
    pub fn success(elapsed: Duration, attempts: u32, waited_for: impl Into<String>) -> Self {
        Self {
            satisfied: true,
            elapsed,
            attempts,
            waited_for: waited_for.into(),
            cancelled: false,
        }
    }

    /// Create a timeout wait result
    #[must_use]
    pub fn timeout(elapsed: Duration, attempts: u32, waited_for: impl Into<String>) -> Self {
        Self {
            satisfied: false,
            elapsed,
            attempts,
            waited_for: waited_for.into(),
            cancelled: false,
        }
    }
}

// =============================================================================
// POLLING
// =============================================================================

/// Evaluate `predicate` until it returns true or the budget is spent
///
/// The predicate always runs at least once, and once more at the budget
/// boundary.
pub async fn poll_until<F, Fut>(
    description: &str,
    options: PollOptions,
    deadline: &Deadline,
    mut predicate: F,
) -> WaitResult
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = Instant::now();
    let until = start + deadline.clamp(options.timeout);
    let interval = options.interval.max(Duration::from_millis(1));
    let mut attempts = 0_u32;

    loop {
        attempts += 1;
        if predicate().await {
            return WaitResult::success(start.elapsed(), attempts, description);
        }
        let now = Instant::now();
        if now >= until {
            break;
        }
        if let Err(e) = deadline.sleep(interval.min(until - now), description).await {
            debug!(waited_for = description, error = %e, "wait interrupted");
            let mut result = WaitResult::timeout(start.elapsed(), attempts, description);
            result.cancelled = true;
            return result;
        }
    }

    let mut result = WaitResult::timeout(start.elapsed(), attempts, description);
    result.cancelled = deadline.is_cancelled() || deadline.is_expired();
    debug!(
        waited_for = description,
        elapsed_ms = result.elapsed.as_millis() as u64,
        attempts,
        "condition not met within budget"
    );
    result
}

/// Explicit timed pause that still honours the deadline
pub async fn pause(duration: Duration, deadline: &Deadline) -> E2eResult<()> {
    deadline.sleep(duration, "explicit pause").await
}

/// Wait until the current URL matches `matcher`
pub async fn wait_for_url(
    engine: &dyn AutomationEngine,
    matcher: &UrlMatcher,
    options: PollOptions,
    deadline: &Deadline,
) -> WaitResult {
    let description = format!("url matching {}", matcher.pattern());
    poll_until(&description, options, deadline, move || async move {
        engine
            .current_url()
            .await
            .map(|url| matcher.matches(&url))
            .unwrap_or(false)
    })
    .await
}
