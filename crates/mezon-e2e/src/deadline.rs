//! Deadline and cancellation context threaded through every waiting call.
//!
//! A scenario attempt owns one root [`Deadline`]. Resolvers, interactions and
//! polling loops sleep through it, so cancelling the token or passing the
//! expiry aborts in-flight waits instead of letting each run out its own
//! timeout.

use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::result::{E2eError, E2eResult};

/// Expiry plus cancellation token
#[derive(Debug, Clone)]
pub struct Deadline {
    expires_at: Option<Instant>,
    token: CancellationToken,
}

impl Default for Deadline {
    fn default() -> Self {
        Self::none()
    }
}

impl Deadline {
    /// No expiry; only cancellation ends waits
    #[must_use]
    pub fn none() -> Self {
        Self {
            expires_at: None,
            token: CancellationToken::new(),
        }
    }

    /// Expires `duration` from now
    #[must_use]
    pub fn after(duration: Duration) -> Self {
        Self {
            expires_at: Some(Instant::now() + duration),
            token: CancellationToken::new(),
        }
    }

    /// Narrower deadline sharing this one's cancellation.
    ///
    /// The child expires at the earlier of the parent's expiry and
    /// `now + duration`. Cancelling the parent cancels the child; cancelling
    /// the child leaves the parent running.
    #[must_use]
    pub fn child(&self, duration: Duration) -> Self {
        let candidate = Instant::now() + duration;
        let expires_at = match self.expires_at {
            Some(parent) if parent < candidate => Some(parent),
            _ => Some(candidate),
        };
        Self {
            expires_at,
            token: self.token.child_token(),
        }
    }

    /// Cancel every wait using this deadline or a child of it
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the token fired
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Whether the expiry passed
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }

    /// Time left before expiry, `None` when unbounded
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Expiry instant, if any
    #[must_use]
    pub const fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    /// `duration` shortened to the time remaining
    #[must_use]
    pub fn clamp(&self, duration: Duration) -> Duration {
        self.remaining().map_or(duration, |left| duration.min(left))
    }

    /// Fail when cancelled or expired
    pub fn check(&self, waiting_for: &str) -> E2eResult<()> {
        if self.is_cancelled() {
            return Err(E2eError::Cancelled {
                waited_for: waiting_for.to_string(),
            });
        }
        if self.is_expired() {
            return Err(E2eError::DeadlineExceeded {
                waited_for: waiting_for.to_string(),
            });
        }
        Ok(())
    }

    /// Sleep for `duration`, returning early with an error when the token
    /// fires or the expiry passes first
    pub async fn sleep(&self, duration: Duration, waiting_for: &str) -> E2eResult<()> {
        self.check(waiting_for)?;
        let wanted = Instant::now() + duration;
        let wake = match self.expires_at {
            Some(at) if at < wanted => at,
            _ => wanted,
        };
        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(E2eError::Cancelled {
                waited_for: waiting_for.to_string(),
            }),
            () = tokio::time::sleep_until(wake) => {
                if wake < wanted {
                    Err(E2eError::DeadlineExceeded {
                        waited_for: waiting_for.to_string(),
                    })
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Run `fut` to completion unless the deadline ends first
    pub async fn run<F, T>(&self, waiting_for: &str, fut: F) -> E2eResult<T>
    where
        F: std::future::Future<Output = E2eResult<T>>,
    {
        self.check(waiting_for)?;
        let expiry = async {
            match self.expires_at {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(E2eError::Cancelled {
                waited_for: waiting_for.to_string(),
            }),
            () = expiry => Err(E2eError::DeadlineExceeded {
                waited_for: waiting_for.to_string(),
            }),
            out = fut => out,
        }
    }
}
