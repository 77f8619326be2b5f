//! Element resolver: first visible match across ordered fallback candidates.
//!
//! Candidates are tried strictly in order. Each one gets its own timeout
//! (clamped to the scenario deadline) during which it is queried at the poll
//! interval; the first candidate with a visible match wins and later
//! candidates are never queried. A query only ever calls read-only engine
//! methods.

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use crate::catalog;
use crate::deadline::Deadline;
use crate::engine::{AutomationEngine, ElementHandle};
use crate::result::{E2eError, E2eResult};
use crate::selector::{Candidate, CandidateList};

/// Default polling interval between queries (100ms)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Element found by the resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedElement {
    /// Handle to the matched node
    pub element: ElementHandle,
    /// Candidate that matched
    pub candidate: Candidate,
    /// Position of that candidate in the list
    pub candidate_index: usize,
}

/// Resolves candidate lists against an engine
#[derive(Debug, Clone)]
pub struct Resolver {
    engine: Arc<dyn AutomationEngine>,
    poll_interval: Duration,
}

impl Resolver {
    /// Resolver polling at [`DEFAULT_POLL_INTERVAL`]
    #[must_use]
    pub fn new(engine: Arc<dyn AutomationEngine>) -> Self {
        Self {
            engine,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Set the polling interval; zero is raised to one millisecond
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval.max(Duration::from_millis(1));
        self
    }

    /// Polling interval
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Engine used for probing
    #[must_use]
    pub fn engine(&self) -> &Arc<dyn AutomationEngine> {
        &self.engine
    }

    /// First candidate that resolves to a visible element
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` when `per_candidate_timeout` is zero
    /// - `ElementNotFound` listing every candidate, in order, when none resolves
    /// - `Cancelled` / `DeadlineExceeded` when the deadline ends the search
    pub async fn resolve(
        &self,
        candidates: &CandidateList,
        per_candidate_timeout: Duration,
        deadline: &Deadline,
    ) -> E2eResult<ResolvedElement> {
        if per_candidate_timeout.is_zero() {
            return Err(E2eError::invalid_argument(
                "per-candidate timeout must be greater than zero",
            ));
        }

        for (candidate_index, candidate) in candidates.iter().enumerate() {
            deadline.check(&format!("element {candidate}"))?;
            if let Some(element) = self
                .query_until(candidate, per_candidate_timeout, deadline)
                .await?
            {
                debug!(candidate = %candidate, candidate_index, "resolved");
                return Ok(ResolvedElement {
                    element,
                    candidate: candidate.clone(),
                    candidate_index,
                });
            }
            debug!(
                candidate = %candidate,
                timeout_ms = per_candidate_timeout.as_millis() as u64,
                "candidate exhausted"
            );
        }

        Err(E2eError::ElementNotFound {
            candidates: candidates.as_slice().to_vec(),
            timeout_ms: per_candidate_timeout.as_millis() as u64,
        })
    }

    /// Try whole groups in order, each through [`Resolver::resolve`]
    ///
    /// Used when one logical control appears under different DOM shapes
    /// (context menu entry vs. hover toolbar button).
    pub async fn resolve_first_of(
        &self,
        groups: &[CandidateList],
        per_candidate_timeout: Duration,
        deadline: &Deadline,
    ) -> E2eResult<ResolvedElement> {
        if groups.is_empty() {
            return Err(E2eError::invalid_argument(
                "resolve_first_of needs at least one group",
            ));
        }
        let mut tried = Vec::new();
        for group in groups {
            match self.resolve(group, per_candidate_timeout, deadline).await {
                Ok(found) => return Ok(found),
                Err(E2eError::ElementNotFound { candidates, .. }) => tried.extend(candidates),
                Err(e) => return Err(e),
            }
        }
        Err(E2eError::ElementNotFound {
            candidates: tried,
            timeout_ms: per_candidate_timeout.as_millis() as u64,
        })
    }

    /// Resolve a selector catalog key
    pub async fn resolve_key(
        &self,
        key: &str,
        per_candidate_timeout: Duration,
        deadline: &Deadline,
    ) -> E2eResult<ResolvedElement> {
        let candidates = catalog::candidates(key)?;
        self.resolve(&candidates, per_candidate_timeout, deadline)
            .await
    }

    /// Single non-waiting pass over the list
    pub async fn find_now(&self, candidates: &CandidateList) -> Option<ResolvedElement> {
        for (candidate_index, candidate) in candidates.iter().enumerate() {
            if let Some(element) = self.query(candidate).await {
                return Some(ResolvedElement {
                    element,
                    candidate: candidate.clone(),
                    candidate_index,
                });
            }
        }
        None
    }

    /// Visible matches of the first candidate that has any
    pub async fn count_visible(&self, candidates: &CandidateList) -> usize {
        for candidate in candidates {
            let n = self.visible_matches(candidate).await.len();
            if n > 0 {
                return n;
            }
        }
        0
    }

    async fn query_until(
        &self,
        candidate: &Candidate,
        timeout: Duration,
        deadline: &Deadline,
    ) -> E2eResult<Option<ElementHandle>> {
        let until = Instant::now() + deadline.clamp(timeout);
        let waiting_for = format!("element {candidate}");
        loop {
            if let Some(element) = self.query(candidate).await {
                return Ok(Some(element));
            }
            let now = Instant::now();
            if now >= until {
                return Ok(None);
            }
            deadline
                .sleep(self.poll_interval.min(until - now), &waiting_for)
                .await?;
        }
    }

    async fn query(&self, candidate: &Candidate) -> Option<ElementHandle> {
        let visible = self.visible_matches(candidate).await;
        let index = candidate.pick().index(visible.len())?;
        visible.into_iter().nth(index)
    }

    async fn visible_matches(&self, candidate: &Candidate) -> Vec<ElementHandle> {
        let matches = match self.engine.query_all(candidate.selector()).await {
            Ok(m) => m,
            Err(e) => {
                // A failing query only fails this candidate.
                debug!(candidate = %candidate, error = %e, "candidate query failed");
                return Vec::new();
            }
        };
        let mut visible = Vec::with_capacity(matches.len());
        for element in matches {
            match self.engine.is_visible(&element).await {
                Ok(true) => visible.push(element),
                Ok(false) => {}
                Err(e) => debug!(candidate = %candidate, error = %e, "visibility check failed"),
            }
        }
        visible
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::engine::{MockElement, MockEngine};
    use crate::selector::{Pick, Selector};

    fn setup() -> (MockEngine, Resolver) {
        let engine = MockEngine::new();
        let resolver = Resolver::new(Arc::new(engine.clone()));
        (engine, resolver)
    }

    fn list(raw: &[&str]) -> CandidateList {
        CandidateList::from_strs(raw).unwrap()
    }

    mod resolve_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_zero_timeout_rejected() {
            let (_, resolver) = setup();
            let err = resolver
                .resolve(&list(&["#a"]), Duration::ZERO, &Deadline::none())
                .await
                .unwrap_err();
            assert!(matches!(err, E2eError::InvalidArgument { .. }));
        }

        #[tokio::test(start_paused = true)]
        async fn test_invisible_only_fails_like_missing() {
            let (engine, resolver) = setup();
            engine.insert(MockElement::new().with_css("#hidden").hidden());
            let err = resolver
                .resolve(
                    &list(&["#hidden"]),
                    Duration::from_millis(200),
                    &Deadline::none(),
                )
                .await
                .unwrap_err();
            assert!(matches!(err, E2eError::ElementNotFound { .. }));
        }

        #[tokio::test(start_paused = true)]
        async fn test_skips_hidden_first_match() {
            let (engine, resolver) = setup();
            engine.insert(MockElement::new().with_css("li").with_text("a").hidden());
            engine.insert(MockElement::new().with_css("li").with_text("b"));
            let found = resolver
                .resolve(&list(&["li"]), Duration::from_millis(100), &Deadline::none())
                .await
                .unwrap();
            assert_eq!(engine.text_content(&found.element).await.unwrap(), "b");
        }

        #[tokio::test(start_paused = true)]
        async fn test_pick_last_is_explicit() {
            let (engine, resolver) = setup();
            for text in ["one", "two", "three"] {
                engine.insert(MockElement::new().with_css("li.msg").with_text(text));
            }
            let first = resolver
                .resolve(
                    &list(&["li.msg"]),
                    Duration::from_millis(100),
                    &Deadline::none(),
                )
                .await
                .unwrap();
            assert_eq!(engine.text_content(&first.element).await.unwrap(), "one");

            let last = resolver
                .resolve(
                    &list(&["li.msg"]).with_pick(Pick::Last),
                    Duration::from_millis(100),
                    &Deadline::none(),
                )
                .await
                .unwrap();
            assert_eq!(engine.text_content(&last.element).await.unwrap(), "three");
        }

        #[tokio::test(start_paused = true)]
        async fn test_engine_error_fails_candidate_only() {
            let (engine, resolver) = setup();
            engine.fail_queries_for(Selector::css("#flaky"));
            engine.insert(MockElement::new().with_css("#ok"));
            let found = resolver
                .resolve(
                    &list(&["#flaky", "#ok"]),
                    Duration::from_millis(100),
                    &Deadline::none(),
                )
                .await
                .unwrap();
            assert_eq!(found.candidate_index, 1);
        }

        #[tokio::test(start_paused = true)]
        async fn test_deadline_interrupts_long_timeout() {
            let (_, resolver) = setup();
            let deadline = Deadline::after(Duration::from_millis(250));
            let start = Instant::now();
            let err = resolver
                .resolve(&list(&["#never", "#nor"]), Duration::from_secs(30), &deadline)
                .await
                .unwrap_err();
            assert!(err.is_deadline(), "{err}");
            assert!(start.elapsed() <= Duration::from_millis(250));
        }

        #[tokio::test(start_paused = true)]
        async fn test_cancel_interrupts_resolution() {
            let (_, resolver) = setup();
            let deadline = Deadline::none();
            let canceller = deadline.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(120)).await;
                canceller.cancel();
            });
            let err = resolver
                .resolve(&list(&["#never"]), Duration::from_secs(30), &deadline)
                .await
                .unwrap_err();
            assert!(matches!(err, E2eError::Cancelled { .. }));
        }
    }

    mod first_of_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_second_group_wins() {
            let (engine, resolver) = setup();
            engine.insert(MockElement::new().with_css("button.pin-inline"));
            let groups = vec![
                list(&["div[role='menu'] .pin", "text=Pin Message"]),
                list(&["button.pin-inline"]),
            ];
            let found = resolver
                .resolve_first_of(&groups, Duration::from_millis(100), &Deadline::none())
                .await
                .unwrap();
            assert_eq!(found.candidate.to_string(), "button.pin-inline");
        }

        #[tokio::test(start_paused = true)]
        async fn test_exhaustion_reports_every_group_in_order() {
            let (_, resolver) = setup();
            let groups = vec![list(&["#a", "#b"]), list(&["#c"])];
            let err = resolver
                .resolve_first_of(&groups, Duration::from_millis(50), &Deadline::none())
                .await
                .unwrap_err();
            let shown: Vec<String> = err
                .candidates()
                .unwrap()
                .iter()
                .map(ToString::to_string)
                .collect();
            assert_eq!(shown, vec!["#a", "#b", "#c"]);
        }

        #[tokio::test]
        async fn test_empty_groups_rejected() {
            let (_, resolver) = setup();
            assert!(resolver
                .resolve_first_of(&[], Duration::from_millis(50), &Deadline::none())
                .await
                .is_err());
        }
    }

    mod helper_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_resolve_key_uses_data_e2e_first() {
            let (engine, resolver) = setup();
            engine.insert(MockElement::new().with_e2e("chat.message.list"));
            let found = resolver
                .resolve_key(
                    "chat.message.list",
                    Duration::from_millis(100),
                    &Deadline::none(),
                )
                .await
                .unwrap();
            assert_eq!(found.candidate_index, 0);
        }

        #[tokio::test]
        async fn test_find_now_and_count() {
            let (engine, resolver) = setup();
            assert!(resolver.find_now(&list(&["li"])).await.is_none());
            engine.insert(MockElement::new().with_css("li"));
            engine.insert(MockElement::new().with_css("li"));
            engine.insert(MockElement::new().with_css("li").hidden());
            assert!(resolver.find_now(&list(&["#x", "li"])).await.is_some());
            assert_eq!(resolver.count_visible(&list(&["#x", "li"])).await, 2);
        }
    }
}
