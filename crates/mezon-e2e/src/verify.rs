//! Verifications: non-failing checks of observable UI state.
//!
//! A verification reports "not satisfied" as `false`; it never returns an
//! error. Resolution failures are for the resolver and interaction layers.

use serde::Serialize;
use std::future::Future;

use crate::deadline::Deadline;
use crate::resolver::Resolver;
use crate::selector::{CandidateList, Pick};
use crate::wait::{poll_until, PollOptions, WaitResult};

/// One-shot inspection of a logical element
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Verification {
    /// Some candidate matched a node, visible or not
    pub found: bool,
    /// Candidate that matched
    pub selector: Option<String>,
    /// Trimmed text of the matched node
    pub text: Option<String>,
    /// The match is visible
    pub visible: bool,
}

/// Polling checks over candidate lists
#[derive(Debug, Clone)]
pub struct Verifier {
    resolver: Resolver,
    options: PollOptions,
}

impl Verifier {
    /// Verifier with the given polling budget
    #[must_use]
    pub const fn new(resolver: Resolver, options: PollOptions) -> Self {
        Self { resolver, options }
    }

    /// Polling budget
    #[must_use]
    pub const fn options(&self) -> PollOptions {
        self.options
    }

    /// Same verifier with a different budget
    #[must_use]
    pub fn with_options(&self, options: PollOptions) -> Self {
        Self {
            resolver: self.resolver.clone(),
            options,
        }
    }

    /// Inspect the element right now
    pub async fn inspect(&self, candidates: &CandidateList) -> Verification {
        if let Some(resolved) = self.resolver.find_now(candidates).await {
            let text = self
                .resolver
                .engine()
                .text_content(&resolved.element)
                .await
                .ok()
                .map(|t| t.trim().to_string());
            return Verification {
                found: true,
                selector: Some(resolved.candidate.to_string()),
                text,
                visible: true,
            };
        }
        for candidate in candidates {
            let Ok(matches) = self.resolver.engine().query_all(candidate.selector()).await else {
                continue;
            };
            if let Some(first) = matches.first() {
                let text = self
                    .resolver
                    .engine()
                    .text_content(first)
                    .await
                    .ok()
                    .map(|t| t.trim().to_string());
                return Verification {
                    found: true,
                    selector: Some(candidate.to_string()),
                    text,
                    visible: false,
                };
            }
        }
        Verification::default()
    }

    /// Visible right now
    pub async fn is_visible(&self, candidates: &CandidateList) -> bool {
        self.resolver.find_now(candidates).await.is_some()
    }

    /// Trimmed text of the first visible match right now
    pub async fn read_text(&self, candidates: &CandidateList) -> Option<String> {
        let resolved = self.resolver.find_now(candidates).await?;
        self.resolver
            .engine()
            .text_content(&resolved.element)
            .await
            .ok()
            .map(|t| t.trim().to_string())
    }

    /// Attribute of the first visible match right now
    pub async fn read_attribute(&self, candidates: &CandidateList, name: &str) -> Option<String> {
        let resolved = self.resolver.find_now(candidates).await?;
        self.resolver
            .engine()
            .attribute(&resolved.element, name)
            .await
            .ok()
            .flatten()
    }

    /// Texts of every visible match of the first candidate that has any
    pub async fn read_all_texts(&self, candidates: &CandidateList) -> Vec<String> {
        let engine = self.resolver.engine();
        for candidate in candidates {
            let Ok(matches) = engine.query_all(candidate.selector()).await else {
                continue;
            };
            let mut texts = Vec::new();
            for m in &matches {
                if engine.is_visible(m).await.unwrap_or(false) {
                    if let Ok(t) = engine.text_content(m).await {
                        texts.push(t.trim().to_string());
                    }
                }
            }
            if !texts.is_empty() {
                return texts;
            }
        }
        Vec::new()
    }

    /// Poll an arbitrary condition with this verifier's budget
    pub async fn poll<F, Fut>(
        &self,
        description: &str,
        deadline: &Deadline,
        predicate: F,
    ) -> WaitResult
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        poll_until(description, self.options, deadline, predicate).await
    }

    /// Becomes visible within budget
    pub async fn poll_until_visible(
        &self,
        candidates: &CandidateList,
        deadline: &Deadline,
    ) -> bool {
        self.poll(&format!("{candidates} visible"), deadline, move || {
            self.is_visible(candidates)
        })
        .await
        .satisfied
    }

    /// Stops being visible within budget
    pub async fn poll_until_hidden(&self, candidates: &CandidateList, deadline: &Deadline) -> bool {
        self.poll(&format!("{candidates} hidden"), deadline, move || async move {
            !self.is_visible(candidates).await
        })
        .await
        .satisfied
    }

    /// Text equals `expected` (after trimming) within budget
    pub async fn poll_until_text_equals(
        &self,
        candidates: &CandidateList,
        expected: &str,
        deadline: &Deadline,
    ) -> bool {
        let expected = expected.trim();
        self.poll(
            &format!("{candidates} text == {expected:?}"),
            deadline,
            move || async move { self.read_text(candidates).await.as_deref() == Some(expected) },
        )
        .await
        .satisfied
    }

    /// Text contains `needle` within budget
    pub async fn poll_until_text_contains(
        &self,
        candidates: &CandidateList,
        needle: &str,
        deadline: &Deadline,
    ) -> bool {
        self.poll(
            &format!("{candidates} text contains {needle:?}"),
            deadline,
            move || async move {
                self.read_text(candidates)
                    .await
                    .is_some_and(|t| t.contains(needle))
            },
        )
        .await
        .satisfied
    }

    /// Exactly `expected` visible matches within budget
    pub async fn poll_until_count(
        &self,
        candidates: &CandidateList,
        expected: usize,
        deadline: &Deadline,
    ) -> bool {
        self.poll(
            &format!("{candidates} count == {expected}"),
            deadline,
            move || async move { self.resolver.count_visible(candidates).await == expected },
        )
        .await
        .satisfied
    }

    /// The last visible match has text `expected` within budget
    pub async fn verify_last_equals(
        &self,
        candidates: &CandidateList,
        expected: &str,
        deadline: &Deadline,
    ) -> bool {
        let last = candidates.with_pick(Pick::Last);
        self.poll_until_text_equals(&last, expected, deadline).await
    }
}
