//! Page Object base
//!
//! A page object bundles the candidate lists of one screen and the actions a
//! test performs on it. Pages never cache element handles; every action
//! resolves through the [`TestContext`](crate::context::TestContext).

use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

use crate::context::TestContext;
use crate::result::{E2eError, E2eResult};
use crate::selector::CandidateList;
use crate::trace::{TraceKind, TraceStatus};
use crate::wait::wait_for_url;

/// Default page load budget (30 seconds)
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// A screen or component of the application under test.
///
/// # Example
///
/// ```ignore
/// struct ChannelPage;
///
/// impl PageObject for ChannelPage {
///     fn url_pattern(&self) -> &str {
///         "/chat/clans/:clan_id/channels/:channel_id"
///     }
///
///     fn ready_marker(&self) -> E2eResult<CandidateList> {
///         catalog::candidates("chat.mention.input")
///     }
/// }
/// ```
pub trait PageObject: Send + Sync {
    /// URL pattern of the page (`/login`, `/chat/*`, `/clans/:id`, `/chat/**`)
    fn url_pattern(&self) -> &str;

    /// Element whose visibility means the page is ready
    fn ready_marker(&self) -> E2eResult<CandidateList>;

    /// Budget for the page to become ready
    fn load_timeout(&self) -> Duration {
        DEFAULT_LOAD_TIMEOUT
    }

    /// Page name for logs and traces
    fn page_name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Wait until `page` is the current page and its ready marker is visible
///
/// # Errors
///
/// `Navigation` when the URL never matches the page pattern, otherwise the
/// resolution error of the ready marker.
pub async fn wait_until_loaded<P>(page: &P, ctx: &TestContext) -> E2eResult<()>
where
    P: PageObject + ?Sized,
{
    let started = Instant::now();
    let deadline = ctx.deadline().child(page.load_timeout());
    let outcome = async {
        if !page.url_pattern().is_empty() {
            let matcher = UrlMatcher::new(page.url_pattern());
            let options = ctx.config().poll_options().with_timeout(page.load_timeout());
            let wait = wait_for_url(ctx.engine().as_ref(), &matcher, options, &deadline).await;
            if !wait.satisfied {
                deadline.check(&wait.waited_for)?;
                let url = ctx.engine().current_url().await.unwrap_or_default();
                return Err(E2eError::Navigation {
                    url,
                    message: format!(
                        "{} did not load: expected {}",
                        page.page_name(),
                        matcher.pattern()
                    ),
                });
            }
        }
        let marker = page.ready_marker()?;
        ctx.resolver()
            .resolve(&marker, page.load_timeout(), &deadline)
            .await?;
        Ok(())
    }
    .await;

    let status = if outcome.is_ok() {
        TraceStatus::Ok
    } else {
        TraceStatus::Error
    };
    ctx.record(
        &format!("load {}", page.page_name()),
        TraceKind::Navigation,
        started.elapsed(),
        status,
    );
    if outcome.is_ok() {
        info!(page = page.page_name(), "page loaded");
    }
    outcome
}

/// Builder for ad-hoc page objects
#[derive(Debug, Clone)]
pub struct PageObjectBuilder {
    url_pattern: String,
    ready_marker: Option<CandidateList>,
    candidates: HashMap<String, CandidateList>,
    load_timeout: Duration,
}

impl Default for PageObjectBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PageObjectBuilder {
    /// Create a new page object builder
    #[must_use]
    pub fn new() -> Self {
        Self {
            url_pattern: String::new(),
            ready_marker: None,
            candidates: HashMap::new(),
            load_timeout: DEFAULT_LOAD_TIMEOUT,
        }
    }

    /// Set the URL pattern
    #[must_use]
    pub fn with_url_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.url_pattern = pattern.into();
        self
    }

    /// Set the ready marker
    #[must_use]
    pub fn with_ready_marker(mut self, marker: CandidateList) -> Self {
        self.ready_marker = Some(marker);
        self
    }

    /// Add named candidates
    #[must_use]
    pub fn with_candidates(mut self, name: impl Into<String>, candidates: CandidateList) -> Self {
        let _ = self.candidates.insert(name.into(), candidates);
        self
    }

    /// Set the load timeout
    #[must_use]
    pub const fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = timeout;
        self
    }

    /// Build a simple page object
    #[must_use]
    pub fn build(self) -> SimplePageObject {
        SimplePageObject {
            url_pattern: self.url_pattern,
            ready_marker: self.ready_marker,
            candidates: self.candidates,
            load_timeout: self.load_timeout,
        }
    }
}

/// Generic page object made of named candidate lists
#[derive(Debug, Clone)]
pub struct SimplePageObject {
    url_pattern: String,
    ready_marker: Option<CandidateList>,
    candidates: HashMap<String, CandidateList>,
    load_timeout: Duration,
}

impl SimplePageObject {
    /// Create a new simple page object
    #[must_use]
    pub fn new(url_pattern: impl Into<String>) -> Self {
        PageObjectBuilder::new().with_url_pattern(url_pattern).build()
    }

    /// Candidates registered under `name`
    pub fn candidates(&self, name: &str) -> E2eResult<&CandidateList> {
        self.candidates.get(name).ok_or_else(|| {
            E2eError::invalid_argument(format!("page {} has no element '{name}'", self.url_pattern))
        })
    }

    /// Register candidates under `name`
    pub fn add_candidates(&mut self, name: impl Into<String>, candidates: CandidateList) {
        let _ = self.candidates.insert(name.into(), candidates);
    }

    /// Registered element names
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.candidates.keys().map(String::as_str).collect()
    }
}

impl PageObject for SimplePageObject {
    fn url_pattern(&self) -> &str {
        &self.url_pattern
    }

    fn ready_marker(&self) -> E2eResult<CandidateList> {
        self.ready_marker.clone().ok_or_else(|| {
            E2eError::invalid_argument(format!("page {} has no ready marker", self.url_pattern))
        })
    }

    fn load_timeout(&self) -> Duration {
        self.load_timeout
    }
}

/// URL pattern matcher for page objects
#[derive(Debug, Clone)]
pub struct UrlMatcher {
    pattern: String,
    segments: Vec<UrlSegment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum UrlSegment {
    Literal(String),
    Wildcard,
    Parameter(String),
    Rest,
}

/// Path of `url` without scheme, host, query or fragment
fn url_path(url: &str) -> &str {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let path = if without_scheme.len() == url.len() {
        url
    } else {
        without_scheme
            .find('/')
            .map_or("/", |i| &without_scheme[i..])
    };
    let end = path.find(['?', '#']).unwrap_or(path.len());
    &path[..end]
}

fn path_segments(url: &str) -> Vec<&str> {
    url_path(url).split('/').filter(|s| !s.is_empty()).collect()
}

impl UrlMatcher {
    /// Create a new URL matcher from a pattern
    ///
    /// Patterns support:
    /// - Literal segments: `/login`
    /// - Wildcards: `/users/*`
    /// - Named parameters: `/users/:id`
    /// - Any remainder: `/chat/**`
    #[must_use]
    pub fn new(pattern: &str) -> Self {
        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                if s == "**" {
                    UrlSegment::Rest
                } else if s == "*" {
                    UrlSegment::Wildcard
                } else if let Some(name) = s.strip_prefix(':') {
                    UrlSegment::Parameter(name.to_string())
                } else {
                    UrlSegment::Literal(s.to_string())
                }
            })
            .collect();

        Self {
            pattern: pattern.to_string(),
            segments,
        }
    }

    /// Check if a URL (absolute or path only) matches the pattern
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        let url_segments = path_segments(url);
        Self::match_from(&self.segments, &url_segments)
    }

    fn match_from(pattern: &[UrlSegment], url: &[&str]) -> bool {
        match pattern.split_first() {
            None => url.is_empty(),
            Some((UrlSegment::Rest, rest)) => {
                (0..=url.len()).any(|skip| Self::match_from(rest, &url[skip..]))
            }
            Some((segment, rest)) => {
                let Some((head, tail)) = url.split_first() else {
                    return false;
                };
                let ok = match segment {
                    UrlSegment::Literal(lit) => lit == head,
                    _ => true,
                };
                ok && Self::match_from(rest, tail)
            }
        }
    }

    /// Extract named parameters from a URL
    #[must_use]
    pub fn extract_params(&self, url: &str) -> HashMap<String, String> {
        let mut params = HashMap::new();
        let url_segments = path_segments(url);

        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                UrlSegment::Rest => break,
                UrlSegment::Parameter(name) => {
                    if let Some(value) = url_segments.get(i) {
                        let _ = params.insert(name.clone(), (*value).to_string());
                    }
                }
                _ => {}
            }
        }

        params
    }

    /// Get the original pattern
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}
