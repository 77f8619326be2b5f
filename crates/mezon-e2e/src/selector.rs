//! Candidate queries for locating one logical UI element.
//!
//! A [`CandidateList`] is an ordered, non-empty list of [`Candidate`]s that all
//! describe the same element. Order encodes preference: the most stable query
//! first, structural fallbacks after it.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::result::{E2eError, E2eResult};

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Selector {
    /// CSS selector (e.g., "button.primary")
    Css(String),
    /// XPath selector
    XPath(String),
    /// Text content selector
    Text(String),
    /// Test ID selector (data-testid attribute)
    TestId(String),
    /// CSS selector narrowed to elements whose text contains `text`
    CssWithText {
        /// Base CSS selector
        css: String,
        /// Text content to match
        text: String,
    },
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create an XPath selector
    #[must_use]
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    /// Create a test ID selector
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId(id.into())
    }

    /// Create a text selector
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Create a CSS selector filtered by contained text
    #[must_use]
    pub fn css_with_text(css: impl Into<String>, text: impl Into<String>) -> Self {
        Self::CssWithText {
            css: css.into(),
            text: text.into(),
        }
    }

    /// Parse the compact string form used by the selector catalog.
    ///
    /// `text=Foo`, `xpath=//div`, `//div`, `testid=foo` and
    /// `css:has-text("Foo")` are recognised; anything else is CSS.
    pub fn parse(raw: &str) -> E2eResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(E2eError::invalid_argument("selector must not be empty"));
        }
        if let Some(text) = raw.strip_prefix("text=") {
            return Ok(Self::text(text));
        }
        if let Some(expr) = raw.strip_prefix("xpath=") {
            return Ok(Self::xpath(expr));
        }
        if raw.starts_with("//") || raw.starts_with("(//") {
            return Ok(Self::xpath(raw));
        }
        if let Some(id) = raw.strip_prefix("testid=") {
            return Ok(Self::test_id(id));
        }
        if let Some((css, rest)) = raw.split_once(":has-text(") {
            let text = rest
                .strip_suffix(')')
                .map(|t| t.trim_matches(|c| c == '"' || c == '\''))
                .ok_or_else(|| {
                    E2eError::invalid_argument(format!("unterminated :has-text in {raw}"))
                })?;
            let css = if css.is_empty() { "*" } else { css };
            return Ok(Self::css_with_text(css, text));
        }
        Ok(Self::css(raw))
    }

    /// JavaScript expression evaluating to an array of every match in
    /// document order
    #[must_use]
    pub fn to_query_all(&self) -> String {
        match self {
            Self::Css(s) => query_selector_all(s),
            Self::XPath(s) => format!(
                "(() => {{ const r = document.evaluate({}, document, null, \
                 XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); const out = []; \
                 for (let i = 0; i < r.snapshotLength; i++) out.push(r.snapshotItem(i)); \
                 return out; }})()",
                js_string(s)
            ),
            Self::Text(t) => {
                let t = js_string(t);
                format!(
                    "Array.from(document.querySelectorAll('body *')).filter(el => \
                     el.textContent.includes({t}) && \
                     !Array.from(el.children).some(c => c.textContent.includes({t})))"
                )
            }
            Self::TestId(id) => {
                let escaped = id.replace('\\', "\\\\").replace('"', "\\\"");
                query_selector_all(&format!("[data-testid=\"{escaped}\"]"))
            }
            Self::CssWithText { css, text } => format!(
                "{}.filter(el => el.textContent.includes({}))",
                query_selector_all(css),
                js_string(text)
            ),
        }
    }
}

/// `s` as a JavaScript string literal
fn js_string(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

fn query_selector_all(css: &str) -> String {
    format!("Array.from(document.querySelectorAll({}))", js_string(css))
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(s) => write!(f, "{s}"),
            Self::XPath(s) => write!(f, "xpath={s}"),
            Self::Text(t) => write!(f, "text={t}"),
            Self::TestId(id) => write!(f, "testid={id}"),
            Self::CssWithText { css, text } => write!(f, "{css}:has-text({text:?})"),
        }
    }
}

/// Which match to take when a candidate matches several visible elements
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pick {
    /// First visible match in document order
    #[default]
    First,
    /// Last visible match in document order (most recently appended)
    Last,
    /// Zero-based index into the visible matches
    Nth(usize),
}

impl Pick {
    /// Index into a list of `len` visible matches, if one exists
    #[must_use]
    pub const fn index(self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        match self {
            Self::First => Some(0),
            Self::Last => Some(len - 1),
            Self::Nth(n) if n < len => Some(n),
            Self::Nth(_) => None,
        }
    }
}

/// One way of locating a logical element
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    selector: Selector,
    #[serde(default)]
    pick: Pick,
}

impl Candidate {
    /// Candidate taking the first visible match
    #[must_use]
    pub const fn new(selector: Selector) -> Self {
        Self {
            selector,
            pick: Pick::First,
        }
    }

    /// Parse a compact selector string (see [`Selector::parse`])
    pub fn parse(raw: &str) -> E2eResult<Self> {
        Selector::parse(raw).map(Self::new)
    }

    /// Take the last visible match instead of the first
    #[must_use]
    pub fn last(self) -> Self {
        self.with_pick(Pick::Last)
    }

    /// Take the `n`-th visible match
    #[must_use]
    pub fn nth(self, n: usize) -> Self {
        self.with_pick(Pick::Nth(n))
    }

    /// Set the multi-match policy
    #[must_use]
    pub fn with_pick(mut self, pick: Pick) -> Self {
        self.pick = pick;
        self
    }

    /// The underlying selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// The multi-match policy
    #[must_use]
    pub const fn pick(&self) -> Pick {
        self.pick
    }
}

impl From<Selector> for Candidate {
    fn from(selector: Selector) -> Self {
        Self::new(selector)
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pick {
            Pick::First => write!(f, "{}", self.selector),
            Pick::Last => write!(f, "{} (last)", self.selector),
            Pick::Nth(n) => write!(f, "{} (nth={n})", self.selector),
        }
    }
}

/// Ordered, non-empty list of candidates for one logical element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Candidate>", into = "Vec<Candidate>")]
pub struct CandidateList(Vec<Candidate>);

impl CandidateList {
    /// Build a list, rejecting empty input
    pub fn new(candidates: Vec<Candidate>) -> E2eResult<Self> {
        if candidates.is_empty() {
            return Err(E2eError::invalid_argument(
                "candidate list must contain at least one candidate",
            ));
        }
        Ok(Self(candidates))
    }

    /// List with exactly one candidate
    #[must_use]
    pub fn single(candidate: impl Into<Candidate>) -> Self {
        Self(vec![candidate.into()])
    }

    /// Parse every string with [`Candidate::parse`], preserving order
    pub fn from_strs<S: AsRef<str>>(raw: &[S]) -> E2eResult<Self> {
        let parsed = raw
            .iter()
            .map(|s| Candidate::parse(s.as_ref()))
            .collect::<E2eResult<Vec<_>>>()?;
        Self::new(parsed)
    }

    /// Same candidates, every one switched to `pick`
    #[must_use]
    pub fn with_pick(&self, pick: Pick) -> Self {
        Self(self.0.iter().cloned().map(|c| c.with_pick(pick)).collect())
    }

    /// Same candidates narrowed to elements whose text contains `text`.
    ///
    /// CSS queries become text-filtered CSS; other kinds are kept as they are.
    #[must_use]
    pub fn containing_text(&self, text: &str) -> Self {
        Self(
            self.0
                .iter()
                .map(|c| {
                    let selector = match &c.selector {
                        Selector::Css(css) | Selector::CssWithText { css, .. } => {
                            Selector::css_with_text(css.clone(), text)
                        }
                        other => other.clone(),
                    };
                    Candidate::new(selector).with_pick(c.pick)
                })
                .collect(),
        )
    }

    /// Append the candidates of `other` after this list's own
    #[must_use]
    pub fn chain(mut self, other: Self) -> Self {
        self.0.extend(other.0);
        self
    }

    /// Iterate in preference order
    pub fn iter(&self) -> std::slice::Iter<'_, Candidate> {
        self.0.iter()
    }

    /// Number of candidates (always at least one)
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; present for API symmetry with slices
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow as a slice
    #[must_use]
    pub fn as_slice(&self) -> &[Candidate] {
        &self.0
    }

    /// The preferred candidate
    #[must_use]
    pub fn first(&self) -> &Candidate {
        &self.0[0]
    }
}

impl TryFrom<Vec<Candidate>> for CandidateList {
    type Error = E2eError;

    fn try_from(value: Vec<Candidate>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CandidateList> for Vec<Candidate> {
    fn from(list: CandidateList) -> Self {
        list.0
    }
}

impl<'a> IntoIterator for &'a CandidateList {
    type Item = &'a Candidate;
    type IntoIter = std::slice::Iter<'a, Candidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for CandidateList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, c) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{c}")?;
        }
        write!(f, "]")
    }
}
