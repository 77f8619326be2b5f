//! In-memory engine for tests.
//!
//! [`MockEngine`] keeps a flat list of [`MockElement`]s in document order.
//! Application behaviour is simulated with action hooks and scheduled
//! mutations, both of which receive a `&mut MockDom`. Time is read from
//! `tokio::time`, so tests running with a paused clock are deterministic.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;

use super::{AutomationEngine, ElementHandle, EngineFactory, Screenshot};
use crate::catalog::format_e2e_selector;
use crate::result::{E2eError, E2eResult};
use crate::selector::Selector;

const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n";

/// A node in the mock document
#[derive(Debug, Clone, Default)]
pub struct MockElement {
    /// Selectors this node answers to
    pub selectors: Vec<Selector>,
    /// Text content
    pub text: String,
    /// Input value
    pub value: String,
    /// Attributes
    pub attrs: HashMap<String, String>,
    /// Rendered with a non-empty box
    pub visible: bool,
    /// Not part of the document until this long after insertion
    pub appears_after: Option<Duration>,
    /// The next this-many actions on this node fail with `Detached`, each
    /// time replacing the node with a fresh copy
    pub detach_remaining: u32,
    /// Files attached through `set_input_files`
    pub files: Vec<PathBuf>,
}

impl MockElement {
    /// Visible node with no selectors
    #[must_use]
    pub fn new() -> Self {
        Self {
            visible: true,
            ..Self::default()
        }
    }

    /// Answer to a CSS selector
    #[must_use]
    pub fn with_css(mut self, css: impl Into<String>) -> Self {
        self.selectors.push(Selector::css(css));
        self
    }

    /// Answer to the `data-e2e` selector of a catalog key
    #[must_use]
    pub fn with_e2e(self, key: &str) -> Self {
        self.with_css(format_e2e_selector(key))
    }

    /// Answer to an arbitrary selector
    #[must_use]
    pub fn with_selector(mut self, selector: Selector) -> Self {
        self.selectors.push(selector);
        self
    }

    /// Set text content
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set input value
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    /// Set an attribute
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    /// Present in the document but not rendered
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Enter the document `delay` after insertion
    #[must_use]
    pub fn appears_after(mut self, delay: Duration) -> Self {
        self.appears_after = Some(delay);
        self
    }

    /// Fail the next action with `Detached`
    #[must_use]
    pub fn detach_once(self) -> Self {
        self.detach_times(1)
    }

    /// Fail the next `n` actions with `Detached`
    #[must_use]
    pub fn detach_times(mut self, n: u32) -> Self {
        self.detach_remaining = n;
        self
    }

    /// Whether this node matches `selector`
    #[must_use]
    pub fn matches(&self, selector: &Selector) -> bool {
        if self.selectors.contains(selector) {
            return true;
        }
        match selector {
            Selector::CssWithText { css, text } => {
                self.selectors.contains(&Selector::Css(css.clone())) && self.text.contains(text)
            }
            Selector::Text(t) => !t.is_empty() && self.text.contains(t.as_str()),
            Selector::TestId(id) => self.attrs.get("data-testid") == Some(id),
            _ => false,
        }
    }
}

/// Kind of state-changing action, used to key hooks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Mouse click
    Click,
    /// Value replacement
    Fill,
    /// Key press
    Press,
    /// Pointer hover
    Hover,
    /// File input
    SetFiles,
}

/// Details passed to an action hook
#[derive(Debug, Clone)]
pub struct ActionEvent {
    /// Node the action hit
    pub node: u64,
    /// Action kind
    pub kind: ActionKind,
    /// Filled text or pressed key
    pub input: Option<String>,
    /// Attached files
    pub files: Vec<PathBuf>,
}

type Hook = Arc<dyn Fn(&mut MockDom, &ActionEvent) + Send + Sync>;
type NavigateHook = Arc<dyn Fn(&mut MockDom, &str) + Send + Sync>;
type Scheduled = Box<dyn FnOnce(&mut MockDom) + Send>;

#[derive(Debug)]
struct MockNode {
    id: u64,
    element: MockElement,
    inserted_at: Instant,
}

impl MockNode {
    fn present(&self, now: Instant) -> bool {
        self.element
            .appears_after
            .map_or(true, |d| now >= self.inserted_at + d)
    }
}

/// The mutable document behind a [`MockEngine`]
#[derive(Default)]
pub struct MockDom {
    nodes: Vec<MockNode>,
    next_id: u64,
    url: String,
    local_storage: HashMap<String, String>,
    scheduled: Vec<(Instant, Scheduled)>,
}

impl fmt::Debug for MockDom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockDom")
            .field("nodes", &self.nodes.len())
            .field("url", &self.url)
            .field("scheduled", &self.scheduled.len())
            .finish_non_exhaustive()
    }
}

impl MockDom {
    /// Append a node; returns its id
    pub fn insert(&mut self, element: MockElement) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.nodes.push(MockNode {
            id,
            element,
            inserted_at: Instant::now(),
        });
        id
    }

    /// Remove a node by id
    pub fn remove(&mut self, id: u64) -> Option<MockElement> {
        let pos = self.nodes.iter().position(|n| n.id == id)?;
        Some(self.nodes.remove(pos).element)
    }

    /// Remove every node matching `selector`; returns how many went
    pub fn remove_matching(&mut self, selector: &Selector) -> usize {
        let before = self.nodes.len();
        self.nodes.retain(|n| !n.element.matches(selector));
        before - self.nodes.len()
    }

    /// Remove every node
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Ids of present nodes matching `selector`, in document order
    #[must_use]
    pub fn find(&self, selector: &Selector) -> Vec<u64> {
        let now = Instant::now();
        self.nodes
            .iter()
            .filter(|n| n.present(now) && n.element.matches(selector))
            .map(|n| n.id)
            .collect()
    }

    /// Last present node matching `selector`
    #[must_use]
    pub fn find_last(&self, selector: &Selector) -> Option<u64> {
        self.find(selector).last().copied()
    }

    /// Borrow a node
    #[must_use]
    pub fn get(&self, id: u64) -> Option<&MockElement> {
        self.nodes.iter().find(|n| n.id == id).map(|n| &n.element)
    }

    /// Borrow a node mutably
    pub fn get_mut(&mut self, id: u64) -> Option<&mut MockElement> {
        self.nodes
            .iter_mut()
            .find(|n| n.id == id)
            .map(|n| &mut n.element)
    }

    /// Set the text of every node matching `selector`
    pub fn set_text(&mut self, selector: &Selector, text: &str) {
        for n in &mut self.nodes {
            if n.element.matches(selector) {
                n.element.text = text.to_string();
            }
        }
    }

    /// Show or hide every node matching `selector`
    pub fn set_visible(&mut self, selector: &Selector, visible: bool) {
        for n in &mut self.nodes {
            if n.element.matches(selector) {
                n.element.visible = visible;
            }
        }
    }

    /// Current URL
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Replace the URL without running navigation hooks
    pub fn set_url(&mut self, url: impl Into<String>) {
        self.url = url.into();
    }

    /// localStorage view
    #[must_use]
    pub fn local_storage(&self) -> &HashMap<String, String> {
        &self.local_storage
    }

    /// Run `mutation` once `delay` has elapsed
    pub fn schedule(&mut self, delay: Duration, mutation: impl FnOnce(&mut Self) + Send + 'static) {
        self.scheduled
            .push((Instant::now() + delay, Box::new(mutation)));
    }

    fn apply_due(&mut self) {
        loop {
            let now = Instant::now();
            let (due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.scheduled)
                .into_iter()
                .partition(|(at, _)| *at <= now);
            self.scheduled = pending;
            if due.is_empty() {
                break;
            }
            let mut due = due;
            due.sort_by_key(|(at, _)| *at);
            for (_, mutation) in due {
                mutation(self);
            }
        }
    }

    fn visible(&self, id: u64) -> bool {
        let now = Instant::now();
        self.nodes
            .iter()
            .find(|n| n.id == id)
            .is_some_and(|n| n.present(now) && n.element.visible)
    }
}

#[derive(Default)]
struct MockState {
    dom: MockDom,
    hooks: Vec<(ActionKind, Selector, Hook)>,
    navigate_hooks: Vec<NavigateHook>,
    failing_queries: Vec<Selector>,
    history: Vec<String>,
    mutations: u64,
    closed: bool,
}

/// In-memory automation engine
#[derive(Clone, Default)]
pub struct MockEngine {
    state: Arc<Mutex<MockState>>,
}

impl fmt::Debug for MockEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("MockEngine")
            .field("dom", &state.dom)
            .field("hooks", &state.hooks.len())
            .field("mutations", &state.mutations)
            .finish_non_exhaustive()
    }
}

impl MockEngine {
    /// Empty document at `about:blank`
    #[must_use]
    pub fn new() -> Self {
        let engine = Self::default();
        engine.lock().dom.url = "about:blank".to_string();
        engine
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_dom<T>(&self, f: impl FnOnce(&mut MockDom) -> T) -> T {
        let mut state = self.lock();
        state.dom.apply_due();
        f(&mut state.dom)
    }

    /// Append a node
    pub fn insert(&self, element: MockElement) -> u64 {
        self.with_dom(|dom| dom.insert(element))
    }

    /// Mutate the document directly (test arrangement, not counted as an
    /// engine mutation)
    pub fn edit<T>(&self, f: impl FnOnce(&mut MockDom) -> T) -> T {
        self.with_dom(f)
    }

    /// Run `mutation` after `delay`
    pub fn schedule(&self, delay: Duration, mutation: impl FnOnce(&mut MockDom) + Send + 'static) {
        self.with_dom(|dom| dom.schedule(delay, mutation));
    }

    /// Hook run after an action of `kind` hits a node matching `selector`
    pub fn on_action(
        &self,
        kind: ActionKind,
        selector: Selector,
        hook: impl Fn(&mut MockDom, &ActionEvent) + Send + Sync + 'static,
    ) {
        self.lock().hooks.push((kind, selector, Arc::new(hook)));
    }

    /// Hook run after a click
    pub fn on_click(
        &self,
        selector: Selector,
        hook: impl Fn(&mut MockDom) + Send + Sync + 'static,
    ) {
        self.on_action(ActionKind::Click, selector, move |dom, _| hook(dom));
    }

    /// Hook run after a fill, receiving the filled text
    pub fn on_fill(
        &self,
        selector: Selector,
        hook: impl Fn(&mut MockDom, &str) + Send + Sync + 'static,
    ) {
        self.on_action(ActionKind::Fill, selector, move |dom, ev| {
            hook(dom, ev.input.as_deref().unwrap_or_default());
        });
    }

    /// Hook run after `key` is pressed, receiving the pressed node id
    pub fn on_press(
        &self,
        selector: Selector,
        key: &str,
        hook: impl Fn(&mut MockDom, u64) + Send + Sync + 'static,
    ) {
        let key = key.to_string();
        self.on_action(ActionKind::Press, selector, move |dom, ev| {
            if ev.input.as_deref() == Some(key.as_str()) {
                hook(dom, ev.node);
            }
        });
    }

    /// Hook run after navigation or reload, receiving the new URL
    pub fn on_navigate(&self, hook: impl Fn(&mut MockDom, &str) + Send + Sync + 'static) {
        self.lock().navigate_hooks.push(Arc::new(hook));
    }

    /// Make `query_all` fail for `selector`
    pub fn fail_queries_for(&self, selector: Selector) {
        self.lock().failing_queries.push(selector);
    }

    /// Every engine call so far, as `method:detail`
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.lock().history.clone()
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        self.lock().history.iter().any(|c| c.starts_with(method))
    }

    /// Number of state-changing calls so far
    #[must_use]
    pub fn mutation_count(&self) -> u64 {
        self.lock().mutations
    }

    /// Text of every present node matching `selector`
    #[must_use]
    pub fn texts(&self, selector: &Selector) -> Vec<String> {
        self.with_dom(|dom| {
            dom.find(selector)
                .into_iter()
                .filter_map(|id| dom.get(id).map(|e| e.text.clone()))
                .collect()
        })
    }

    fn node_id(element: &ElementHandle) -> E2eResult<u64> {
        element
            .id
            .strip_prefix("mock-")
            .and_then(|n| n.parse().ok())
            .ok_or_else(|| E2eError::engine(format!("foreign element handle {}", element.id)))
    }

    fn read<T>(&self, element: &ElementHandle, f: impl FnOnce(&MockElement) -> T) -> E2eResult<T> {
        let id = Self::node_id(element)?;
        let mut state = self.lock();
        state.history.push(format!("read:{element}"));
        state.dom.apply_due();
        state
            .dom
            .get(id)
            .map(f)
            .ok_or_else(|| E2eError::Detached {
                element: element.to_string(),
            })
    }

    fn act(
        &self,
        element: &ElementHandle,
        kind: ActionKind,
        input: Option<&str>,
        files: &[PathBuf],
    ) -> E2eResult<()> {
        let id = Self::node_id(element)?;
        let mut state = self.lock();
        let name = format!("{kind:?}").to_lowercase();
        state.history.push(format!("{name}:{element}"));
        state.mutations += 1;
        state.dom.apply_due();

        let detached = || E2eError::Detached {
            element: element.to_string(),
        };
        let pos = state
            .dom
            .nodes
            .iter()
            .position(|n| n.id == id)
            .ok_or_else(detached)?;
        if state.dom.nodes[pos].element.detach_remaining > 0 {
            // Re-render: the old node leaves, an identical one takes its place.
            state.dom.next_id += 1;
            let fresh = state.dom.next_id;
            let node = &mut state.dom.nodes[pos];
            node.id = fresh;
            node.element.detach_remaining -= 1;
            return Err(detached());
        }
        if !state.dom.visible(id) {
            return Err(E2eError::engine(format!("{element} is not visible")));
        }

        if let Some(el) = state.dom.get_mut(id) {
            match kind {
                ActionKind::Fill => el.value = input.unwrap_or_default().to_string(),
                ActionKind::SetFiles => el.files = files.to_vec(),
                _ => {}
            }
        }

        let matched: Vec<Hook> = match state.dom.get(id) {
            Some(el) => state
                .hooks
                .iter()
                .filter(|(k, sel, _)| *k == kind && el.matches(sel))
                .map(|(_, _, h)| Arc::clone(h))
                .collect(),
            None => Vec::new(),
        };
        let event = ActionEvent {
            node: id,
            kind,
            input: input.map(ToString::to_string),
            files: files.to_vec(),
        };
        for hook in matched {
            hook(&mut state.dom, &event);
        }
        Ok(())
    }

    fn go(&self, url: &str, call: &str) {
        let mut state = self.lock();
        state.history.push(format!("{call}:{url}"));
        state.mutations += 1;
        state.dom.url = url.to_string();
        let hooks = state.navigate_hooks.clone();
        for hook in hooks {
            hook(&mut state.dom, url);
        }
    }
}

#[async_trait]
impl AutomationEngine for MockEngine {
    async fn navigate(&self, url: &str) -> E2eResult<()> {
        if self.lock().closed {
            return Err(E2eError::Navigation {
                url: url.to_string(),
                message: "context closed".to_string(),
            });
        }
        self.go(url, "navigate");
        Ok(())
    }

    async fn current_url(&self) -> E2eResult<String> {
        Ok(self.with_dom(|dom| dom.url.clone()))
    }

    async fn reload(&self) -> E2eResult<()> {
        let url = self.with_dom(|dom| dom.url.clone());
        self.go(&url, "reload");
        Ok(())
    }

    async fn query_all(&self, selector: &Selector) -> E2eResult<Vec<ElementHandle>> {
        let mut state = self.lock();
        state.history.push(format!("query_all:{selector}"));
        if state.failing_queries.contains(selector) {
            return Err(E2eError::engine(format!("query failed for {selector}")));
        }
        state.dom.apply_due();
        Ok(state
            .dom
            .find(selector)
            .into_iter()
            .enumerate()
            .map(|(index, id)| ElementHandle::new(format!("mock-{id}"), selector.clone(), index))
            .collect())
    }

    async fn is_visible(&self, element: &ElementHandle) -> E2eResult<bool> {
        let id = Self::node_id(element)?;
        Ok(self.with_dom(|dom| dom.visible(id)))
    }

    async fn text_content(&self, element: &ElementHandle) -> E2eResult<String> {
        self.read(element, |e| e.text.clone())
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> E2eResult<Option<String>> {
        self.read(element, |e| e.attrs.get(name).cloned())
    }

    async fn input_value(&self, element: &ElementHandle) -> E2eResult<String> {
        self.read(element, |e| e.value.clone())
    }

    async fn click(&self, element: &ElementHandle) -> E2eResult<()> {
        self.act(element, ActionKind::Click, None, &[])
    }

    async fn fill(&self, element: &ElementHandle, text: &str) -> E2eResult<()> {
        self.act(element, ActionKind::Fill, Some(text), &[])
    }

    async fn press(&self, element: &ElementHandle, key: &str) -> E2eResult<()> {
        self.act(element, ActionKind::Press, Some(key), &[])
    }

    async fn hover(&self, element: &ElementHandle) -> E2eResult<()> {
        self.act(element, ActionKind::Hover, None, &[])
    }

    async fn set_input_files(&self, element: &ElementHandle, files: &[PathBuf]) -> E2eResult<()> {
        self.act(element, ActionKind::SetFiles, None, files)
    }

    async fn set_local_storage(&self, key: &str, value: &str) -> E2eResult<()> {
        let mut state = self.lock();
        state.history.push(format!("set_local_storage:{key}"));
        state.mutations += 1;
        state
            .dom
            .local_storage
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get_local_storage(&self, key: &str) -> E2eResult<Option<String>> {
        let mut state = self.lock();
        state.history.push(format!("get_local_storage:{key}"));
        Ok(state.dom.local_storage.get(key).cloned())
    }

    async fn screenshot(&self) -> E2eResult<Screenshot> {
        self.lock().history.push("screenshot".to_string());
        Ok(Screenshot::new(PNG_MAGIC.to_vec()))
    }

    async fn close(&self) -> E2eResult<()> {
        let mut state = self.lock();
        state.history.push("close".to_string());
        state.closed = true;
        Ok(())
    }
}

type Builder = dyn Fn() -> MockEngine + Send + Sync;

/// Builds a fresh [`MockEngine`] per context from a closure
#[derive(Clone)]
pub struct MockEngineFactory {
    build: Arc<Builder>,
    created: Arc<Mutex<Vec<MockEngine>>>,
}

impl fmt::Debug for MockEngineFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockEngineFactory")
            .field("created", &self.created().len())
            .finish_non_exhaustive()
    }
}

impl MockEngineFactory {
    /// Factory calling `build` for every context
    pub fn new(build: impl Fn() -> MockEngine + Send + Sync + 'static) -> Self {
        Self {
            build: Arc::new(build),
            created: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every engine handed out so far
    #[must_use]
    pub fn created(&self) -> Vec<MockEngine> {
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl EngineFactory for MockEngineFactory {
    async fn new_context(&self) -> E2eResult<Arc<dyn AutomationEngine>> {
        let engine = (self.build)();
        self.created
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(engine.clone());
        Ok(Arc::new(engine))
    }
}
