//! Chromium engine over the DevTools protocol.
//!
//! One browser process is shared by the whole run; every call to
//! [`CdpEngineFactory::new_context`] opens an isolated browser context
//! (separate cookies and localStorage) with a single page.
//!
//! Element handles are `(selector, index)` pairs re-evaluated on every call,
//! so a node that left the document is reported as detached instead of
//! acting on a stale reference.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::dom::SetFileInputFilesParams;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams,
    DispatchMouseEventType,
};
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, CaptureScreenshotParams};
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams,
};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::{AutomationEngine, ElementHandle, EngineFactory, Screenshot};
use crate::result::{E2eError, E2eResult};
use crate::selector::Selector;

const VISIBLE_JS: &str = "el => { const s = getComputedStyle(el); \
     const r = el.getBoundingClientRect(); \
     return s.display !== 'none' && s.visibility !== 'hidden' \
     && r.width > 0 && r.height > 0; }";

/// Launch options for the shared browser
#[derive(Debug, Clone)]
pub struct CdpOptions {
    /// Run without a window
    pub headless: bool,
    /// Keep Chromium's sandbox enabled
    pub sandbox: bool,
    /// Explicit Chromium binary
    pub chromium_path: Option<PathBuf>,
    /// Window size
    pub viewport: (u32, u32),
    /// Upper bound for one navigation
    pub navigation_timeout: Duration,
}

impl Default for CdpOptions {
    fn default() -> Self {
        Self {
            headless: true,
            sandbox: true,
            chromium_path: None,
            viewport: (1280, 720),
            navigation_timeout: Duration::from_secs(30),
        }
    }
}

impl CdpOptions {
    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set the navigation timeout
    #[must_use]
    pub const fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    /// Disable the sandbox (needed in most containers)
    #[must_use]
    pub const fn without_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

fn engine_err(context: &str) -> impl Fn(chromiumoxide::error::CdpError) -> E2eError + '_ {
    move |e| E2eError::Engine {
        message: format!("{context}: {e}"),
    }
}

/// Launches Chromium once and hands out isolated contexts
pub struct CdpEngineFactory {
    options: CdpOptions,
    browser: Arc<Mutex<CdpBrowser>>,
    handle: tokio::task::JoinHandle<()>,
}

impl fmt::Debug for CdpEngineFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CdpEngineFactory")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl CdpEngineFactory {
    /// Launch the browser
    pub async fn launch(options: CdpOptions) -> E2eResult<Self> {
        let mut builder = CdpConfig::builder()
            .window_size(options.viewport.0, options.viewport.1);

        if !options.headless {
            builder = builder.with_head();
        }

        if !options.sandbox {
            builder = builder.no_sandbox();
        }

        if let Some(ref path) = options.chromium_path {
            builder = builder.chrome_executable(path);
        }

        let config = builder
            .build()
            .map_err(|message| E2eError::BrowserLaunch { message })?;

        let (browser, mut handler) =
            CdpBrowser::launch(config)
                .await
                .map_err(|e| E2eError::BrowserLaunch {
                    message: e.to_string(),
                })?;

        let handle = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        tracing::info!(headless = options.headless, "browser launched");
        Ok(Self {
            options,
            browser: Arc::new(Mutex::new(browser)),
            handle,
        })
    }
}

#[async_trait]
impl EngineFactory for CdpEngineFactory {
    async fn new_context(&self) -> E2eResult<Arc<dyn AutomationEngine>> {
        let mut browser = self.browser.lock().await;
        let context_id = browser
            .create_browser_context(CreateBrowserContextParams::default())
            .await
            .map_err(engine_err("create browser context"))?;
        let target = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id.clone())
            .build()
            .map_err(E2eError::engine)?;
        let page = browser
            .new_page(target)
            .await
            .map_err(engine_err("open page"))?;
        Ok(Arc::new(CdpEngine {
            page,
            browser: Arc::clone(&self.browser),
            context_id,
            navigation_timeout: self.options.navigation_timeout,
        }))
    }

    async fn shutdown(&self) -> E2eResult<()> {
        let mut browser = self.browser.lock().await;
        browser
            .close()
            .await
            .map_err(|e| E2eError::BrowserLaunch {
                message: e.to_string(),
            })?;
        self.handle.abort();
        Ok(())
    }
}

/// One isolated page inside a shared browser
pub struct CdpEngine {
    page: CdpPage,
    browser: Arc<Mutex<CdpBrowser>>,
    context_id: BrowserContextId,
    navigation_timeout: Duration,
}

impl fmt::Debug for CdpEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CdpEngine")
            .field("context_id", &self.context_id)
            .finish_non_exhaustive()
    }
}

impl CdpEngine {
    async fn eval(&self, expression: String) -> E2eResult<Value> {
        let params = EvaluateParams::builder()
            .expression(expression)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(E2eError::engine)?;
        let result = self
            .page
            .evaluate_expression(params)
            .await
            .map_err(engine_err("evaluate"))?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    /// Run `body` (a JS function of the element) against the handle's node
    async fn with_element(&self, element: &ElementHandle, body: &str) -> E2eResult<Value> {
        let js = format!(
            "(() => {{ const el = ({query})[{index}]; \
             if (!el || !el.isConnected) return {{ detached: true }}; \
             return {{ detached: false, value: ({body})(el) }}; }})()",
            query = element.selector.to_query_all(),
            index = element.index,
        );
        let out = self.eval(js).await?;
        if out.get("detached").and_then(Value::as_bool).unwrap_or(true) {
            return Err(E2eError::Detached {
                element: element.to_string(),
            });
        }
        Ok(out.get("value").cloned().unwrap_or(Value::Null))
    }

    async fn center(&self, element: &ElementHandle) -> E2eResult<(f64, f64)> {
        let v = self
            .with_element(
                element,
                "el => { el.scrollIntoView({ block: 'center', inline: 'center', \
                 behavior: 'instant' }); const r = el.getBoundingClientRect(); \
                 return [r.x + r.width / 2, r.y + r.height / 2]; }",
            )
            .await?;
        let x = v.get(0).and_then(Value::as_f64);
        let y = v.get(1).and_then(Value::as_f64);
        x.zip(y)
            .ok_or_else(|| E2eError::engine(format!("no bounding box for {element}")))
    }

    async fn key_event(&self, kind: DispatchKeyEventType, key: &str) -> E2eResult<()> {
        let mut builder = DispatchKeyEventParams::builder().r#type(kind.clone()).key(key);
        if kind == DispatchKeyEventType::KeyDown {
            if let Some(text) = key_text(key) {
                builder = builder.text(text);
            }
        }
        let params = builder.build().map_err(E2eError::engine)?;
        self.page
            .execute(params)
            .await
            .map_err(engine_err("dispatch key"))?;
        Ok(())
    }
}

fn key_text(key: &str) -> Option<String> {
    match key {
        "Enter" => Some("\r".to_string()),
        "Tab" => Some("\t".to_string()),
        k if k.chars().count() == 1 => Some(k.to_string()),
        _ => None,
    }
}

#[async_trait]
impl AutomationEngine for CdpEngine {
    async fn navigate(&self, url: &str) -> E2eResult<()> {
        let nav = self.page.goto(url);
        match tokio::time::timeout(self.navigation_timeout, nav).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(E2eError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(E2eError::Navigation {
                url: url.to_string(),
                message: format!("timed out after {:?}", self.navigation_timeout),
            }),
        }
    }

    async fn current_url(&self) -> E2eResult<String> {
        let url = self.page.url().await.map_err(engine_err("read url"))?;
        Ok(url.unwrap_or_default())
    }

    async fn reload(&self) -> E2eResult<()> {
        let url = self.current_url().await?;
        self.navigate(&url).await
    }

    async fn query_all(&self, selector: &Selector) -> E2eResult<Vec<ElementHandle>> {
        let count = self
            .eval(format!("({}).length", selector.to_query_all()))
            .await?
            .as_u64()
            .unwrap_or(0) as usize;
        Ok((0..count)
            .map(|index| ElementHandle::new(format!("{selector}#{index}"), selector.clone(), index))
            .collect())
    }

    async fn is_visible(&self, element: &ElementHandle) -> E2eResult<bool> {
        match self.with_element(element, VISIBLE_JS).await {
            Ok(v) => Ok(v.as_bool().unwrap_or(false)),
            Err(E2eError::Detached { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn text_content(&self, element: &ElementHandle) -> E2eResult<String> {
        let v = self
            .with_element(element, "el => el.textContent || ''")
            .await?;
        Ok(v.as_str().unwrap_or_default().to_string())
    }

    async fn attribute(&self, element: &ElementHandle, name: &str) -> E2eResult<Option<String>> {
        let name = serde_json::to_string(name)?;
        let v = self
            .with_element(element, &format!("el => el.getAttribute({name})"))
            .await?;
        Ok(v.as_str().map(ToString::to_string))
    }

    async fn input_value(&self, element: &ElementHandle) -> E2eResult<String> {
        let v = self
            .with_element(
                element,
                "el => el.isContentEditable ? (el.textContent || '') : (el.value ?? '')",
            )
            .await?;
        Ok(v.as_str().unwrap_or_default().to_string())
    }

    async fn click(&self, element: &ElementHandle) -> E2eResult<()> {
        self.with_element(
            element,
            "el => { el.scrollIntoView({ block: 'center', inline: 'center', \
             behavior: 'instant' }); el.click(); return true; }",
        )
        .await?;
        Ok(())
    }

    async fn fill(&self, element: &ElementHandle, text: &str) -> E2eResult<()> {
        let text = serde_json::to_string(text)?;
        let body = format!(
            "el => {{ el.focus(); \
             if (el.isContentEditable) {{ el.textContent = {text}; \
               el.dispatchEvent(new InputEvent('input', {{ bubbles: true }})); return true; }} \
             const proto = Object.getPrototypeOf(el); \
             const setter = Object.getOwnPropertyDescriptor(proto, 'value')?.set; \
             if (setter) setter.call(el, {text}); else el.value = {text}; \
             el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
             el.dispatchEvent(new Event('change', {{ bubbles: true }})); return true; }}"
        );
        self.with_element(element, &body).await?;
        Ok(())
    }

    async fn press(&self, element: &ElementHandle, key: &str) -> E2eResult<()> {
        self.with_element(element, "el => { el.focus(); return true; }")
            .await?;
        self.key_event(DispatchKeyEventType::KeyDown, key).await?;
        self.key_event(DispatchKeyEventType::KeyUp, key).await
    }

    async fn hover(&self, element: &ElementHandle) -> E2eResult<()> {
        let (x, y) = self.center(element).await?;
        let params = DispatchMouseEventParams::builder()
            .r#type(DispatchMouseEventType::MouseMoved)
            .x(x)
            .y(y)
            .build()
            .map_err(E2eError::engine)?;
        self.page
            .execute(params)
            .await
            .map_err(engine_err("hover"))?;
        Ok(())
    }

    async fn set_input_files(&self, element: &ElementHandle, files: &[PathBuf]) -> E2eResult<()> {
        // Needs a remote object id, so evaluate without return_by_value.
        let js = format!(
            "({})[{}] ?? null",
            element.selector.to_query_all(),
            element.index
        );
        let params = EvaluateParams::builder()
            .expression(js)
            .return_by_value(false)
            .build()
            .map_err(E2eError::engine)?;
        let result = self
            .page
            .evaluate_expression(params)
            .await
            .map_err(engine_err("locate file input"))?;
        let object_id = result
            .object()
            .object_id
            .clone()
            .ok_or_else(|| E2eError::Detached {
                element: element.to_string(),
            })?;
        let files = files
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        let params = SetFileInputFilesParams::builder()
            .files(files)
            .object_id(object_id)
            .build()
            .map_err(E2eError::engine)?;
        self.page
            .execute(params)
            .await
            .map_err(engine_err("set input files"))?;
        Ok(())
    }

    async fn set_local_storage(&self, key: &str, value: &str) -> E2eResult<()> {
        let key = serde_json::to_string(key)?;
        let value = serde_json::to_string(value)?;
        self.eval(format!("localStorage.setItem({key}, {value})"))
            .await?;
        Ok(())
    }

    async fn get_local_storage(&self, key: &str) -> E2eResult<Option<String>> {
        let key = serde_json::to_string(key)?;
        let v = self.eval(format!("localStorage.getItem({key})")).await?;
        Ok(v.as_str().map(ToString::to_string))
    }

    async fn screenshot(&self) -> E2eResult<Screenshot> {
        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();

        let screenshot = self
            .page
            .execute(params)
            .await
            .map_err(engine_err("capture screenshot"))?;

        use base64::Engine;
        let data = base64::engine::general_purpose::STANDARD
            .decode(&screenshot.data)
            .map_err(|e| E2eError::engine(e.to_string()))?;
        Ok(Screenshot::new(data))
    }

    async fn close(&self) -> E2eResult<()> {
        self.page
            .clone()
            .close()
            .await
            .map_err(engine_err("close page"))?;
        let mut browser = self.browser.lock().await;
        browser
            .dispose_browser_context(self.context_id.clone())
            .await
            .map_err(engine_err("dispose browser context"))?;
        Ok(())
    }
}
