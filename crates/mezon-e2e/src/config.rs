//! Suite configuration resolved from the environment.
//!
//! [`SuiteConfig::from_lookup`] is the testable core; [`SuiteConfig::from_env`]
//! feeds it `std::env::var`. Invalid values fail with a `Config` error naming
//! the variable.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::auth::MezonSessionEndpoint;
use crate::result::{E2eError, E2eResult};
use crate::trace::TraceMode;
use crate::wait::PollOptions;

/// Screenshot capture policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScreenshotMode {
    /// Never
    Off,
    /// After every attempt
    On,
    /// After failed attempts
    #[default]
    OnlyOnFailure,
}

impl ScreenshotMode {
    /// Whether an attempt with this outcome gets a screenshot
    #[must_use]
    pub const fn captures(self, failed: bool) -> bool {
        match self {
            Self::Off => false,
            Self::On => true,
            Self::OnlyOnFailure => failed,
        }
    }
}

impl FromStr for ScreenshotMode {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "on" => Ok(Self::On),
            "only-on-failure" => Ok(Self::OnlyOnFailure),
            other => Err(E2eError::config(format!(
                "unknown screenshot mode '{other}' (expected off, on, only-on-failure)"
            ))),
        }
    }
}

impl fmt::Display for ScreenshotMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Off => "off",
            Self::On => "on",
            Self::OnlyOnFailure => "only-on-failure",
        })
    }
}

/// Video capture policy
///
/// Parsed and reported; the CDP engine records no video.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VideoMode {
    /// Never
    #[default]
    Off,
    /// Every attempt
    On,
    /// Keep for failed attempts
    RetainOnFailure,
}

impl FromStr for VideoMode {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "on" => Ok(Self::On),
            "retain-on-failure" => Ok(Self::RetainOnFailure),
            other => Err(E2eError::config(format!(
                "unknown video mode '{other}' (expected off, on, retain-on-failure)"
            ))),
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Resolved configuration of a suite run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteConfig {
    /// Application base URL
    pub base_url: String,
    /// Realtime endpoint written to `mezon_session`
    pub session_endpoint: MezonSessionEndpoint,
    /// Scenarios run in parallel
    pub workers: usize,
    /// Headless browser
    pub headless: bool,
    /// Retries per failing scenario
    pub retries: u32,
    /// Overall deadline of one scenario attempt
    #[serde(rename = "test_timeout_ms", with = "duration_ms")]
    pub test_timeout: Duration,
    /// Per-candidate resolver timeout
    #[serde(rename = "resolve_timeout_ms", with = "duration_ms")]
    pub resolve_timeout: Duration,
    /// Upper bound of one engine action
    #[serde(rename = "action_timeout_ms", with = "duration_ms")]
    pub action_timeout: Duration,
    /// Polling verification budget
    #[serde(rename = "verify_timeout_ms", with = "duration_ms")]
    pub verify_timeout: Duration,
    /// Navigation timeout
    #[serde(rename = "navigation_timeout_ms", with = "duration_ms")]
    pub navigation_timeout: Duration,
    /// Polling interval
    #[serde(rename = "poll_interval_ms", with = "duration_ms")]
    pub poll_interval: Duration,
    /// Screenshot capture
    pub screenshot: ScreenshotMode,
    /// Video capture
    pub video: VideoMode,
    /// Step trace capture
    pub trace: TraceMode,
    /// Account/session file (JSON or YAML)
    pub accounts_file: Option<PathBuf>,
    /// Directory for reports, screenshots and traces
    pub output_dir: PathBuf,
    /// Running on CI
    pub ci: bool,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self::defaults(false)
    }
}

fn truthy(value: &str) -> bool {
    !matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "" | "0" | "false" | "no" | "off"
    )
}

fn parse_bool(key: &str, value: &str) -> E2eResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(E2eError::config(format!("{key}: expected a boolean, got '{value}'"))),
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> E2eResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| E2eError::config(format!("{key}: expected a number, got '{value}'")))
}

fn parse_millis(key: &str, value: &str) -> E2eResult<Duration> {
    let ms: u64 = parse_number(key, value)?;
    if ms == 0 {
        return Err(E2eError::config(format!("{key}: must be greater than zero")));
    }
    Ok(Duration::from_millis(ms))
}

fn named<T>(key: &str, value: &str) -> E2eResult<T>
where
    T: FromStr<Err = E2eError>,
{
    value
        .parse()
        .map_err(|e: E2eError| E2eError::config(format!("{key}: {e}")))
}

impl SuiteConfig {
    /// Defaults, with CI-dependent worker and retry counts
    #[must_use]
    pub fn defaults(ci: bool) -> Self {
        Self {
            base_url: "http://localhost:4200".to_string(),
            session_endpoint: MezonSessionEndpoint::default(),
            workers: if ci { 1 } else { 4 },
            headless: true,
            retries: if ci { 2 } else { 0 },
            test_timeout: Duration::from_secs(120),
            resolve_timeout: Duration::from_secs(5),
            action_timeout: Duration::from_secs(10),
            verify_timeout: Duration::from_secs(10),
            navigation_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(100),
            screenshot: ScreenshotMode::OnlyOnFailure,
            video: VideoMode::Off,
            trace: TraceMode::OnFirstRetry,
            accounts_file: None,
            output_dir: PathBuf::from("target/mezon-e2e"),
            ci,
        }
    }

    /// Resolve from the process environment
    pub fn from_env() -> E2eResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> E2eResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ci = lookup("CI").is_some_and(|v| truthy(&v));
        let mut config = Self::defaults(ci);
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("MEZON_BASE_URL") {
            config.base_url = v.trim().trim_end_matches('/').to_string();
        }
        if let Some(v) = get("MEZON_WS_HOST") {
            config.session_endpoint.host = v.trim().to_string();
        }
        if let Some(v) = get("MEZON_WS_PORT") {
            config.session_endpoint.port = parse_number("MEZON_WS_PORT", &v)?;
        }
        if let Some(v) = get("MEZON_WS_SSL") {
            config.session_endpoint.ssl = parse_bool("MEZON_WS_SSL", &v)?;
        }
        if let Some(v) = get("E2E_WORKERS") {
            config.workers = parse_number("E2E_WORKERS", &v)?;
        }
        if let Some(v) = get("E2E_HEADLESS") {
            config.headless = parse_bool("E2E_HEADLESS", &v)?;
        }
        if let Some(v) = get("E2E_RETRIES") {
            config.retries = parse_number("E2E_RETRIES", &v)?;
        }
        for (key, slot) in [
            ("E2E_TEST_TIMEOUT_MS", &mut config.test_timeout),
            ("E2E_RESOLVE_TIMEOUT_MS", &mut config.resolve_timeout),
            ("E2E_ACTION_TIMEOUT_MS", &mut config.action_timeout),
            ("E2E_VERIFY_TIMEOUT_MS", &mut config.verify_timeout),
            ("E2E_NAVIGATION_TIMEOUT_MS", &mut config.navigation_timeout),
            ("E2E_POLL_INTERVAL_MS", &mut config.poll_interval),
        ] {
            if let Some(v) = get(key) {
                *slot = parse_millis(key, &v)?;
            }
        }
        if let Some(v) = get("E2E_SCREENSHOT") {
            config.screenshot = named("E2E_SCREENSHOT", &v)?;
        }
        if let Some(v) = get("E2E_VIDEO") {
            config.video = named("E2E_VIDEO", &v)?;
        }
        if let Some(v) = get("E2E_TRACE") {
            config.trace = named("E2E_TRACE", &v)?;
        }
        if let Some(v) = get("E2E_ACCOUNTS_FILE") {
            config.accounts_file = Some(PathBuf::from(v.trim()));
        }
        if let Some(v) = get("E2E_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(v.trim());
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values no run can work with
    pub fn validate(&self) -> E2eResult<()> {
        if self.workers == 0 {
            return Err(E2eError::config("E2E_WORKERS: must be at least 1"));
        }
        if self.base_url.is_empty() {
            return Err(E2eError::config("MEZON_BASE_URL: must not be empty"));
        }
        for (key, value) in [
            ("E2E_TEST_TIMEOUT_MS", self.test_timeout),
            ("E2E_RESOLVE_TIMEOUT_MS", self.resolve_timeout),
            ("E2E_ACTION_TIMEOUT_MS", self.action_timeout),
            ("E2E_VERIFY_TIMEOUT_MS", self.verify_timeout),
            ("E2E_NAVIGATION_TIMEOUT_MS", self.navigation_timeout),
            ("E2E_POLL_INTERVAL_MS", self.poll_interval),
        ] {
            if value.is_zero() {
                return Err(E2eError::config(format!("{key}: must be greater than zero")));
            }
        }
        Ok(())
    }

    /// Verification budget and polling interval
    #[must_use]
    pub const fn poll_options(&self) -> PollOptions {
        PollOptions {
            timeout: self.verify_timeout,
            interval: self.poll_interval,
        }
    }

    /// Absolute URL of an application path
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the number of parallel scenarios
    #[must_use]
    pub const fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set the number of retries
    #[must_use]
    pub const fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Set the per-attempt deadline
    #[must_use]
    pub const fn with_test_timeout(mut self, timeout: Duration) -> Self {
        self.test_timeout = timeout;
        self
    }

    /// Set the per-candidate resolver timeout
    #[must_use]
    pub const fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout;
        self
    }

    /// Set the verification budget
    #[must_use]
    pub const fn with_verify_timeout(mut self, timeout: Duration) -> Self {
        self.verify_timeout = timeout;
        self
    }

    /// Set the output directory
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set the screenshot mode
    #[must_use]
    pub const fn with_screenshot(mut self, mode: ScreenshotMode) -> Self {
        self.screenshot = mode;
        self
    }

    /// Set the trace mode
    #[must_use]
    pub const fn with_trace(mut self, mode: TraceMode) -> Self {
        self.trace = mode;
        self
    }
}
