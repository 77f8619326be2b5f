//! Step trace of a scenario attempt.
//!
//! Resolutions, actions and workflow steps are appended as [`TraceEntry`]s
//! and written as JSON next to the report when the [`TraceMode`] asks for it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

use crate::result::{E2eError, E2eResult};

/// When a trace file is kept
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TraceMode {
    /// Never
    Off,
    /// Every attempt
    On,
    /// Only the first retry of a failing scenario
    #[default]
    OnFirstRetry,
    /// Every failed attempt
    RetainOnFailure,
}

impl TraceMode {
    /// Whether attempt `attempt` (zero-based) should collect entries
    #[must_use]
    pub const fn records(self, attempt: u32) -> bool {
        match self {
            Self::Off => false,
            Self::On | Self::RetainOnFailure => true,
            Self::OnFirstRetry => attempt == 1,
        }
    }

    /// Whether the collected trace of an attempt is written out
    #[must_use]
    pub const fn keeps(self, attempt: u32, failed: bool) -> bool {
        match self {
            Self::Off => false,
            Self::On => true,
            Self::OnFirstRetry => attempt == 1,
            Self::RetainOnFailure => failed,
        }
    }
}

impl FromStr for TraceMode {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(Self::Off),
            "on" => Ok(Self::On),
            "on-first-retry" => Ok(Self::OnFirstRetry),
            "retain-on-failure" => Ok(Self::RetainOnFailure),
            other => Err(E2eError::config(format!(
                "unknown trace mode '{other}' (expected off, on, on-first-retry, retain-on-failure)"
            ))),
        }
    }
}

impl fmt::Display for TraceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Off => "off",
            Self::On => "on",
            Self::OnFirstRetry => "on-first-retry",
            Self::RetainOnFailure => "retain-on-failure",
        };
        f.write_str(s)
    }
}

/// What a trace entry describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceKind {
    /// Element resolution
    Resolution,
    /// Click, fill, press, hover or upload
    Action,
    /// Workflow state transition
    WorkflowStep,
    /// Page navigation
    Navigation,
    /// Polling verification
    Verification,
    /// Fixture setup or teardown
    Fixture,
}

/// Outcome of a traced step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceStatus {
    /// Completed
    Ok,
    /// Failed
    Error,
}

/// One traced step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Unique entry ID
    pub id: String,
    /// Step name
    pub name: String,
    /// Step kind
    pub kind: TraceKind,
    /// Start (ms since trace start)
    pub start_ms: u64,
    /// Duration
    pub duration_ms: u64,
    /// Outcome
    pub status: TraceStatus,
    /// Extra attributes (candidate, state names, ...)
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug)]
struct TraceInner {
    started: Instant,
    entries: Vec<TraceEntry>,
}

/// Shared, append-only trace; clones write to the same entries
#[derive(Debug, Clone)]
pub struct StepTrace {
    inner: Arc<Mutex<TraceInner>>,
}

impl Default for StepTrace {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct TraceFile<'a> {
    scenario: &'a str,
    attempt: u32,
    entries: &'a [TraceEntry],
}

impl StepTrace {
    /// Empty trace starting now
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(TraceInner {
                started: Instant::now(),
                entries: Vec::new(),
            })),
        }
    }

    /// Append a step that just finished after `duration`
    pub fn record<K, V>(
        &self,
        name: &str,
        kind: TraceKind,
        duration: Duration,
        status: TraceStatus,
        attributes: impl IntoIterator<Item = (K, V)>,
    ) where
        K: Into<String>,
        V: Into<String>,
    {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let end = inner.started.elapsed();
        let start = end.saturating_sub(duration);
        let entry = TraceEntry {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            kind,
            start_ms: start.as_millis() as u64,
            duration_ms: duration.as_millis() as u64,
            status,
            attributes: attributes
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        };
        inner.entries.push(entry);
    }

    /// Snapshot of every entry so far
    #[must_use]
    pub fn entries(&self) -> Vec<TraceEntry> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .clone()
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    /// No entries yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pretty JSON document for the trace
    pub fn to_json(&self, scenario: &str, attempt: u32) -> E2eResult<String> {
        let entries = self.entries();
        let file = TraceFile {
            scenario,
            attempt,
            entries: &entries,
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Write the trace JSON to `path`
    pub async fn write(&self, path: &Path, scenario: &str, attempt: u32) -> E2eResult<()> {
        let json = self.to_json(scenario, attempt)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, json).await?;
        Ok(())
    }
}
