//! Run report.
//!
//! One [`ScenarioReport`] per scenario, collected into a [`RunReport`] that
//! is written as JSON to the output directory. A scenario that failed and
//! then passed on retry is reported as flaky, not as passed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::result::{E2eError, E2eResult};
use crate::selector::Candidate;

/// Failure handling across scenarios
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureMode {
    /// Skip remaining scenarios after the first failure
    FailFast,
    /// Run every scenario
    #[default]
    CollectAll,
}

/// Final status of one scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioStatus {
    /// Passed on the first attempt
    Passed,
    /// Failed every attempt
    Failed,
    /// Passed after at least one failed attempt
    Flaky,
    /// Not run
    Skipped,
}

impl ScenarioStatus {
    /// Check if the scenario counts as failed
    #[must_use]
    pub const fn is_failed(self) -> bool {
        matches!(self, Self::Failed)
    }

    /// Check if the scenario eventually passed
    #[must_use]
    pub const fn is_passed(self) -> bool {
        matches!(self, Self::Passed | Self::Flaky)
    }
}

impl fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Flaky => "flaky",
            Self::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Outcome of one scenario across its attempts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Scenario name
    pub name: String,
    /// Feature area
    pub feature: String,
    /// Final status
    pub status: ScenarioStatus,
    /// Attempts made
    pub attempts: u32,
    /// Wall time across all attempts
    #[serde(rename = "duration_ms", with = "millis")]
    pub duration: Duration,
    /// Error of the last failed attempt
    pub error: Option<String>,
    /// Candidates tried, when the last failure was a resolution failure
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    /// Failure screenshot
    pub screenshot: Option<PathBuf>,
    /// Step trace file
    pub trace: Option<PathBuf>,
}

impl ScenarioReport {
    /// Report for a scenario that was not run
    #[must_use]
    pub fn skipped(name: impl Into<String>, feature: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            feature: feature.into(),
            status: ScenarioStatus::Skipped,
            attempts: 0,
            duration: Duration::ZERO,
            error: None,
            candidates: Vec::new(),
            screenshot: None,
            trace: None,
        }
    }

    /// Report after `attempts` attempts; `error` is the last failure, if the
    /// final attempt failed
    #[must_use]
    pub fn finished(
        name: impl Into<String>,
        feature: impl Into<String>,
        attempts: u32,
        duration: Duration,
        error: Option<&E2eError>,
    ) -> Self {
        let status = match (error, attempts) {
            (Some(_), _) => ScenarioStatus::Failed,
            (None, 0 | 1) => ScenarioStatus::Passed,
            (None, _) => ScenarioStatus::Flaky,
        };
        Self {
            name: name.into(),
            feature: feature.into(),
            status,
            attempts,
            duration,
            error: error.map(ToString::to_string),
            candidates: error
                .and_then(E2eError::candidates)
                .map(<[Candidate]>::to_vec)
                .unwrap_or_default(),
            screenshot: None,
            trace: None,
        }
    }

    /// Attach a screenshot path
    #[must_use]
    pub fn with_screenshot(mut self, path: PathBuf) -> Self {
        self.screenshot = Some(path);
        self
    }

    /// Attach a trace path
    #[must_use]
    pub fn with_trace(mut self, path: PathBuf) -> Self {
        self.trace = Some(path);
        self
    }
}

/// Report of one suite run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Suite name
    pub suite: String,
    /// Start of the run
    pub started_at: chrono::DateTime<chrono::Utc>,
    /// Wall time of the run
    #[serde(rename = "duration_ms", with = "millis")]
    pub duration: Duration,
    /// Scenario reports, in suite order
    pub scenarios: Vec<ScenarioReport>,
    /// Failures of `before_all` / `after_all`
    #[serde(default)]
    pub hook_errors: Vec<String>,
}

impl RunReport {
    /// Empty report starting now
    #[must_use]
    pub fn new(suite: impl Into<String>) -> Self {
        Self {
            suite: suite.into(),
            started_at: chrono::Utc::now(),
            duration: Duration::ZERO,
            scenarios: Vec::new(),
            hook_errors: Vec::new(),
        }
    }

    /// Add a scenario report
    pub fn push(&mut self, report: ScenarioReport) {
        self.scenarios.push(report);
    }

    fn count(&self, status: ScenarioStatus) -> usize {
        self.scenarios.iter().filter(|s| s.status == status).count()
    }

    /// Scenarios that passed first time
    #[must_use]
    pub fn passed(&self) -> usize {
        self.count(ScenarioStatus::Passed)
    }

    /// Scenarios that failed every attempt
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(ScenarioStatus::Failed)
    }

    /// Scenarios that passed on retry
    #[must_use]
    pub fn flaky(&self) -> usize {
        self.count(ScenarioStatus::Flaky)
    }

    /// Scenarios not run
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(ScenarioStatus::Skipped)
    }

    /// Total scenarios
    #[must_use]
    pub fn total(&self) -> usize {
        self.scenarios.len()
    }

    /// No scenario or suite hook failed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed() == 0 && self.hook_errors.is_empty()
    }

    /// Failed scenario reports
    #[must_use]
    pub fn failures(&self) -> Vec<&ScenarioReport> {
        self.scenarios
            .iter()
            .filter(|s| s.status.is_failed())
            .collect()
    }

    /// Report for the scenario named `name`
    #[must_use]
    pub fn scenario(&self, name: &str) -> Option<&ScenarioReport> {
        self.scenarios.iter().find(|s| s.name == name)
    }

    /// One-line summary
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{}: {} passed, {} failed, {} flaky, {} skipped ({} total) in {:.1}s",
            self.suite,
            self.passed(),
            self.failed(),
            self.flaky(),
            self.skipped(),
            self.total(),
            self.duration.as_secs_f64()
        )
    }

    /// Pretty JSON document
    pub fn to_json(&self) -> E2eResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the JSON report to `path`
    pub async fn write_json(&self, path: &Path) -> E2eResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, self.to_json()?).await?;
        Ok(())
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

// ============================================================================
// Tests
// ============================================================================
