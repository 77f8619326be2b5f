//! Output formatting and progress reporting

use console::{style, Style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use mezon_e2e::{RunReport, ScenarioReport, ScenarioStatus};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Output format for run results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON run report
    Json,
}

/// Progress and result lines on stderr
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    progress_bar: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new(true, false)
    }
}

impl ProgressReporter {
    /// Create a new progress reporter
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            progress_bar: None,
            use_color,
            quiet,
        }
    }

    /// Spinner shown while the suite runs
    pub fn start_spinner(&mut self, message: &str) {
        if self.quiet || !self.term.is_term() {
            return;
        }
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(120));
        self.progress_bar = Some(pb);
    }

    /// Stop the spinner
    pub fn finish(&mut self) {
        if let Some(pb) = self.progress_bar.take() {
            pb.finish_and_clear();
        }
    }

    fn prefix(&self, status: ScenarioStatus) -> String {
        if !self.use_color {
            return match status {
                ScenarioStatus::Passed => "PASS",
                ScenarioStatus::Failed => "FAIL",
                ScenarioStatus::Flaky => "FLAKY",
                ScenarioStatus::Skipped => "SKIP",
            }
            .to_string();
        }
        match status {
            ScenarioStatus::Passed => style("✓").green().bold().to_string(),
            ScenarioStatus::Failed => style("✗").red().bold().to_string(),
            ScenarioStatus::Flaky => style("~").yellow().bold().to_string(),
            ScenarioStatus::Skipped => style("-").dim().to_string(),
        }
    }

    /// Print one scenario outcome
    pub fn scenario(&self, report: &ScenarioReport) {
        // Failures are printed even in quiet mode
        if self.quiet && !report.status.is_failed() {
            return;
        }
        let mut line = format!(
            "{} [{}] {} ({:.1}s",
            self.prefix(report.status),
            report.feature,
            report.name,
            report.duration.as_secs_f64()
        );
        if report.attempts > 1 {
            line.push_str(&format!(", {} attempts", report.attempts));
        }
        line.push(')');
        let _ = self.term.write_line(&line);

        if let Some(error) = &report.error {
            let _ = self.term.write_line(&format!("    {error}"));
        }
        if !report.candidates.is_empty() {
            let _ = self.term.write_line("    tried:");
            for candidate in &report.candidates {
                let _ = self.term.write_line(&format!("      {candidate}"));
            }
        }
        for (label, path) in [("screenshot", &report.screenshot), ("trace", &report.trace)] {
            if let Some(path) = path {
                let _ = self.term.write_line(&format!("    {label}: {}", path.display()));
            }
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("⚠").yellow().bold().to_string()
        } else {
            "WARN".to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.quiet {
            return;
        }
        let prefix = if self.use_color {
            style("ℹ").blue().bold().to_string()
        } else {
            "INFO".to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }
        let styled = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };
        let _ = self.term.write_line("");
        let _ = self.term.write_line(&styled);
    }

    /// Print the run summary
    pub fn summary(&self, report: &RunReport) {
        if self.quiet && report.all_passed() {
            return;
        }
        for error in &report.hook_errors {
            let _ = self.term.write_line(&format!("hook: {error}"));
        }
        let _ = self.term.write_line("");
        let _ = self.term.write_line(&summary_line(report, self.use_color));
    }
}

/// Summary line of a run
#[must_use]
pub fn summary_line(report: &RunReport, use_color: bool) -> String {
    let failed = !report.all_passed();
    let secs = report.duration.as_secs_f64();
    if !use_color {
        let status = if failed { "FAILED" } else { "PASSED" };
        return format!(
            "{status} {} scenarios in {secs:.2}s ({} passed, {} failed, {} flaky, {} skipped)",
            report.total(),
            report.passed(),
            report.failed(),
            report.flaky(),
            report.skipped()
        );
    }
    let passed_style = Style::new().green().bold();
    let failed_style = Style::new().red().bold();
    let status = if failed {
        failed_style.apply_to("FAILED")
    } else {
        passed_style.apply_to("PASSED")
    };
    format!(
        "{status} {} scenarios in {secs:.2}s ({} passed, {} failed, {} flaky, {} skipped)",
        report.total(),
        passed_style.apply_to(report.passed()),
        if report.failed() > 0 {
            failed_style.apply_to(report.failed()).to_string()
        } else {
            report.failed().to_string()
        },
        Style::new().yellow().apply_to(report.flaky()),
        Style::new().dim().apply_to(report.skipped())
    )
}
