//! Test-run outcomes as reported by a test runner.
//!
//! A [`RunResult`] is produced fresh for every round of the loop and is
//! read-only to the orchestration core.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a single test case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseStatus {
    /// The case passed
    Passed,
    /// An assertion failed
    Failed,
    /// The case crashed before reaching a verdict
    Error,
    /// The case did not run
    Skipped,
}

impl CaseStatus {
    /// Whether the case ended in anything other than a pass.
    ///
    /// Skipped cases count as non-passing and are handed to bug analysis
    /// like failures; the analyzer decides whether they matter.
    pub fn is_failing(self) -> bool {
        !matches!(self, Self::Passed)
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Error => "error",
            Self::Skipped => "skipped",
        };
        write!(f, "{s}")
    }
}

/// Result of a single test case execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseResult {
    /// Case identifier as the runner reports it
    pub name: String,
    /// How the case ended
    pub status: CaseStatus,

    /// File the case lives in (may be empty when the runner cannot tell)
    #[serde(default)]
    pub file_path: String,

    /// Failure or error message, empty on pass
    #[serde(default)]
    pub failure_message: String,

    /// Raw stack trace, when the runner captured one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,

    /// Case duration in milliseconds
    #[serde(default)]
    pub duration_ms: f64,
}

impl CaseResult {
    /// Case with no file, message or timing.
    pub fn new(name: impl Into<String>, status: CaseStatus) -> Self {
        Self {
            name: name.into(),
            status,
            file_path: String::new(),
            failure_message: String::new(),
            stack_trace: None,
            duration_ms: 0.0,
        }
    }

    /// Set the file the case lives in.
    #[must_use]
    pub fn with_file(mut self, file_path: impl Into<String>) -> Self {
        self.file_path = file_path.into();
        self
    }

    /// Set the failure message.
    #[must_use]
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.failure_message = message.into();
        self
    }
}

/// Coverage totals attached to a run, when the runner collected any
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageSummary {
    /// Overall line coverage in percent
    pub line_coverage: f64,

    /// Branch coverage in percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_coverage: Option<f64>,

    /// Function coverage in percent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_coverage: Option<f64>,
}

/// Aggregated result of one full suite execution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Passed cases
    #[serde(default)]
    pub passed: u32,
    /// Failed cases
    #[serde(default)]
    pub failed: u32,
    /// Skipped cases
    #[serde(default)]
    pub skipped: u32,
    /// Errored cases
    #[serde(default)]
    pub errors: u32,

    /// Total cases; derived from the other counters when a report omits it
    #[serde(default)]
    total: Option<u32>,

    /// Per-case results, in report order
    #[serde(default)]
    pub test_cases: Vec<CaseResult>,

    /// Whole-run duration in milliseconds
    #[serde(default)]
    pub duration_ms: f64,

    /// Coverage, when collected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<CoverageSummary>,
}

impl RunResult {
    /// Build a run result from its cases, deriving the counters.
    pub fn from_cases(test_cases: Vec<CaseResult>) -> Self {
        let mut result = Self::default();
        for case in &test_cases {
            match case.status {
                CaseStatus::Passed => result.passed += 1,
                CaseStatus::Failed => result.failed += 1,
                CaseStatus::Error => result.errors += 1,
                CaseStatus::Skipped => result.skipped += 1,
            }
        }
        result.test_cases = test_cases;
        result
    }

    /// Reported total, or the saturating sum of the counters.
    pub fn total(&self) -> u32 {
        self.total.unwrap_or_else(|| {
            self.passed
                .saturating_add(self.failed)
                .saturating_add(self.skipped)
                .saturating_add(self.errors)
        })
    }

    /// Cases whose status is anything but passed, in report order.
    pub fn failing_cases(&self) -> impl Iterator<Item = &CaseResult> {
        self.test_cases.iter().filter(|c| c.status.is_failing())
    }
}
