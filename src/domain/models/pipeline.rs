//! Loop-wide result: metrics of the latest round plus accumulated fixes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

use super::bug::BugReport;
use super::fix::VerifiedFix;
use super::run_result::{CoverageSummary, RunResult};

/// Why the loop stopped. None of these is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// A test run reported zero code bugs
    Converged,
    /// Bugs were found but fixing is turned off
    FixingDisabled,
    /// The effective loop cap was hit
    LoopCapReached,
    /// The token budget was spent before another fix round
    BudgetExhausted,
    /// A fix round applied nothing
    NoProgress,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Converged => "converged",
            Self::FixingDisabled => "fixing disabled",
            Self::LoopCapReached => "loop cap reached",
            Self::BudgetExhausted => "budget exhausted",
            Self::NoProgress => "no progress",
        };
        write!(f, "{s}")
    }
}

/// Accumulated result of a whole fix-loop run.
///
/// Test counters, coverage and `bugs_found` describe the latest round only.
/// `fixes_generated` and `fixes_applied` accumulate across rounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Identifier shared by every log line and history event of the run
    pub run_id: Uuid,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run ended
    pub finished_at: Option<DateTime<Utc>>,

    /// Cases in the latest test run
    pub tests_run: u32,
    /// Passed cases in the latest test run
    pub tests_passed: u32,
    /// Failed cases in the latest test run
    pub tests_failed: u32,
    /// Errored cases in the latest test run
    pub tests_errors: u32,
    /// Coverage of the latest test run
    pub coverage: Option<CoverageSummary>,

    /// Bugs open after the latest test run
    pub bugs_found: Vec<BugReport>,
    /// Every verified fix, across rounds
    pub fixes_generated: Vec<VerifiedFix>,
    /// Files rewritten, across rounds
    pub fixes_applied: Vec<PathBuf>,

    /// Number of test runs executed
    pub iterations_run: u32,
    /// Set when the loop stopped cleanly
    pub stop_reason: Option<StopReason>,

    /// False once any error was recorded
    pub success: bool,
    /// Errors that ended or marred the run
    pub errors: Vec<String>,
}

impl PipelineResult {
    /// Fresh result with a new run id, started now.
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            tests_run: 0,
            tests_passed: 0,
            tests_failed: 0,
            tests_errors: 0,
            coverage: None,
            bugs_found: Vec::new(),
            fixes_generated: Vec::new(),
            fixes_applied: Vec::new(),
            iterations_run: 0,
            stop_reason: None,
            success: true,
            errors: Vec::new(),
        }
    }

    /// Overwrite the latest-round test metrics.
    pub fn record_run(&mut self, run: &RunResult) {
        self.tests_run = run.total();
        self.tests_passed = run.passed;
        self.tests_failed = run.failed;
        self.tests_errors = run.errors;
        self.coverage.clone_from(&run.coverage);
    }

    /// Replace the bug list with this round's findings.
    pub fn record_bugs(&mut self, bugs: Vec<BugReport>) {
        self.bugs_found = bugs;
    }

    /// Append one round's fix output.
    pub fn record_fixes(&mut self, generated: Vec<VerifiedFix>, applied: Vec<PathBuf>) {
        self.fixes_generated.extend(generated);
        self.fixes_applied.extend(applied);
    }

    /// Record an error and mark the run unsuccessful.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.success = false;
        self.errors.push(message.into());
    }

    /// Stamp the finish time.
    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }
}

impl Default for PipelineResult {
    fn default() -> Self {
        Self::new()
    }
}
