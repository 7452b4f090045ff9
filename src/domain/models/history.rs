//! Run history records.
//!
//! Every test run and every confirmed bug leaves one [`HistoryEvent`] behind,
//! so trends can be read back across runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::bug::{BugReport, BugSeverity, BugType};
use super::run_result::RunResult;

/// Outcome of one test run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestExecutionSnapshot {
    /// Loop run the test run belongs to
    pub run_id: Uuid,
    /// 1-based round within that loop run
    pub iteration: u32,
    /// When the run was recorded
    pub timestamp: DateTime<Utc>,
    /// Number of cases in the run
    pub total_tests: u32,
    /// Number of passed cases
    pub passed_tests: u32,
    /// Number of failed cases
    pub failed_tests: u32,
    /// Number of skipped cases
    #[serde(default)]
    pub skipped_tests: u32,
    /// Number of cases that errored
    #[serde(default)]
    pub error_tests: u32,
    /// Whole-run duration, when the runner measured one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration_ms: Option<f64>,
}

impl TestExecutionSnapshot {
    /// Snapshot of `run`, taken now.
    pub fn from_run(run_id: Uuid, iteration: u32, run: &RunResult) -> Self {
        Self {
            run_id,
            iteration,
            timestamp: Utc::now(),
            total_tests: run.total(),
            passed_tests: run.passed,
            failed_tests: run.failed,
            skipped_tests: run.skipped,
            error_tests: run.errors,
            total_duration_ms: (run.duration_ms > 0.0).then_some(run.duration_ms),
        }
    }
}

/// A confirmed code bug, as first seen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BugSnapshot {
    /// Loop run that found the bug
    pub run_id: Uuid,
    /// 1-based round that found the bug
    pub iteration: u32,
    /// When the bug was recorded
    pub timestamp: DateTime<Utc>,
    /// Kind of defect
    pub bug_type: BugType,
    /// How bad it is
    pub severity: BugSeverity,
    /// File the bug lives in, as reported
    pub file_path: String,
    /// Line of the bug, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u32>,
    /// Short description
    pub title: String,
}

impl BugSnapshot {
    /// Snapshot of a bug discovered now.
    pub fn discovered(run_id: Uuid, iteration: u32, bug: &BugReport) -> Self {
        Self {
            run_id,
            iteration,
            timestamp: Utc::now(),
            bug_type: bug.bug_type,
            severity: bug.severity,
            file_path: bug.location.file_path.clone(),
            line_number: bug.location.line_number,
            title: bug.title.clone(),
        }
    }
}

/// One line of the run history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum HistoryEvent {
    /// A test run finished
    TestExecution(TestExecutionSnapshot),
    /// Bug analysis confirmed a code bug
    BugDiscovered(BugSnapshot),
}

impl HistoryEvent {
    /// Loop run the event belongs to.
    pub fn run_id(&self) -> Uuid {
        match self {
            Self::TestExecution(snapshot) => snapshot.run_id,
            Self::BugDiscovered(snapshot) => snapshot.run_id,
        }
    }
}
