//! Error taxonomy for the fix loop.
//!
//! Recovery happens as locally as possible: a [`StageError`] abandons one bug,
//! an analysis failure drops one case, and only an [`InfrastructureError`] or a
//! [`RoundError`] reaches the loop controller.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// A collaborator stage failed for one unit of work.
#[derive(Debug, Error)]
pub enum StageError {
    /// The stage answered with a failed status
    #[error("{stage} reported failure: {}", .errors.join("; "))]
    Failed {
        /// Stage name
        stage: String,
        /// Errors the stage reported
        errors: Vec<String>,
    },

    /// Completed status, but no result payload
    #[error("{stage} returned a completed status without a result")]
    MissingResult {
        /// Stage name
        stage: String,
    },

    /// The command could not be started or exited non-zero
    #[error("{stage} command could not be run: {message}")]
    Command {
        /// Stage name
        stage: String,
        /// What went wrong
        message: String,
    },

    /// Output was not a valid response envelope
    #[error("{stage} produced malformed output: {source}")]
    Malformed {
        /// Stage name
        stage: String,
        /// Parse failure
        #[source]
        source: serde_json::Error,
    },

    /// The call ran past `stages.timeout_secs`
    #[error("{stage} did not answer within {}s", .timeout.as_secs())]
    Timeout {
        /// Stage name
        stage: String,
        /// Limit that was exceeded
        timeout: Duration,
    },

    /// Reading or writing on the stage's behalf failed
    #[error("I/O error in {stage}: {source}")]
    Io {
        /// Stage name
        stage: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl StageError {
    /// [`StageError::Failed`] for `stage`.
    pub fn failed(stage: impl Into<String>, errors: Vec<String>) -> Self {
        Self::Failed {
            stage: stage.into(),
            errors,
        }
    }

    /// [`StageError::Command`] for `stage`.
    pub fn command(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Command {
            stage: stage.into(),
            message: message.into(),
        }
    }
}

/// Test execution failed.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// No program to launch
    #[error("test command is empty")]
    EmptyCommand,

    /// The test program could not be spawned
    #[error("failed to launch test command `{program}`: {source}")]
    Launch {
        /// Program that failed to start
        program: String,
        /// Spawn error
        #[source]
        source: std::io::Error,
    },

    /// The run outlived its limit and was killed
    #[error("test run exceeded its {}s timeout", .0.as_secs())]
    Timeout(Duration),

    /// The command left no readable report
    #[error("run report {} could not be read: {source}", .path.display())]
    ReportMissing {
        /// Expected report location
        path: PathBuf,
        /// Read error
        #[source]
        source: std::io::Error,
    },

    /// The report did not parse as a run result
    #[error("run report {} is not a valid run result: {source}", .path.display())]
    ReportInvalid {
        /// Report location
        path: PathBuf,
        /// Parse error
        #[source]
        source: serde_json::Error,
    },

    /// Anything else a runner reports
    #[error("{0}")]
    Other(String),
}

/// Setup failures that abort a run before any round starts.
#[derive(Debug, Error)]
pub enum InfrastructureError {
    /// No framework detected the project
    #[error("No test runner available for {}", .0.display())]
    NoTestRunner(PathBuf),

    /// The requested framework is not registered
    #[error("Unknown test framework: {0}")]
    UnknownFramework(String),

    /// The runner's tooling is missing
    #[error("Prerequisites not satisfied for {runner}: {reason}")]
    Prerequisites {
        /// Runner name
        runner: String,
        /// What is missing
        reason: String,
    },

    /// The project path is not a directory
    #[error("Project root {} is not a directory", .0.display())]
    InvalidProjectRoot(PathBuf),
}

/// Unexpected failure inside a round; ends the run with `success = false`.
#[derive(Debug, Error)]
pub enum RoundError {
    /// The suite could not be run or timed out
    #[error("Test run {iteration} failed: {source}")]
    TestRun {
        /// Round whose test run failed
        iteration: u32,
        /// Runner failure
        #[source]
        source: RunnerError,
    },

    /// Something in the round panicked
    #[error("Round {iteration} panicked: {message}")]
    Panicked {
        /// Round that panicked
        iteration: u32,
        /// Panic message
        message: String,
    },
}

/// Render a caught panic payload as text.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
