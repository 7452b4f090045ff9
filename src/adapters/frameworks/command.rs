//! Generic command-backed test runner.
//!
//! Runs the configured command in the project root and reads the JSON run
//! report it leaves behind. A non-zero exit status only means tests failed;
//! the report is the source of truth.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::domain::errors::RunnerError;
use crate::domain::models::{RunResult, RunnerConfig};
use crate::domain::ports::TestRunner;

/// Registry name of [`CommandTestRunner`]
pub const COMMAND_RUNNER_NAME: &str = "command";

/// Runs a configured command and reads the JSON run report it leaves behind
#[derive(Debug, Clone)]
pub struct CommandTestRunner {
    command: Vec<String>,
    report_path: PathBuf,
}

impl CommandTestRunner {
    /// Runner for `command`; `report_path` is relative to the project root.
    pub fn new(command: Vec<String>, report_path: impl Into<PathBuf>) -> Self {
        Self {
            command,
            report_path: report_path.into(),
        }
    }

    /// Runner from the `runner` config section.
    pub fn from_config(config: &RunnerConfig) -> Self {
        Self::new(config.command.clone(), config.report_path.clone())
    }

    fn report_file(&self, project_root: &Path) -> PathBuf {
        project_root.join(&self.report_path)
    }
}

/// Locate `program` the way a shell would: paths are checked directly
/// (relative ones against `project_root`), bare names are searched on `PATH`.
pub fn resolve_program(program: &str, project_root: &Path) -> Option<PathBuf> {
    let candidate = Path::new(program);

    if candidate.components().count() > 1 || candidate.is_absolute() {
        let resolved = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            project_root.join(candidate)
        };
        return resolved.is_file().then_some(resolved);
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|p| p.is_file())
}

#[async_trait]
impl TestRunner for CommandTestRunner {
    fn name(&self) -> &str {
        COMMAND_RUNNER_NAME
    }

    fn detect(&self, _project_root: &Path) -> bool {
        !self.command.is_empty()
    }

    async fn check_prerequisites(&self, project_root: &Path) -> Result<(), String> {
        let Some(program) = self.command.first() else {
            return Err("no test command configured (runner.command)".to_string());
        };

        match resolve_program(program, project_root) {
            Some(path) => {
                debug!(program = %path.display(), "Test command resolved");
                Ok(())
            }
            None => Err(format!("test command `{program}` not found")),
        }
    }

    #[instrument(skip(self), fields(command = ?self.command))]
    async fn run(&self, project_root: &Path, timeout: Duration) -> Result<RunResult, RunnerError> {
        let (program, args) = self.command.split_first().ok_or(RunnerError::EmptyCommand)?;
        let report = self.report_file(project_root);

        // A report left over from an earlier run must never be mistaken for this one.
        if let Err(e) = fs::remove_file(&report).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(report = %report.display(), error = %e, "Could not clear previous run report");
            }
        }

        let started = Instant::now();
        let mut cmd = Command::new(program);
        cmd.args(args)
            .current_dir(project_root)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(timeout, cmd.output())
            .await
            .map_err(|_| RunnerError::Timeout(timeout))?
            .map_err(|source| RunnerError::Launch {
                program: program.clone(),
                source,
            })?;

        debug!(
            status = ?output.status.code(),
            elapsed_ms = started.elapsed().as_millis(),
            "Test command exited"
        );
        if !output.stderr.is_empty() {
            debug!(stderr = %String::from_utf8_lossy(&output.stderr), "Test command stderr");
        }

        let raw = fs::read_to_string(&report)
            .await
            .map_err(|source| RunnerError::ReportMissing {
                path: report.clone(),
                source,
            })?;

        serde_json::from_str(&raw).map_err(|source| RunnerError::ReportInvalid {
            path: report,
            source,
        })
    }
}
