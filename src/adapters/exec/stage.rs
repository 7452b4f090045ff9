//! External-command stage handler.
//!
//! Each call spawns the configured command in the project root, writes one
//! JSON request to its stdin and reads one JSON envelope from its stdout:
//!
//! ```json
//! {"status": "completed", "result": {...}, "errors": [], "tokens_used": 1200}
//! ```
//!
//! Reported token usage is added to the session counter whatever the status.
//! A configured timeout kills the command and fails the call.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::domain::errors::StageError;
use crate::domain::models::{
    BugAnalysis, BugReport, CaseResult, FixVerificationOutcome, GeneratedFix, RootCause,
    VerificationResult,
};
use crate::domain::ports::{
    BugAnalyzer, BugVerifier, FixGenerator, FixVerifier, RootCauseAnalyzer, TestRunner,
};
use crate::services::SessionUsage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum EnvelopeStatus {
    Completed,
    Failed,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    status: EnvelopeStatus,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    errors: Vec<String>,
    #[serde(default)]
    tokens_used: u64,
}

/// One configured stage command.
///
/// Stateless between calls, so a single instance can serve every concurrent
/// pipeline of a round.
#[derive(Debug, Clone)]
pub struct ExecStage {
    stage: &'static str,
    command: Vec<String>,
    project_root: PathBuf,
    usage: Arc<SessionUsage>,
    timeout: Option<Duration>,
}

impl ExecStage {
    /// Handler for `stage`, run in `project_root`. Tokens it reports go to `usage`.
    pub fn new(
        stage: &'static str,
        command: Vec<String>,
        project_root: impl Into<PathBuf>,
        usage: Arc<SessionUsage>,
    ) -> Self {
        Self {
            stage,
            command,
            project_root: project_root.into(),
            usage,
            timeout: None,
        }
    }

    /// Stage name used in requests and errors.
    pub fn stage(&self) -> &'static str {
        self.stage
    }

    /// Bound every call by `timeout`; the child is killed when it expires.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send `inputs` to the command and decode its result as `T`.
    #[instrument(skip(self, inputs), fields(stage = self.stage))]
    async fn call<T: DeserializeOwned>(&self, inputs: Value) -> Result<T, StageError> {
        let Some(limit) = self.timeout else {
            return self.exchange(inputs).await;
        };

        tokio::time::timeout(limit, self.exchange(inputs))
            .await
            .map_err(|_| StageError::Timeout {
                stage: self.stage.to_string(),
                timeout: limit,
            })?
    }

    async fn exchange<T: DeserializeOwned>(&self, inputs: Value) -> Result<T, StageError> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| StageError::command(self.stage, "no command configured"))?;

        let mut request = json!({
            "stage": self.stage,
            "project_root": self.project_root,
        });
        if let (Some(request), Value::Object(inputs)) = (request.as_object_mut(), inputs) {
            request.extend(inputs);
        }
        let payload = serde_json::to_vec(&request).map_err(|source| StageError::Malformed {
            stage: self.stage.to_string(),
            source,
        })?;

        let mut child = Command::new(program)
            .args(args)
            .current_dir(&self.project_root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| StageError::command(self.stage, format!("failed to spawn `{program}`: {e}")))?;

        // Write the request while both output pipes drain, so neither side
        // blocks on a full pipe.
        let stdin = child.stdin.take();
        let write_request = async move {
            let Some(mut stdin) = stdin else {
                return Ok(());
            };
            match stdin.write_all(&payload).await {
                // The command may legitimately exit without reading its input.
                Err(e) if e.kind() != std::io::ErrorKind::BrokenPipe => Err(e),
                _ => Ok(()),
            }
        };

        let (written, stdout, stderr) = tokio::join!(
            write_request,
            drain(child.stdout.take()),
            drain(child.stderr.take())
        );

        let io_err = |source| StageError::Io {
            stage: self.stage.to_string(),
            source,
        };
        written.map_err(io_err)?;
        let stdout = stdout.map_err(io_err)?;
        let stderr = stderr.map_err(io_err)?;
        let status = child.wait().await.map_err(io_err)?;

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr);
            return Err(StageError::command(
                self.stage,
                format!("exited with {status}: {}", stderr.trim()),
            ));
        }

        let envelope: Envelope =
            serde_json::from_slice(&stdout).map_err(|source| StageError::Malformed {
                stage: self.stage.to_string(),
                source,
            })?;

        self.usage.record(envelope.tokens_used);
        debug!(status = ?envelope.status, tokens = envelope.tokens_used, "Stage replied");

        match envelope.status {
            EnvelopeStatus::Failed => Err(StageError::failed(self.stage, envelope.errors)),
            EnvelopeStatus::Completed => {
                let result = envelope.result.ok_or_else(|| StageError::MissingResult {
                    stage: self.stage.to_string(),
                })?;
                serde_json::from_value(result).map_err(|source| StageError::Malformed {
                    stage: self.stage.to_string(),
                    source,
                })
            }
        }
    }
}

async fn drain<R: AsyncRead + Unpin>(pipe: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

#[async_trait]
impl BugAnalyzer for ExecStage {
    async fn analyze(&self, case: &CaseResult) -> Result<BugAnalysis, StageError> {
        self.call(json!({ "case": case })).await
    }
}

#[async_trait]
impl BugVerifier for ExecStage {
    async fn verify(
        &self,
        bug: &BugReport,
        source_code: &str,
        runner: Arc<dyn TestRunner>,
    ) -> Result<VerificationResult, StageError> {
        self.call(json!({
            "bug": bug,
            "source_code": source_code,
            "runner": runner.name(),
        }))
        .await
    }
}

#[async_trait]
impl RootCauseAnalyzer for ExecStage {
    async fn diagnose(
        &self,
        bug: &BugReport,
        source_code: &str,
        reproduction_test: &str,
    ) -> Result<RootCause, StageError> {
        self.call(json!({
            "bug": bug,
            "source_code": source_code,
            "reproduction_test": reproduction_test,
        }))
        .await
    }
}

#[async_trait]
impl FixGenerator for ExecStage {
    async fn generate(
        &self,
        bug: &BugReport,
        source_code: &str,
        root_cause: &RootCause,
        reproduction_test: &str,
    ) -> Result<GeneratedFix, StageError> {
        self.call(json!({
            "bug": bug,
            "source_code": source_code,
            "root_cause": root_cause,
            "reproduction_test": reproduction_test,
        }))
        .await
    }
}

#[async_trait]
impl FixVerifier for ExecStage {
    async fn verify(
        &self,
        fix: &GeneratedFix,
        original_code: &str,
        reproduction_test_file: &Path,
        runner: Arc<dyn TestRunner>,
    ) -> Result<FixVerificationOutcome, StageError> {
        self.call(json!({
            "fix": fix,
            "original_code": original_code,
            "reproduction_test_file": reproduction_test_file,
            "runner": runner.name(),
        }))
        .await
    }
}
