//! Test runner port - interface for test-framework capabilities.

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

use crate::domain::errors::RunnerError;
use crate::domain::models::RunResult;

/// A named test-framework capability.
///
/// Implementations are registered in a static registry and resolved by name
/// or by [`detect`](Self::detect); the loop never dispatches on concrete type.
/// The same handle is passed to verifiers that need to execute tests.
#[async_trait]
pub trait TestRunner: Send + Sync {
    /// Framework identifier (e.g. `"command"`).
    fn name(&self) -> &str;

    /// Whether this framework is usable for the project at `project_root`.
    fn detect(&self, project_root: &Path) -> bool;

    /// Check tools and configuration needed before the first run.
    ///
    /// An `Err` carries a human-readable reason and aborts the whole loop
    /// before any round starts.
    async fn check_prerequisites(&self, _project_root: &Path) -> Result<(), String> {
        Ok(())
    }

    /// Execute the suite once.
    ///
    /// Implementations should stop the run once `timeout` elapses; the loop
    /// enforces the same limit around the call.
    async fn run(&self, project_root: &Path, timeout: Duration) -> Result<RunResult, RunnerError>;
}
