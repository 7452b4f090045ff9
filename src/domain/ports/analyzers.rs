//! Analyzer ports - the collaborators behind bug analysis and the fix stages.
//!
//! Every method returns `Err(StageError)` for a failure status; the caller
//! abandons only the unit of work it was processing. Implementations are
//! shared across concurrent pipelines, so they must not keep per-call
//! mutable state.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use super::test_runner::TestRunner;
use crate::domain::errors::StageError;
use crate::domain::models::{
    BugAnalysis, BugReport, CaseResult, FixVerificationOutcome, GeneratedFix, RootCause,
    VerificationResult,
};

/// Decides whether a failing case is a genuine code bug.
#[async_trait]
pub trait BugAnalyzer: Send + Sync {
    /// Classify one failing case.
    async fn analyze(&self, case: &CaseResult) -> Result<BugAnalysis, StageError>;
}

/// Stage S0: reproduce the bug against the current source.
#[async_trait]
pub trait BugVerifier: Send + Sync {
    /// Try to reproduce `bug`; may run tests through `runner`.
    async fn verify(
        &self,
        bug: &BugReport,
        source_code: &str,
        runner: Arc<dyn TestRunner>,
    ) -> Result<VerificationResult, StageError>;
}

/// Stage S1: explain why the bug happens.
#[async_trait]
pub trait RootCauseAnalyzer: Send + Sync {
    /// Root cause of a reproduced bug.
    async fn diagnose(
        &self,
        bug: &BugReport,
        source_code: &str,
        reproduction_test: &str,
    ) -> Result<RootCause, StageError>;
}

/// Stage S2: produce a candidate replacement for the source file.
#[async_trait]
pub trait FixGenerator: Send + Sync {
    /// Full replacement source for the file.
    async fn generate(
        &self,
        bug: &BugReport,
        source_code: &str,
        root_cause: &RootCause,
        reproduction_test: &str,
    ) -> Result<GeneratedFix, StageError>;
}

/// Stage S3: check the candidate fixes the bug without regressions.
///
/// Must not modify the real source file.
#[async_trait]
pub trait FixVerifier: Send + Sync {
    /// Check `fix` against the reproduction test in a scratch copy.
    async fn verify(
        &self,
        fix: &GeneratedFix,
        original_code: &str,
        reproduction_test_file: &Path,
        runner: Arc<dyn TestRunner>,
    ) -> Result<FixVerificationOutcome, StageError>;
}

/// The four fix-stage handlers for one round
#[derive(Clone)]
pub struct FixStages {
    /// Stage S0
    pub verifier: Arc<dyn BugVerifier>,
    /// Stage S1
    pub root_cause: Arc<dyn RootCauseAnalyzer>,
    /// Stage S2
    pub generator: Arc<dyn FixGenerator>,
    /// Stage S3
    pub fix_verifier: Arc<dyn FixVerifier>,
}

/// Builds the stage handlers; called once per fix round.
pub trait FixStagesFactory: Send + Sync {
    /// Handlers working against `project_root`.
    fn create(&self, project_root: &Path) -> FixStages;
}
