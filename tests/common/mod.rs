//! Common test utilities for integration tests
//!
//! Stub runners, analyzers and fix stages with call counters, plus a
//! throwaway project directory.

#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Barrier;

use fixloop::domain::errors::{RunnerError, StageError};
use fixloop::domain::models::{
    BugAnalysis, BugLocation, BugReport, BugSeverity, BugType, CaseResult, CaseStatus,
    FixVerificationOutcome, GeneratedFix, RootCause, RunResult, VerificationResult,
};
use fixloop::domain::ports::{
    BugAnalyzer, BugVerifier, FixGenerator, FixStages, FixStagesFactory, FixVerifier,
    RootCauseAnalyzer, TestRunner, UsageTracker,
};

/// Setup test logging
///
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

// ========================
// Project fixture
// ========================

pub struct TempProject {
    dir: TempDir,
}

impl TempProject {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create temp dir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.root().join(rel)).unwrap()
    }
}

// ========================
// Builders
// ========================

pub fn failing_case(name: &str, file: &str, message: &str) -> CaseResult {
    CaseResult::new(name, CaseStatus::Failed)
        .with_file(file)
        .with_failure(message)
}

pub fn failing_run(cases: Vec<CaseResult>) -> RunResult {
    let mut all = vec![CaseResult::new("test_ok", CaseStatus::Passed)];
    all.extend(cases);
    RunResult::from_cases(all)
}

pub fn passing_run() -> RunResult {
    RunResult::from_cases(vec![
        CaseResult::new("test_ok", CaseStatus::Passed),
        CaseResult::new("test_also_ok", CaseStatus::Passed),
    ])
}

pub fn bug_in(file: &str, title: &str) -> BugReport {
    BugReport::new(
        BugType::ArithmeticError,
        BugSeverity::High,
        title,
        BugLocation::file(file),
    )
}

// ========================
// Test runner
// ========================

enum Step {
    Run(RunResult),
    Fail(String),
    Hang,
    Panic,
}

/// Replays a script of run outcomes; the last step repeats forever.
pub struct ScriptedRunner {
    steps: Vec<Step>,
    prerequisites: Result<(), String>,
    runs: AtomicUsize,
}

impl ScriptedRunner {
    fn from_steps(steps: Vec<Step>) -> Self {
        Self {
            steps,
            prerequisites: Ok(()),
            runs: AtomicUsize::new(0),
        }
    }

    pub fn sequence(runs: Vec<RunResult>) -> Self {
        Self::from_steps(runs.into_iter().map(Step::Run).collect())
    }

    pub fn always(run: RunResult) -> Self {
        Self::sequence(vec![run])
    }

    /// `first`, then a runner error on every later run
    pub fn then_error(first: RunResult, message: &str) -> Self {
        Self::from_steps(vec![Step::Run(first), Step::Fail(message.to_string())])
    }

    pub fn hanging() -> Self {
        Self::from_steps(vec![Step::Hang])
    }

    pub fn panicking() -> Self {
        Self::from_steps(vec![Step::Panic])
    }

    #[must_use]
    pub fn with_missing_prerequisites(mut self, reason: &str) -> Self {
        self.prerequisites = Err(reason.to_string());
        self
    }

    pub fn run_count(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TestRunner for ScriptedRunner {
    fn name(&self) -> &str {
        "scripted"
    }

    fn detect(&self, _project_root: &Path) -> bool {
        true
    }

    async fn check_prerequisites(&self, _project_root: &Path) -> Result<(), String> {
        self.prerequisites.clone()
    }

    async fn run(&self, _project_root: &Path, _timeout: Duration) -> Result<RunResult, RunnerError> {
        let n = self.runs.fetch_add(1, Ordering::SeqCst);
        let step = &self.steps[n.min(self.steps.len() - 1)];

        match step {
            Step::Run(run) => Ok(run.clone()),
            Step::Fail(message) => Err(RunnerError::Other(message.clone())),
            Step::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(RunResult::default())
            }
            Step::Panic => panic!("runner blew up"),
        }
    }
}

// ========================
// Bug analyzer
// ========================

type AnalyzeFn = dyn Fn(&CaseResult) -> Result<BugAnalysis, StageError> + Send + Sync;

pub struct StubAnalyzer {
    decide: Box<AnalyzeFn>,
    calls: AtomicUsize,
    gate: Option<Barrier>,
}

impl StubAnalyzer {
    pub fn new(
        decide: impl Fn(&CaseResult) -> Result<BugAnalysis, StageError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            decide: Box::new(decide),
            calls: AtomicUsize::new(0),
            gate: None,
        }
    }

    /// Every call waits until `parties` calls are in flight at once.
    #[must_use]
    pub fn gated(mut self, parties: usize) -> Self {
        self.gate = Some(Barrier::new(parties));
        self
    }

    /// Every failing case is a code bug located in the case's file.
    pub fn every_failure_is_a_bug() -> Self {
        Self::new(|case| {
            Ok(BugAnalysis::code_bug(
                bug_in(&case.file_path, &case.name).with_error_message(&case.failure_message),
            ))
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BugAnalyzer for StubAnalyzer {
    async fn analyze(&self, case: &CaseResult) -> Result<BugAnalysis, StageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.wait().await;
        }
        (self.decide)(case)
    }
}

// ========================
// Fix stages
// ========================

type ConfirmFn = dyn Fn(&BugReport) -> Result<bool, StageError> + Send + Sync;

/// All four fix stages in one stub, with per-stage call counters.
pub struct StubStages {
    confirm: Box<ConfirmFn>,
    fix_passes: bool,
    fixed_code: String,
    pub verify_calls: AtomicUsize,
    pub diagnose_calls: AtomicUsize,
    pub generate_calls: AtomicUsize,
    pub fix_verify_calls: AtomicUsize,
    /// Reproduction files handed to the fix verifier, with their content
    pub repro_files: Mutex<Vec<(PathBuf, String)>>,
    gate: Option<Barrier>,
}

impl StubStages {
    pub fn new(confirm: impl Fn(&BugReport) -> Result<bool, StageError> + Send + Sync + 'static) -> Self {
        Self {
            confirm: Box::new(confirm),
            fix_passes: true,
            fixed_code: "fixed\n".to_string(),
            verify_calls: AtomicUsize::new(0),
            diagnose_calls: AtomicUsize::new(0),
            generate_calls: AtomicUsize::new(0),
            fix_verify_calls: AtomicUsize::new(0),
            repro_files: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Confirms every bug and verifies every fix.
    pub fn always_fixing() -> Self {
        Self::new(|_| Ok(true))
    }

    /// Bug verification waits until `parties` bugs are being verified at once.
    #[must_use]
    pub fn gated(mut self, parties: usize) -> Self {
        self.gate = Some(Barrier::new(parties));
        self
    }

    #[must_use]
    pub fn with_rejected_fixes(mut self) -> Self {
        self.fix_passes = false;
        self
    }

    #[must_use]
    pub fn with_fixed_code(mut self, code: &str) -> Self {
        self.fixed_code = code.to_string();
        self
    }

    pub fn counts(&self) -> [usize; 4] {
        [
            self.verify_calls.load(Ordering::SeqCst),
            self.diagnose_calls.load(Ordering::SeqCst),
            self.generate_calls.load(Ordering::SeqCst),
            self.fix_verify_calls.load(Ordering::SeqCst),
        ]
    }

    pub fn as_fix_stages(self: &Arc<Self>) -> FixStages {
        FixStages {
            verifier: Arc::clone(self) as Arc<dyn BugVerifier>,
            root_cause: Arc::clone(self) as Arc<dyn RootCauseAnalyzer>,
            generator: Arc::clone(self) as Arc<dyn FixGenerator>,
            fix_verifier: Arc::clone(self) as Arc<dyn FixVerifier>,
        }
    }
}

#[async_trait]
impl BugVerifier for StubStages {
    async fn verify(
        &self,
        bug: &BugReport,
        _source_code: &str,
        _runner: Arc<dyn TestRunner>,
    ) -> Result<VerificationResult, StageError> {
        self.verify_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.wait().await;
        }
        let is_confirmed = (self.confirm)(bug)?;
        Ok(VerificationResult {
            is_confirmed,
            reproduction_test: format!("def test_repro():\n    # {}\n", bug.title),
            test_output: String::new(),
            confidence: 0.9,
        })
    }
}

#[async_trait]
impl RootCauseAnalyzer for StubStages {
    async fn diagnose(
        &self,
        _bug: &BugReport,
        _source_code: &str,
        _reproduction_test: &str,
    ) -> Result<RootCause, StageError> {
        self.diagnose_calls.fetch_add(1, Ordering::SeqCst);
        Ok(RootCause {
            category: "missing_guard".to_string(),
            description: "divisor is never checked".to_string(),
            affected_code: String::new(),
        })
    }
}

#[async_trait]
impl FixGenerator for StubStages {
    async fn generate(
        &self,
        _bug: &BugReport,
        _source_code: &str,
        _root_cause: &RootCause,
        _reproduction_test: &str,
    ) -> Result<GeneratedFix, StageError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        Ok(GeneratedFix {
            fixed_code: self.fixed_code.clone(),
            patch: String::new(),
            explanation: "guard the divisor".to_string(),
            changed_lines: vec![2],
            safety_notes: vec![],
        })
    }
}

#[async_trait]
impl FixVerifier for StubStages {
    async fn verify(
        &self,
        _fix: &GeneratedFix,
        _original_code: &str,
        reproduction_test_file: &Path,
        _runner: Arc<dyn TestRunner>,
    ) -> Result<FixVerificationOutcome, StageError> {
        self.fix_verify_calls.fetch_add(1, Ordering::SeqCst);
        let content = std::fs::read_to_string(reproduction_test_file).unwrap_or_default();
        self.repro_files
            .lock()
            .unwrap()
            .push((reproduction_test_file.to_path_buf(), content));

        Ok(FixVerificationOutcome {
            is_verified: self.fix_passes,
            notes: String::new(),
        })
    }
}

/// Hands out the same stub stages every round and counts rounds.
pub struct StubFactory {
    pub stages: Arc<StubStages>,
    creates: AtomicUsize,
}

impl StubFactory {
    pub fn new(stages: StubStages) -> Self {
        Self {
            stages: Arc::new(stages),
            creates: AtomicUsize::new(0),
        }
    }

    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }
}

impl FixStagesFactory for StubFactory {
    fn create(&self, _project_root: &Path) -> FixStages {
        self.creates.fetch_add(1, Ordering::SeqCst);
        self.stages.as_fix_stages()
    }
}

// ========================
// Usage
// ========================

/// Usage counter the test controls directly
#[derive(Default)]
pub struct FixedUsage(pub AtomicU64);

impl FixedUsage {
    pub fn spent(tokens: u64) -> Arc<Self> {
        Arc::new(Self(AtomicU64::new(tokens)))
    }
}

impl UsageTracker for FixedUsage {
    fn total_tokens(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Reports each value in turn on successive reads; the last one repeats.
pub struct SequencedUsage {
    values: Vec<u64>,
    reads: AtomicUsize,
}

impl SequencedUsage {
    pub fn new(values: Vec<u64>) -> Arc<Self> {
        Arc::new(Self {
            values,
            reads: AtomicUsize::new(0),
        })
    }
}

impl UsageTracker for SequencedUsage {
    fn total_tokens(&self) -> u64 {
        let n = self.reads.fetch_add(1, Ordering::SeqCst);
        self.values[n.min(self.values.len() - 1)]
    }
}
