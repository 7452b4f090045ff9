//! LoopController - iterate run-tests / detect / fix / apply until converged
//!
//! Each round:
//! - runs the suite once, bounded by the configured test timeout
//! - turns failing cases into bug reports
//! - runs the fix pipeline over every bug and applies verified fixes
//!
//! The loop stops cleanly when the suite is clean, fixing is disabled, the
//! loop cap or token budget is hit, or a round applied nothing. Only setup
//! failures and unexpected round errors end a run with `success = false`.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use crate::adapters::frameworks::FrameworkRegistry;
use crate::domain::errors::{panic_message, InfrastructureError, RoundError, RunnerError};
use crate::domain::models::{
    BugSnapshot, HistoryEvent, LoopConfig, PipelineResult, ScratchConfig, StopReason,
    TestExecutionSnapshot,
};
use crate::domain::ports::{FixStagesFactory, RunHistory, TestRunner, UsageTracker};
use crate::services::{BugAnalysisStage, FixApplier, FixPipeline};

/// Drives repeated fix rounds for one project.
pub struct LoopController {
    project_root: PathBuf,
    config: LoopConfig,
    scratch: ScratchConfig,
    usage: Arc<dyn UsageTracker>,
    history: Option<Arc<dyn RunHistory>>,
}

impl LoopController {
    /// Controller for the project at `project_root`.
    ///
    /// `usage` is read between rounds to enforce the token budget.
    pub fn new(
        project_root: impl Into<PathBuf>,
        config: LoopConfig,
        scratch: ScratchConfig,
        usage: Arc<dyn UsageTracker>,
    ) -> Self {
        Self {
            project_root: project_root.into(),
            config,
            scratch,
            usage,
            history: None,
        }
    }

    /// Record every test run and discovered bug to `history`.
    #[must_use]
    pub fn with_history(mut self, history: Arc<dyn RunHistory>) -> Self {
        self.history = Some(history);
        self
    }

    /// Resolve the test runner from `registry` and run the loop.
    ///
    /// An explicit `framework` name wins; otherwise the first registered
    /// framework that detects the project is used.
    pub async fn run_with_registry(
        &self,
        registry: &FrameworkRegistry,
        framework: Option<&str>,
        analysis: &BugAnalysisStage,
        factory: &dyn FixStagesFactory,
    ) -> PipelineResult {
        match registry.resolve(framework, &self.project_root) {
            Ok(runner) => self.run(runner, analysis, factory).await,
            Err(e) => {
                error!(error = %e, "Cannot start fix loop");
                let mut result = PipelineResult::new();
                result.fail(e.to_string());
                result.finish();
                result
            }
        }
    }

    /// Run the loop to completion.
    ///
    /// Never returns an error: failures are recorded on the result, which is
    /// populated with whatever the completed rounds produced.
    #[instrument(skip_all, fields(project = %self.project_root.display(), runner = runner.name()))]
    pub async fn run(
        &self,
        runner: Arc<dyn TestRunner>,
        analysis: &BugAnalysisStage,
        factory: &dyn FixStagesFactory,
    ) -> PipelineResult {
        let mut result = PipelineResult::new();

        info!(
            run_id = %result.run_id,
            fix_enabled = self.config.fix_enabled,
            max_loops = self.config.effective_max_loops(),
            token_budget = self.config.token_budget,
            "Starting fix loop"
        );

        if let Err(e) = self.preflight(runner.as_ref()).await {
            error!(error = %e, "Preflight failed");
            result.fail(e.to_string());
            result.finish();
            return result;
        }

        let outcome = AssertUnwindSafe(self.run_rounds(&mut result, &runner, analysis, factory))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(reason)) => {
                info!(
                    reason = %reason,
                    iterations = result.iterations_run,
                    bugs = result.bugs_found.len(),
                    fixes_applied = result.fixes_applied.len(),
                    "Fix loop finished"
                );
                result.stop_reason = Some(reason);
            }
            Ok(Err(e)) => {
                error!(error = %e, "Fix loop aborted");
                result.fail(e.to_string());
            }
            Err(payload) => {
                let e = RoundError::Panicked {
                    iteration: result.iterations_run,
                    message: panic_message(payload.as_ref()),
                };
                error!(error = %e, "Fix loop aborted");
                result.fail(e.to_string());
            }
        }

        result.finish();
        result
    }

    async fn preflight(&self, runner: &dyn TestRunner) -> Result<(), InfrastructureError> {
        if !self.project_root.is_dir() {
            return Err(InfrastructureError::InvalidProjectRoot(
                self.project_root.clone(),
            ));
        }

        runner
            .check_prerequisites(&self.project_root)
            .await
            .map_err(|reason| InfrastructureError::Prerequisites {
                runner: runner.name().to_string(),
                reason,
            })
    }

    async fn run_rounds(
        &self,
        result: &mut PipelineResult,
        runner: &Arc<dyn TestRunner>,
        analysis: &BugAnalysisStage,
        factory: &dyn FixStagesFactory,
    ) -> Result<StopReason, RoundError> {
        let mut iteration = 0_u32;

        loop {
            iteration += 1;

            if iteration > 1 {
                if self.config.effective_max_loops() == 1 {
                    return Ok(StopReason::LoopCapReached);
                }
                if self.budget_exceeded() {
                    return Ok(StopReason::BudgetExhausted);
                }
                if self.config.cap_reached(iteration) {
                    return Ok(StopReason::LoopCapReached);
                }
            }

            self.test_and_detect(iteration, result, runner.as_ref(), analysis)
                .await?;

            if result.bugs_found.is_empty() {
                return Ok(StopReason::Converged);
            }
            if !self.config.fix_enabled {
                return Ok(StopReason::FixingDisabled);
            }
            if iteration == 1 && self.budget_exceeded() {
                return Ok(StopReason::BudgetExhausted);
            }

            if self.fix_round(result, runner, factory).await == 0 {
                warn!(iteration, "Fix round applied nothing");
                return Ok(StopReason::NoProgress);
            }
        }
    }

    /// One test run plus bug detection; replaces the latest-round metrics.
    async fn test_and_detect(
        &self,
        iteration: u32,
        result: &mut PipelineResult,
        runner: &dyn TestRunner,
        analysis: &BugAnalysisStage,
    ) -> Result<(), RoundError> {
        result.iterations_run = iteration;
        info!(iteration, "Running tests");

        let limit = self.config.test_timeout();
        let run = tokio::time::timeout(limit, runner.run(&self.project_root, limit))
            .await
            .unwrap_or(Err(RunnerError::Timeout(limit)))
            .map_err(|source| RoundError::TestRun { iteration, source })?;

        info!(
            iteration,
            total = run.total(),
            passed = run.passed,
            failed = run.failed,
            errors = run.errors,
            "Tests complete"
        );
        result.record_run(&run);
        self.record_history(HistoryEvent::TestExecution(TestExecutionSnapshot::from_run(
            result.run_id,
            iteration,
            &run,
        )))
        .await;

        let bugs = analysis.analyze(&run).await;
        for bug in &bugs {
            self.record_history(HistoryEvent::BugDiscovered(BugSnapshot::discovered(
                result.run_id,
                iteration,
                bug,
            )))
            .await;
        }
        result.record_bugs(bugs);
        Ok(())
    }

    async fn record_history(&self, event: HistoryEvent) {
        if let Some(history) = &self.history {
            history.record(event).await;
        }
    }

    /// Fix and apply every bug of the latest round; returns the applied count.
    async fn fix_round(
        &self,
        result: &mut PipelineResult,
        runner: &Arc<dyn TestRunner>,
        factory: &dyn FixStagesFactory,
    ) -> usize {
        let stages = factory.create(&self.project_root);
        let pipeline = FixPipeline::new(
            self.project_root.clone(),
            self.scratch.clone(),
            stages,
            Arc::clone(runner),
        );

        let generated = pipeline.run(&result.bugs_found).await;
        let applied = FixApplier::new(&self.project_root).apply(&generated).await;
        let count = applied.len();

        result.record_fixes(generated, applied);
        count
    }

    fn budget_exceeded(&self) -> bool {
        let used = self.usage.total_tokens();
        let exceeded = self.config.budget_exceeded(used);
        if exceeded {
            info!(used, budget = self.config.token_budget, "Token budget exhausted");
        }
        exceeded
    }
}
