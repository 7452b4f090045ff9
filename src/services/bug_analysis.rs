//! Bug analysis stage: failing cases in, confirmed code bugs out.

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::isolation::join_isolated;
use crate::domain::models::{BugAnalysis, BugReport, RunResult};
use crate::domain::ports::BugAnalyzer;

/// Turns a run's non-passing cases into bug reports, one concurrent
/// analysis per case.
pub struct BugAnalysisStage {
    analyzer: Arc<dyn BugAnalyzer>,
}

impl BugAnalysisStage {
    /// Stage backed by `analyzer`.
    pub fn new(analyzer: Arc<dyn BugAnalyzer>) -> Self {
        Self { analyzer }
    }

    /// Analyze every non-passing case in `run`.
    ///
    /// Returns only the cases the analyzer confirmed as code bugs. A failed
    /// analysis is logged and skipped. Result order carries no meaning.
    #[instrument(skip_all, fields(cases = run.test_cases.len()))]
    pub async fn analyze(&self, run: &RunResult) -> Vec<BugReport> {
        let failing: Vec<_> = run.failing_cases().collect();

        if failing.is_empty() {
            debug!("No failures to analyze");
            return Vec::new();
        }

        let started = Instant::now();
        let total = failing.len();

        let outcomes = join_isolated(failing.iter().enumerate().map(|(i, case)| {
            let analyzer = Arc::clone(&self.analyzer);
            async move {
                debug!(case = %case.name, progress = %format!("{}/{total}", i + 1), "Analyzing failure");
                analyzer.analyze(case).await.map(BugAnalysis::into_report)
            }
        }))
        .await;

        let mut bugs = Vec::new();
        for (case, outcome) in failing.iter().zip(outcomes) {
            match outcome {
                Ok(Some(report)) => {
                    info!(case = %case.name, bug = %report.title, "Bug detected");
                    bugs.push(report);
                }
                Ok(None) => debug!(case = %case.name, "Not a code bug"),
                Err(e) => warn!(case = %case.name, error = %e, "Bug analysis failed"),
            }
        }

        info!(
            analyzed = total,
            bugs = bugs.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "Bug analysis complete"
        );

        bugs
    }
}
