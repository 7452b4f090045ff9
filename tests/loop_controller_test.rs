//! Integration tests for LoopController stop conditions and failure handling.

mod common;

use common::*;
use std::sync::Arc;

use fixloop::adapters::FrameworkRegistry;
use fixloop::application::LoopController;
use fixloop::domain::models::{BugType, HistoryEvent, LoopConfig, ScratchConfig, StopReason};
use fixloop::domain::ports::{TestRunner, UsageTracker};
use fixloop::infrastructure::history::JsonlHistory;
use fixloop::services::BugAnalysisStage;

const BUGGY_SOURCE: &str = "def ratio(a, b):\n    return a / b\n";

fn policy(fix_enabled: bool, max_fix_loops: u32) -> LoopConfig {
    LoopConfig {
        fix_enabled,
        max_fix_loops,
        ..LoopConfig::default()
    }
}

fn controller(project: &TempProject, config: LoopConfig, usage: Arc<dyn UsageTracker>) -> LoopController {
    LoopController::new(project.root(), config, ScratchConfig::default(), usage)
}

fn analysis() -> BugAnalysisStage {
    BugAnalysisStage::new(Arc::new(StubAnalyzer::every_failure_is_a_bug()))
}

fn buggy_project() -> TempProject {
    let project = TempProject::new();
    project.write("src/calc.py", BUGGY_SOURCE);
    project
}

fn calc_failure() -> fixloop::RunResult {
    failing_run(vec![failing_case("test_ratio", "src/calc.py", "ZeroDivisionError")])
}

#[tokio::test]
async fn test_converges_after_one_fix() {
    setup_test_logging();
    let project = buggy_project();
    let runner = Arc::new(ScriptedRunner::sequence(vec![calc_failure(), passing_run()]));
    let factory = StubFactory::new(StubStages::always_fixing().with_fixed_code("fixed ratio\n"));

    let result = controller(&project, policy(true, 5), FixedUsage::spent(0))
        .run(runner.clone(), &analysis(), &factory)
        .await;

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.iterations_run, 2);
    assert_eq!(runner.run_count(), 2);
    assert!(result.bugs_found.is_empty());
    assert_eq!(result.fixes_applied, vec![project.root().join("src/calc.py")]);
    assert_eq!(result.fixes_generated.len(), 1);
    assert_eq!(result.stop_reason, Some(StopReason::Converged));
    assert_eq!(result.tests_failed, 0);
    assert_eq!(project.read("src/calc.py"), "fixed ratio\n");
    assert!(result.finished_at.is_some());
}

#[tokio::test]
async fn test_each_round_is_recorded_in_history() {
    let project = buggy_project();
    let history_dir = project.root().join(".fixloop/history");
    let runner = Arc::new(ScriptedRunner::sequence(vec![calc_failure(), passing_run()]));
    let factory = StubFactory::new(StubStages::always_fixing());

    let result = controller(&project, policy(true, 5), FixedUsage::spent(0))
        .with_history(Arc::new(JsonlHistory::new(&history_dir)))
        .run(runner, &analysis(), &factory)
        .await;
    assert_eq!(result.stop_reason, Some(StopReason::Converged));

    let events = JsonlHistory::read_events(&history_dir).await.unwrap();
    assert_eq!(events.len(), 3, "events: {events:?}");
    assert!(events.iter().all(|e| e.run_id() == result.run_id));

    match &events[0] {
        HistoryEvent::TestExecution(run) => {
            assert_eq!(run.iteration, 1);
            assert_eq!(run.failed_tests, 1);
        }
        other => panic!("Expected first test run, got {other:?}"),
    }
    match &events[1] {
        HistoryEvent::BugDiscovered(bug) => {
            assert_eq!(bug.iteration, 1);
            assert_eq!(bug.file_path, "src/calc.py");
            assert_eq!(bug.bug_type, BugType::ArithmeticError);
        }
        other => panic!("Expected discovered bug, got {other:?}"),
    }
    match &events[2] {
        HistoryEvent::TestExecution(run) => {
            assert_eq!(run.iteration, 2);
            assert_eq!(run.failed_tests, 0);
        }
        other => panic!("Expected second test run, got {other:?}"),
    }
}

#[tokio::test]
async fn test_clean_suite_converges_immediately() {
    let project = buggy_project();
    let runner = Arc::new(ScriptedRunner::always(passing_run()));
    let factory = StubFactory::new(StubStages::always_fixing());

    let result = controller(&project, policy(true, 5), FixedUsage::spent(0))
        .run(runner, &analysis(), &factory)
        .await;

    assert_eq!(result.iterations_run, 1);
    assert_eq!(result.stop_reason, Some(StopReason::Converged));
    assert_eq!(result.tests_run, 2);
    assert_eq!(factory.create_count(), 0);
}

#[tokio::test]
async fn test_loop_cap_bounds_test_runs() {
    let project = buggy_project();
    let runner = Arc::new(ScriptedRunner::always(calc_failure()));
    let factory = StubFactory::new(StubStages::always_fixing());

    let result = controller(&project, policy(true, 3), FixedUsage::spent(0))
        .run(runner.clone(), &analysis(), &factory)
        .await;

    assert!(result.success);
    assert_eq!(result.iterations_run, 3);
    assert_eq!(runner.run_count(), 3);
    assert!(!result.bugs_found.is_empty());
    assert_eq!(result.stop_reason, Some(StopReason::LoopCapReached));
    // fixes accumulate across rounds, bugs_found does not
    assert_eq!(result.fixes_applied.len(), 3);
    assert_eq!(result.bugs_found.len(), 1);
    assert_eq!(factory.create_count(), 3);
}

#[tokio::test]
async fn test_constrained_mode_overrides_cap() {
    let project = buggy_project();
    let runner = Arc::new(ScriptedRunner::always(calc_failure()));
    let factory = StubFactory::new(StubStages::always_fixing());
    let config = LoopConfig {
        constrained_mode: true,
        ..policy(true, 10)
    };

    let result = controller(&project, config, FixedUsage::spent(0))
        .run(runner.clone(), &analysis(), &factory)
        .await;

    assert_eq!(result.iterations_run, 1);
    assert_eq!(runner.run_count(), 1);
    assert_eq!(result.fixes_applied.len(), 1);
    assert_eq!(result.stop_reason, Some(StopReason::LoopCapReached));
}

#[tokio::test]
async fn test_budget_spent_before_start_skips_fixing() {
    let project = buggy_project();
    let runner = Arc::new(ScriptedRunner::always(calc_failure()));
    let factory = StubFactory::new(StubStages::always_fixing());
    let config = LoopConfig {
        token_budget: 500,
        ..policy(true, 5)
    };

    let result = controller(&project, config, FixedUsage::spent(500))
        .run(runner.clone(), &analysis(), &factory)
        .await;

    assert!(result.success);
    assert_eq!(result.iterations_run, 1);
    assert_eq!(result.stop_reason, Some(StopReason::BudgetExhausted));
    assert_eq!(factory.create_count(), 0);
    assert_eq!(factory.stages.counts(), [0, 0, 0, 0]);
    assert_eq!(result.bugs_found.len(), 1);
    assert_eq!(project.read("src/calc.py"), BUGGY_SOURCE);
}

#[tokio::test]
async fn test_budget_spent_during_round_stops_next_round() {
    let project = buggy_project();
    let runner = Arc::new(ScriptedRunner::always(calc_failure()));
    let factory = StubFactory::new(StubStages::always_fixing());
    let config = LoopConfig {
        token_budget: 100,
        ..policy(true, 0)
    };
    // Under budget when round 1 starts fixing, over it by the next round
    let usage = SequencedUsage::new(vec![0, 250]);

    let result = controller(&project, config, usage)
        .run(runner.clone(), &analysis(), &factory)
        .await;

    assert!(result.success);
    assert_eq!(result.iterations_run, 1);
    assert_eq!(runner.run_count(), 1);
    assert_eq!(result.fixes_applied.len(), 1);
    assert_eq!(result.stop_reason, Some(StopReason::BudgetExhausted));
}

#[tokio::test]
async fn test_no_progress_stops_after_first_empty_round() {
    let project = buggy_project();
    let runner = Arc::new(ScriptedRunner::always(calc_failure()));
    let factory = StubFactory::new(StubStages::always_fixing().with_rejected_fixes());

    let result = controller(&project, policy(true, 5), FixedUsage::spent(0))
        .run(runner.clone(), &analysis(), &factory)
        .await;

    assert!(result.success);
    assert_eq!(result.iterations_run, 1);
    assert_eq!(result.stop_reason, Some(StopReason::NoProgress));
    assert!(result.fixes_generated.is_empty());
    assert!(result.fixes_applied.is_empty());
    assert_eq!(factory.stages.counts(), [1, 1, 1, 1]);
    assert_eq!(project.read("src/calc.py"), BUGGY_SOURCE);
}

#[tokio::test]
async fn test_fix_disabled_leaves_filesystem_untouched() {
    let project = buggy_project();
    let runner = Arc::new(ScriptedRunner::always(calc_failure()));
    let factory = StubFactory::new(StubStages::always_fixing());

    let result = controller(&project, policy(false, 1), FixedUsage::spent(0))
        .run(runner.clone(), &analysis(), &factory)
        .await;

    assert!(result.success);
    assert_eq!(result.iterations_run, 1);
    assert_eq!(result.stop_reason, Some(StopReason::FixingDisabled));
    assert_eq!(result.bugs_found.len(), 1);
    assert!(result.fixes_applied.is_empty());
    assert_eq!(factory.create_count(), 0);
    assert_eq!(project.read("src/calc.py"), BUGGY_SOURCE);
    assert!(!project.root().join(".fixloop").exists());
}

#[tokio::test]
async fn test_missing_prerequisites_abort_before_any_round() {
    let project = buggy_project();
    let runner = Arc::new(
        ScriptedRunner::always(calc_failure()).with_missing_prerequisites("pytest not installed"),
    );
    let factory = StubFactory::new(StubStages::always_fixing());

    let result = controller(&project, policy(true, 5), FixedUsage::spent(0))
        .run(runner.clone(), &analysis(), &factory)
        .await;

    assert!(!result.success);
    assert_eq!(result.iterations_run, 0);
    assert_eq!(runner.run_count(), 0);
    assert!(result.stop_reason.is_none());
    assert!(result.errors[0].contains("pytest not installed"));
}

#[tokio::test]
async fn test_missing_project_root_is_infrastructure_failure() {
    let project = TempProject::new();
    let missing = project.root().join("does-not-exist");
    let runner = Arc::new(ScriptedRunner::always(passing_run()));
    let factory = StubFactory::new(StubStages::always_fixing());

    let result = LoopController::new(&missing, policy(true, 1), ScratchConfig::default(), FixedUsage::spent(0))
        .run(runner.clone(), &analysis(), &factory)
        .await;

    assert!(!result.success);
    assert_eq!(runner.run_count(), 0);
    assert!(result.errors[0].contains("not a directory"));
}

#[tokio::test]
async fn test_no_registered_runner_is_infrastructure_failure() {
    let project = buggy_project();
    let factory = StubFactory::new(StubStages::always_fixing());

    let result = controller(&project, policy(true, 1), FixedUsage::spent(0))
        .run_with_registry(&FrameworkRegistry::new(), None, &analysis(), &factory)
        .await;

    assert!(!result.success);
    assert_eq!(result.iterations_run, 0);
    assert!(result.errors[0].contains("No test runner available"));

    let result = controller(&project, policy(true, 1), FixedUsage::spent(0))
        .run_with_registry(&FrameworkRegistry::new(), Some("pytest"), &analysis(), &factory)
        .await;
    assert!(result.errors[0].contains("Unknown test framework: pytest"));
}

#[tokio::test]
async fn test_registry_resolution_runs_loop() {
    let project = buggy_project();
    let mut registry = FrameworkRegistry::new();
    registry.register(Arc::new(ScriptedRunner::always(passing_run())) as Arc<dyn TestRunner>);
    let factory = StubFactory::new(StubStages::always_fixing());

    let result = controller(&project, policy(true, 1), FixedUsage::spent(0))
        .run_with_registry(&registry, None, &analysis(), &factory)
        .await;

    assert!(result.success);
    assert_eq!(result.stop_reason, Some(StopReason::Converged));
}

#[tokio::test]
async fn test_runner_error_returns_partial_result() {
    let project = buggy_project();
    let runner = Arc::new(ScriptedRunner::then_error(calc_failure(), "report vanished"));
    let factory = StubFactory::new(StubStages::always_fixing());

    let result = controller(&project, policy(true, 5), FixedUsage::spent(0))
        .run(runner.clone(), &analysis(), &factory)
        .await;

    assert!(!result.success);
    assert_eq!(result.iterations_run, 2);
    assert!(result.stop_reason.is_none());
    // Round 1 work survives the failure
    assert_eq!(result.fixes_applied.len(), 1);
    assert_eq!(result.bugs_found.len(), 1);
    assert!(result.errors[0].contains("report vanished"));
}

#[tokio::test]
async fn test_runner_panic_is_caught() {
    let project = buggy_project();
    let runner = Arc::new(ScriptedRunner::panicking());
    let factory = StubFactory::new(StubStages::always_fixing());

    let result = controller(&project, policy(true, 5), FixedUsage::spent(0))
        .run(runner, &analysis(), &factory)
        .await;

    assert!(!result.success);
    assert_eq!(result.iterations_run, 1);
    assert!(result.errors[0].contains("runner blew up"));
}

#[tokio::test]
async fn test_hanging_test_run_times_out() {
    let project = buggy_project();
    let runner = Arc::new(ScriptedRunner::hanging());
    let factory = StubFactory::new(StubStages::always_fixing());
    let config = LoopConfig {
        test_timeout_secs: 1,
        ..policy(true, 5)
    };

    let result = controller(&project, config, FixedUsage::spent(0))
        .run(runner, &analysis(), &factory)
        .await;

    assert!(!result.success);
    assert!(result.errors[0].contains("timeout"));
}
