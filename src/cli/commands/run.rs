//! Implementation of the `fixloop run` command.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use super::{load_config, resolve_project_root};
use crate::adapters::{ExecStagesFactory, FrameworkRegistry};
use crate::application::LoopController;
use crate::cli::output::table::TableFormatter;
use crate::cli::output::{output, CommandOutput};
use crate::cli::types::GlobalOptions;
use crate::domain::models::{Config, PipelineResult};
use crate::domain::ports::UsageTracker;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::history::JsonlHistory;
use crate::infrastructure::logging::{LogSettings, LoggerImpl};
use crate::services::{BugAnalysisStage, SessionUsage};

/// Arguments to `fixloop run`
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Project directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Generate and apply fixes
    #[arg(long, conflicts_with = "no_fix")]
    pub fix: bool,

    /// Only detect bugs; never touch source files
    #[arg(long)]
    pub no_fix: bool,

    /// Maximum fix rounds (0 = unlimited)
    #[arg(long)]
    pub max_loops: Option<u32>,

    /// Stop starting fix rounds once this many tokens are spent (0 = unlimited)
    #[arg(long)]
    pub token_budget: Option<u64>,

    /// Constrained CI policy: a single pass regardless of --max-loops
    #[arg(long)]
    pub ci: bool,

    /// Test framework to use instead of detection
    #[arg(long)]
    pub framework: Option<String>,

    /// Per test-run timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Do not record this run in the run history
    #[arg(long)]
    pub no_history: bool,
}

impl RunArgs {
    /// `Some` when `--fix` or `--no-fix` was given.
    pub fn fix_override(&self) -> Option<bool> {
        if self.fix {
            Some(true)
        } else if self.no_fix {
            Some(false)
        } else {
            None
        }
    }

    /// Layer command-line flags over the loaded configuration.
    pub fn apply(&self, config: &mut Config, ci_env: bool) {
        let policy = &mut config.loop_policy;
        if let Some(fix) = self.fix_override() {
            policy.fix_enabled = fix;
        }
        if let Some(max_loops) = self.max_loops {
            policy.max_fix_loops = max_loops;
        }
        if let Some(budget) = self.token_budget {
            policy.token_budget = budget;
        }
        if let Some(timeout) = self.timeout {
            policy.test_timeout_secs = timeout;
        }
        if self.ci || ci_env {
            policy.constrained_mode = true;
        }
        if let Some(framework) = &self.framework {
            config.runner.framework = Some(framework.clone());
        }
        if self.no_history {
            config.history.enabled = false;
        }
    }
}

/// Whether the `CI` environment variable asks for constrained mode.
pub fn ci_from_env() -> bool {
    std::env::var("CI").is_ok_and(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
}

/// Result of `fixloop run` plus the session's token spend
#[derive(Debug, Serialize)]
pub struct RunOutput {
    /// Final loop result
    #[serde(flatten)]
    pub result: PipelineResult,
    /// Tokens reported by every stage call
    pub tokens_used: u64,
}

impl CommandOutput for RunOutput {
    fn to_human(&self) -> String {
        let formatter = TableFormatter::new();
        let mut sections = vec![formatter.format_summary(&self.result, self.tokens_used)];

        if !self.result.bugs_found.is_empty() {
            sections.push(format!(
                "Open bugs:\n{}",
                formatter.format_bugs(&self.result.bugs_found)
            ));
        }

        if !self.result.fixes_applied.is_empty() {
            let files: Vec<_> = self
                .result
                .fixes_applied
                .iter()
                .map(|p| format!("  - {}", p.display()))
                .collect();
            sections.push(format!("Applied fixes:\n{}", files.join("\n")));
        }

        if !self.result.errors.is_empty() {
            let errors: Vec<_> = self.result.errors.iter().map(|e| format!("  - {e}")).collect();
            sections.push(format!("Errors:\n{}", errors.join("\n")));
        }

        sections.join("\n\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Returns whether the run succeeded.
pub async fn execute(args: RunArgs, global: &GlobalOptions) -> Result<bool> {
    let project_root = resolve_project_root(&args.path)?;

    let mut config = load_config(&project_root, global.config.as_deref())?;
    args.apply(&mut config, ci_from_env());
    ConfigLoader::validate(&config)?;

    let _logger = LoggerImpl::init(&LogSettings::from_config(&config.logging, global.verbose)?)?;

    let usage = Arc::new(SessionUsage::new());
    let factory = ExecStagesFactory::new(config.stages.clone(), Arc::clone(&usage));
    let analysis = BugAnalysisStage::new(Arc::new(factory.bug_analyzer(&project_root)));
    let registry = FrameworkRegistry::builtin(&config.runner);

    let mut controller = LoopController::new(
        &project_root,
        config.loop_policy.clone(),
        config.scratch.clone(),
        Arc::clone(&usage) as Arc<dyn UsageTracker>,
    );
    if config.history.enabled {
        controller = controller.with_history(Arc::new(JsonlHistory::new(
            project_root.join(&config.history.dir),
        )));
    }

    let result = controller
        .run_with_registry(&registry, config.runner.framework.as_deref(), &analysis, &factory)
        .await;

    let run_output = RunOutput {
        tokens_used: usage.total_tokens(),
        result,
    };
    output(&run_output, global.json);

    Ok(run_output.result.success)
}
