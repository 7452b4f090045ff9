//! fixloop - iterate-until-converged bug fixing
//!
//! fixloop runs a project's test suite, decides which failures are genuine
//! code bugs, has external stages verify, diagnose and fix them, applies the
//! verified fixes and repeats until the suite is clean, a loop cap or token
//! budget is hit, or a round makes no progress.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, errors and port traits
//! - **Service Layer** (`services`): bug analysis, fix pipeline, fix application
//! - **Application Layer** (`application`): the loop controller
//! - **Adapters** (`adapters`): command-backed test runner and stage handlers
//! - **Infrastructure Layer** (`infrastructure`): configuration, logging and run history
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use fixloop::{BugAnalysisStage, ExecStagesFactory, FrameworkRegistry, LoopController, SessionUsage};
//!
//! let usage = Arc::new(SessionUsage::new());
//! let factory = ExecStagesFactory::new(config.stages.clone(), usage.clone());
//! let analysis = BugAnalysisStage::new(Arc::new(factory.bug_analyzer(&root)));
//! let controller = LoopController::new(&root, config.loop_policy.clone(), config.scratch.clone(), usage);
//! let result = controller
//!     .run_with_registry(&FrameworkRegistry::builtin(&config.runner), None, &analysis, &factory)
//!     .await;
//! ```

pub mod adapters;
pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use adapters::{CommandTestRunner, ExecStage, ExecStagesFactory, FrameworkRegistry};
pub use application::LoopController;
pub use domain::models::{
    BugReport, CaseResult, CaseStatus, Config, HistoryEvent, LoopConfig, PipelineResult, RunResult,
    StopReason,
};
pub use domain::ports::{FixStages, FixStagesFactory, RunHistory, TestRunner, UsageTracker};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::history::JsonlHistory;
pub use services::{BugAnalysisStage, FixApplier, FixPipeline, SessionUsage};
