//! Domain models: test results, bugs, fixes, run history and configuration.

pub mod bug;
pub mod config;
pub mod fix;
pub mod history;
pub mod loop_config;
pub mod pipeline;
pub mod run_result;

pub use bug::{BugAnalysis, BugLocation, BugReport, BugSeverity, BugType};
pub use config::{Config, HistoryConfig, LoggingConfig, RunnerConfig, ScratchConfig, StagesConfig};
pub use fix::{FixVerificationOutcome, GeneratedFix, RootCause, VerificationResult, VerifiedFix};
pub use history::{BugSnapshot, HistoryEvent, TestExecutionSnapshot};
pub use loop_config::LoopConfig;
pub use pipeline::{PipelineResult, StopReason};
pub use run_result::{CaseResult, CaseStatus, CoverageSummary, RunResult};
