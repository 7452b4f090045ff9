//! Core services: bug analysis, the fix pipeline and fix application.

pub mod bug_analysis;
pub mod fix_applier;
pub mod fix_pipeline;
pub mod isolation;
pub mod usage_tracker;

pub use bug_analysis::BugAnalysisStage;
pub use fix_applier::{resolve_in_root, FixApplier};
pub use fix_pipeline::FixPipeline;
pub use isolation::{join_isolated, UnitFailure};
pub use usage_tracker::SessionUsage;
