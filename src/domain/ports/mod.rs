//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines the interfaces the fix loop consumes:
//! - TestRunner: executes the suite for a project
//! - BugAnalyzer: classifies failing cases
//! - BugVerifier / RootCauseAnalyzer / FixGenerator / FixVerifier: the fix stages
//! - UsageTracker: cumulative token spend
//! - RunHistory: append-only record of test runs and discovered bugs
//!
//! Adapters in `crate::adapters` implement these traits.

pub mod analyzers;
pub mod history;
pub mod test_runner;
pub mod usage;

pub use analyzers::{
    BugAnalyzer, BugVerifier, FixGenerator, FixStages, FixStagesFactory, FixVerifier,
    RootCauseAnalyzer,
};
pub use history::RunHistory;
pub use test_runner::TestRunner;
pub use usage::UsageTracker;
