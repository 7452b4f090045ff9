//! Adapters implementing the domain ports.

pub mod exec;
pub mod frameworks;

pub use exec::{ExecStage, ExecStagesFactory};
pub use frameworks::{CommandTestRunner, FrameworkRegistry};
