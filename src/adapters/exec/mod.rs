//! Stage handlers backed by external commands speaking JSON over stdio.

pub mod factory;
pub mod stage;

pub use factory::ExecStagesFactory;
pub use stage::ExecStage;
