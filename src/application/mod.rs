//! Application layer: the fix-loop controller.

pub mod loop_controller;

pub use loop_controller::LoopController;
