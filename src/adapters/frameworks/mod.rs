//! Test-framework capabilities and their registry.

pub mod command;
pub mod registry;

pub use command::{CommandTestRunner, COMMAND_RUNNER_NAME};
pub use registry::FrameworkRegistry;
