//! Framework registry.

use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use super::command::CommandTestRunner;
use crate::domain::errors::InfrastructureError;
use crate::domain::models::RunnerConfig;
use crate::domain::ports::TestRunner;

/// Registry of named test-runner capabilities.
///
/// Registration order is detection order.
#[derive(Default)]
pub struct FrameworkRegistry {
    runners: Vec<Arc<dyn TestRunner>>,
}

impl FrameworkRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in runners, configured from `config`.
    pub fn builtin(config: &RunnerConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(CommandTestRunner::from_config(config)));
        registry
    }

    /// Add a runner. A runner with the same name replaces the earlier one.
    pub fn register(&mut self, runner: Arc<dyn TestRunner>) {
        if let Some(slot) = self
            .runners
            .iter_mut()
            .find(|existing| existing.name() == runner.name())
        {
            *slot = runner;
        } else {
            self.runners.push(runner);
        }
    }

    /// Registered names, in detection order.
    pub fn names(&self) -> Vec<&str> {
        self.runners.iter().map(|r| r.name()).collect()
    }

    /// Runner registered as `name`.
    pub fn get(&self, name: &str) -> Option<Arc<dyn TestRunner>> {
        self.runners.iter().find(|r| r.name() == name).map(Arc::clone)
    }

    /// First registered runner that recognises the project.
    pub fn detect(&self, project_root: &Path) -> Option<Arc<dyn TestRunner>> {
        self.runners
            .iter()
            .find(|r| r.detect(project_root))
            .map(Arc::clone)
    }

    /// Pick a runner by explicit name, falling back to detection.
    ///
    /// # Errors
    /// `UnknownFramework` for an unregistered name, `NoTestRunner` when
    /// nothing detects the project.
    pub fn resolve(
        &self,
        name: Option<&str>,
        project_root: &Path,
    ) -> Result<Arc<dyn TestRunner>, InfrastructureError> {
        if let Some(name) = name {
            return self
                .get(name)
                .ok_or_else(|| InfrastructureError::UnknownFramework(name.to_string()));
        }

        let runner = self
            .detect(project_root)
            .ok_or_else(|| InfrastructureError::NoTestRunner(project_root.to_path_buf()))?;
        debug!(framework = runner.name(), "Detected test framework");
        Ok(runner)
    }
}
