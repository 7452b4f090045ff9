//! Builds stage handlers from the `stages` configuration.

use std::path::Path;
use std::sync::Arc;

use super::stage::ExecStage;
use crate::domain::models::StagesConfig;
use crate::domain::ports::{FixStages, FixStagesFactory};
use crate::services::SessionUsage;

/// Builds command-backed handlers for the analysis and fix stages.
pub struct ExecStagesFactory {
    stages: StagesConfig,
    usage: Arc<SessionUsage>,
}

impl ExecStagesFactory {
    /// Factory over the `stages` section; every handler reports to `usage`.
    pub fn new(stages: StagesConfig, usage: Arc<SessionUsage>) -> Self {
        Self { stages, usage }
    }

    fn handler(&self, name: &'static str, command: Option<&Vec<String>>, root: &Path) -> ExecStage {
        ExecStage::new(
            name,
            command.cloned().unwrap_or_default(),
            root,
            Arc::clone(&self.usage),
        )
        .with_timeout(self.stages.timeout())
    }

    /// Handler for the bug analyzer.
    pub fn bug_analyzer(&self, project_root: &Path) -> ExecStage {
        self.handler("bug_analyzer", self.stages.bug_analyzer.as_ref(), project_root)
    }
}

impl FixStagesFactory for ExecStagesFactory {
    fn create(&self, project_root: &Path) -> FixStages {
        let s = &self.stages;
        FixStages {
            verifier: Arc::new(self.handler("verifier", s.verifier.as_ref(), project_root)),
            root_cause: Arc::new(self.handler("root_cause", s.root_cause.as_ref(), project_root)),
            generator: Arc::new(self.handler("fix_generator", s.fix_generator.as_ref(), project_root)),
            fix_verifier: Arc::new(self.handler("fix_verifier", s.fix_verifier.as_ref(), project_root)),
        }
    }
}
