//! Per-bug fix pipeline: verify, diagnose, generate, verify-fix.
//!
//! Stages run strictly in order for one bug. Bugs are processed concurrently
//! through [`join_isolated`], so one bug's failure never reaches another.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::fix_applier::resolve_in_root;
use super::isolation::join_isolated;
use crate::domain::errors::StageError;
use crate::domain::models::{BugReport, GeneratedFix, ScratchConfig, VerifiedFix};
use crate::domain::ports::{FixStages, TestRunner};

/// Why a single bug produced no fix
#[derive(Debug)]
enum Abandoned {
    SourceMissing(PathBuf),
    NotReproduced,
    FixRejected(String),
    Stage(StageError),
}

impl From<StageError> for Abandoned {
    fn from(e: StageError) -> Self {
        Self::Stage(e)
    }
}

/// Runs the four fix stages for a batch of bugs.
///
/// Built once per fix round; the stage handlers are shared by every bug in
/// the batch.
pub struct FixPipeline {
    project_root: PathBuf,
    scratch: ScratchConfig,
    stages: FixStages,
    runner: Arc<dyn TestRunner>,
}

impl FixPipeline {
    /// Pipeline for one round.
    ///
    /// Reproduction tests go under `scratch.dir`, and `runner` re-runs the suite
    /// the way the loop does.
    pub fn new(
        project_root: impl Into<PathBuf>,
        scratch: ScratchConfig,
        stages: FixStages,
        runner: Arc<dyn TestRunner>,
    ) -> Self {
        Self {
            project_root: project_root.into(),
            scratch,
            stages,
            runner,
        }
    }

    /// Process every bug concurrently and return the fixes that verified.
    ///
    /// Output order carries no meaning.
    #[instrument(skip_all, fields(bugs = bugs.len()))]
    pub async fn run(&self, bugs: &[BugReport]) -> Vec<VerifiedFix> {
        if bugs.is_empty() {
            return Vec::new();
        }

        let outcomes = join_isolated(bugs.iter().map(|bug| self.fix_one(bug))).await;

        let mut fixes = Vec::new();
        for (bug, outcome) in bugs.iter().zip(outcomes) {
            match outcome {
                Ok(fix) => fixes.push(fix),
                Err(failure) => warn!(bug = %bug.title, reason = %failure, "No fix for bug"),
            }
        }

        self.prune_scratch_root().await;

        info!(verified = fixes.len(), total = bugs.len(), "Fix pipeline complete");
        fixes
    }

    /// Remove the reserved scratch directory and its parents while they are empty.
    async fn prune_scratch_root(&self) {
        let mut dir = self.scratch.dir.as_path();
        while !dir.as_os_str().is_empty() && dir != Path::new(".") {
            if fs::remove_dir(self.project_root.join(dir)).await.is_err() {
                break;
            }
            debug!(dir = %dir.display(), "Removed empty scratch directory");
            match dir.parent() {
                Some(parent) => dir = parent,
                None => break,
            }
        }
    }

    async fn fix_one(&self, bug: &BugReport) -> Result<VerifiedFix, Abandoned> {
        let source_path = resolve_in_root(&self.project_root, Path::new(&bug.location.file_path));

        let source_code = read_source(source_path).await?;

        debug!(bug = %bug.title, "S0: verifying bug");
        let verification = self
            .stages
            .verifier
            .verify(bug, &source_code, Arc::clone(&self.runner))
            .await?;
        if !verification.is_confirmed {
            return Err(Abandoned::NotReproduced);
        }

        debug!(bug = %bug.title, "S1: diagnosing root cause");
        let root_cause = self
            .stages
            .root_cause
            .diagnose(bug, &source_code, &verification.reproduction_test)
            .await?;
        debug!(bug = %bug.title, category = %root_cause.category, "Root cause identified");

        debug!(bug = %bug.title, "S2: generating fix");
        let fix = self
            .stages
            .generator
            .generate(bug, &source_code, &root_cause, &verification.reproduction_test)
            .await?;

        debug!(bug = %bug.title, "S3: verifying fix");
        self.verify_fix(&fix, &source_code, &verification.reproduction_test)
            .await?;

        info!(bug = %bug.title, file = %bug.location.file_path, "Fix verified");
        Ok(VerifiedFix::new(&bug.location.file_path, fix))
    }

    /// Write the reproduction test to a fresh scratch directory and hand it
    /// to the fix verifier. The scratch directory is removed afterwards.
    async fn verify_fix(
        &self,
        fix: &GeneratedFix,
        original_code: &str,
        reproduction_test: &str,
    ) -> Result<(), Abandoned> {
        let scratch_dir = self
            .project_root
            .join(&self.scratch.dir)
            .join(Uuid::new_v4().to_string());
        let repro_file = scratch_dir.join(&self.scratch.file_name);

        let io_err = |source| StageError::Io {
            stage: "fix_verifier".to_string(),
            source,
        };
        fs::create_dir_all(&scratch_dir).await.map_err(io_err)?;
        fs::write(&repro_file, reproduction_test)
            .await
            .map_err(io_err)?;

        let outcome = self
            .stages
            .fix_verifier
            .verify(fix, original_code, &repro_file, Arc::clone(&self.runner))
            .await;

        if let Err(e) = fs::remove_dir_all(&scratch_dir).await {
            debug!(dir = %scratch_dir.display(), error = %e, "Could not remove scratch directory");
        }

        let outcome = outcome?;
        if outcome.is_verified {
            Ok(())
        } else {
            Err(Abandoned::FixRejected(outcome.notes))
        }
    }
}

async fn read_source(path: PathBuf) -> Result<String, Abandoned> {
    match fs::read_to_string(&path).await {
        Ok(source) => Ok(source),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(Abandoned::SourceMissing(path)),
        Err(source) => Err(Abandoned::Stage(StageError::Io {
            stage: "source".to_string(),
            source,
        })),
    }
}

impl std::fmt::Display for Abandoned {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SourceMissing(path) => write!(f, "source file not found: {}", path.display()),
            Self::NotReproduced => write!(f, "bug could not be reproduced"),
            Self::FixRejected(notes) if notes.is_empty() => write!(f, "fix failed verification"),
            Self::FixRejected(notes) => write!(f, "fix failed verification: {notes}"),
            Self::Stage(e) => write!(f, "{e}"),
        }
    }
}
