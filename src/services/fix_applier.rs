//! Writes verified fixes to disk.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info};

use crate::domain::models::VerifiedFix;

/// Resolve `path` against `project_root` unless it is already absolute.
pub fn resolve_in_root(project_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}

/// Overwrites source files with verified fix content.
///
/// Writes are neither transactional nor locked, and no backup is kept.
pub struct FixApplier {
    project_root: PathBuf,
}

impl FixApplier {
    /// Applier that only writes inside `project_root`.
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }

    /// Apply each fix in turn; returns the resolved paths that were written.
    ///
    /// A failed write is logged and left out of the result without stopping
    /// the remaining fixes.
    pub async fn apply(&self, fixes: &[VerifiedFix]) -> Vec<PathBuf> {
        let mut applied = Vec::with_capacity(fixes.len());

        for verified in fixes {
            let target = resolve_in_root(&self.project_root, &verified.file_path);

            match fs::write(&target, &verified.fix.fixed_code).await {
                Ok(()) => {
                    info!(file = %target.display(), "Applied fix");
                    applied.push(target);
                }
                Err(e) => {
                    error!(file = %target.display(), error = %e, "Failed to apply fix");
                }
            }
        }

        if !fixes.is_empty() {
            info!(applied = applied.len(), total = fixes.len(), "Fix application complete");
        }

        applied
    }
}
