//! Subcommand implementations and the helpers they share.

pub mod frameworks;
pub mod run;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;

/// Absolute project root for a user-supplied path.
pub(crate) fn resolve_project_root(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()
            .context("Failed to get current directory")?
            .join(path))
    }
}

/// An explicit `--config` file wins over the project's `.fixloop/` files.
pub(crate) fn load_config(project_root: &Path, explicit: Option<&Path>) -> Result<Config> {
    match explicit {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(project_root),
    }
}
