//! Implementation of the `fixloop frameworks` command.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;

use super::{load_config, resolve_project_root};
use crate::adapters::FrameworkRegistry;
use crate::cli::output::table::{FrameworkRow, TableFormatter};
use crate::cli::output::{output, CommandOutput};
use crate::cli::types::GlobalOptions;

/// Arguments to `fixloop frameworks`
#[derive(Args, Debug)]
pub struct FrameworksArgs {
    /// Project directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

/// One registered framework as seen from the project
#[derive(Debug, Serialize)]
pub struct FrameworkInfo {
    /// Registry name
    pub name: String,
    /// Whether it recognised the project
    pub detected: bool,
    /// Why it cannot run, if it cannot
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prerequisites_error: Option<String>,
}

/// Result of `fixloop frameworks`
#[derive(Debug, Serialize)]
pub struct FrameworksOutput {
    /// Project that was inspected
    pub project_root: PathBuf,
    /// Every registered framework
    pub frameworks: Vec<FrameworkInfo>,
    /// Framework a `run` would use, if any
    pub selected: Option<String>,
}

impl CommandOutput for FrameworksOutput {
    fn to_human(&self) -> String {
        let rows: Vec<_> = self
            .frameworks
            .iter()
            .map(|f| FrameworkRow {
                name: &f.name,
                detected: f.detected,
                selected: self.selected.as_deref() == Some(f.name.as_str()),
                prerequisites: f.prerequisites_error.as_deref().map_or(Ok(()), Err),
            })
            .collect();

        let footer = match &self.selected {
            Some(name) => format!("Selected: {name}"),
            None => "No framework detected; set runner.command or pass --framework".to_string(),
        };

        format!("{}\n{footer}", TableFormatter::new().format_frameworks(&rows))
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// List registered frameworks for the project. Always succeeds once the config loads.
pub async fn execute(args: FrameworksArgs, global: &GlobalOptions) -> Result<bool> {
    let project_root = resolve_project_root(&args.path)?;
    let config = load_config(&project_root, global.config.as_deref())?;
    let registry = FrameworkRegistry::builtin(&config.runner);

    let mut frameworks = Vec::new();
    for name in registry.names() {
        let Some(runner) = registry.get(name) else {
            continue;
        };
        frameworks.push(FrameworkInfo {
            name: name.to_string(),
            detected: runner.detect(&project_root),
            prerequisites_error: runner.check_prerequisites(&project_root).await.err(),
        });
    }

    let selected = registry
        .resolve(config.runner.framework.as_deref(), &project_root)
        .ok()
        .map(|r| r.name().to_string());

    output(
        &FrameworksOutput {
            project_root,
            frameworks,
            selected,
        },
        global.json,
    );

    Ok(true)
}
