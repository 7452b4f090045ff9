//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use super::commands::frameworks::FrameworksArgs;
use super::commands::run::RunArgs;

/// Top-level command line
#[derive(Parser)]
#[command(name = "fixloop")]
#[command(about = "fixloop - iterate test runs and verified fixes until the suite converges", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Load configuration from this file instead of .fixloop/
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Debug-level logging regardless of configuration
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Run tests, analyze failures and apply verified fixes until converged
    Run(RunArgs),

    /// List registered test frameworks and the one detected for a project
    Frameworks(FrameworksArgs),
}

/// Options shared by every command
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    /// JSON output
    pub json: bool,
    /// Explicit config file
    pub config: Option<PathBuf>,
    /// Debug logging
    pub verbose: bool,
}

impl From<&Cli> for GlobalOptions {
    fn from(cli: &Cli) -> Self {
        Self {
            json: cli.json,
            config: cli.config.clone(),
            verbose: cli.verbose,
        }
    }
}
