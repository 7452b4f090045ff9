//! Layered configuration loading and validation.

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::{Component, Path};
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    /// `logging.level` is not a known level
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    /// `logging.format` is neither json nor pretty
    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    /// A test run may not be given zero time
    #[error("Invalid test_timeout_secs: 0. Must be at least 1")]
    ZeroTimeout,

    /// A stage call may not be given zero time
    #[error("Invalid stages.timeout_secs: 0. Must be at least 1 or unset")]
    ZeroStageTimeout,

    /// Reproduction tests need a file name
    #[error("Scratch file name cannot be empty")]
    EmptyScratchFileName,

    /// Scratch dir is absolute or leaves the project root
    #[error("Scratch dir {0} must be relative and stay inside the project root")]
    InvalidScratchDir(String),

    /// History dir is absolute or leaves the project root
    #[error("History dir {0} must be relative and stay inside the project root")]
    InvalidHistoryDir(String),

    /// No test command to run
    #[error("Runner command cannot be empty")]
    EmptyRunnerCommand,

    /// Required stages have no command
    #[error("No command is configured for stage(s): {}", .0.join(", "))]
    MissingStageCommands(Vec<&'static str>),
}

/// Project-local configuration directory
pub const CONFIG_DIR: &str = ".fixloop";

/// Environment variable prefix; nested keys are separated by `__`
pub const ENV_PREFIX: &str = "FIXLOOP_";

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for the project at `project_root`
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. `.fixloop/config.yaml` (project config)
    /// 3. `.fixloop/local.yaml` (local overrides, optional)
    /// 4. Environment variables (`FIXLOOP_*` prefix)
    ///
    /// The result is not validated; command-line overrides are usually
    /// applied first, then [`validate`](Self::validate).
    pub fn load(project_root: &Path) -> Result<Config> {
        let dir = project_root.join(CONFIG_DIR);

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(dir.join("config.yaml")))
            .merge(Yaml::file(dir.join("local.yaml")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")
    }

    /// Load configuration from a specific file over the defaults
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        anyhow::ensure!(path.is_file(), "Config file {} does not exist", path.display());

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))
    }

    /// Validate configuration after loading and overrides
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        if config.loop_policy.test_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        if config.stages.timeout_secs == Some(0) {
            return Err(ConfigError::ZeroStageTimeout);
        }

        if config.scratch.file_name.trim().is_empty() {
            return Err(ConfigError::EmptyScratchFileName);
        }

        if !stays_inside_root(&config.scratch.dir) {
            return Err(ConfigError::InvalidScratchDir(
                config.scratch.dir.display().to_string(),
            ));
        }

        if config.history.enabled && !stays_inside_root(&config.history.dir) {
            return Err(ConfigError::InvalidHistoryDir(
                config.history.dir.display().to_string(),
            ));
        }

        if config.runner.command.first().is_none_or(|p| p.is_empty()) {
            return Err(ConfigError::EmptyRunnerCommand);
        }

        if config
            .stages
            .bug_analyzer
            .as_ref()
            .is_none_or(Vec::is_empty)
        {
            return Err(ConfigError::MissingStageCommands(vec!["bug_analyzer"]));
        }

        if config.loop_policy.fix_enabled {
            let missing = config.stages.missing_fix_stages();
            if !missing.is_empty() {
                return Err(ConfigError::MissingStageCommands(missing));
            }
        }

        Ok(())
    }
}

/// Non-empty relative path with no `..` or root components
fn stays_inside_root(dir: &Path) -> bool {
    !dir.as_os_str().is_empty()
        && dir
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
