//! Resolved logging settings.

use anyhow::{bail, Result};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::Level;

use crate::domain::models::LoggingConfig;

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line
    Json,
    /// Human-readable, colored on a terminal
    Pretty,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            _ => bail!("Invalid log format: {s}"),
        }
    }
}

/// Resolved logger settings
#[derive(Debug, Clone)]
pub struct LogSettings {
    /// Most verbose level emitted
    pub level: Level,
    /// Line format
    pub format: LogFormat,

    /// Directory for daily-rotated log files; stderr only when `None`
    pub log_dir: Option<PathBuf>,
}

impl LogSettings {
    /// Settings from the `logging` config section.
    ///
    /// `verbose` raises the level to debug regardless of configuration.
    pub fn from_config(config: &LoggingConfig, verbose: bool) -> Result<Self> {
        let level = if verbose {
            Level::DEBUG
        } else {
            parse_log_level(&config.level)?
        };

        Ok(Self {
            level,
            format: config.format.parse()?,
            log_dir: config.log_dir.clone(),
        })
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::Pretty,
            log_dir: None,
        }
    }
}

/// Parse log level string to Level
pub fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => bail!("Invalid log level: {level}"),
    }
}
