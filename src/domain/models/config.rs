//! Top-level configuration, one struct per YAML section.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::loop_config::LoopConfig;

/// Main configuration structure for fixloop
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Fix-loop policy
    #[serde(default)]
    pub loop_policy: LoopConfig,

    /// Test runner selection and invocation
    #[serde(default)]
    pub runner: RunnerConfig,

    /// External commands backing the analysis and fix stages
    #[serde(default)]
    pub stages: StagesConfig,

    /// Scratch area for reproduction tests
    #[serde(default)]
    pub scratch: ScratchConfig,

    /// Run history
    #[serde(default)]
    pub history: HistoryConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Test runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RunnerConfig {
    /// Registered framework to use; detected from the project when unset
    #[serde(default)]
    pub framework: Option<String>,

    /// Command (program followed by arguments) that runs the suite
    #[serde(default)]
    pub command: Vec<String>,

    /// JSON run report the command leaves behind, relative to the project root
    #[serde(default = "default_report_path")]
    pub report_path: PathBuf,
}

fn default_report_path() -> PathBuf {
    PathBuf::from(".fixloop/report.json")
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            framework: None,
            command: Vec::new(),
            report_path: default_report_path(),
        }
    }
}

/// External command per collaborator stage (program followed by arguments)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StagesConfig {
    /// Classifies a failing case; required
    #[serde(default)]
    pub bug_analyzer: Option<Vec<String>>,

    /// Writes and runs a reproduction test
    #[serde(default)]
    pub verifier: Option<Vec<String>>,

    /// Locates the defect
    #[serde(default)]
    pub root_cause: Option<Vec<String>>,

    /// Proposes a patch
    #[serde(default)]
    pub fix_generator: Option<Vec<String>>,

    /// Checks the patch against the reproduction test
    #[serde(default)]
    pub fix_verifier: Option<Vec<String>>,

    /// Per-call limit for every stage command, in seconds; unbounded when unset
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl StagesConfig {
    /// Configured per-call limit, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Names of the fix stages that have no command configured.
    pub fn missing_fix_stages(&self) -> Vec<&'static str> {
        [
            ("verifier", &self.verifier),
            ("root_cause", &self.root_cause),
            ("fix_generator", &self.fix_generator),
            ("fix_verifier", &self.fix_verifier),
        ]
        .into_iter()
        .filter(|(_, cmd)| cmd.as_ref().is_none_or(Vec::is_empty))
        .map(|(name, _)| name)
        .collect()
    }
}

/// Scratch area for reproduction tests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ScratchConfig {
    /// Reserved directory, relative to the project root
    #[serde(default = "default_scratch_dir")]
    pub dir: PathBuf,

    /// File name given to each reproduction test
    #[serde(default = "default_scratch_file_name")]
    pub file_name: String,
}

fn default_scratch_dir() -> PathBuf {
    PathBuf::from(".fixloop/tmp/reproduction")
}

fn default_scratch_file_name() -> String {
    "repro_test".to_string()
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self {
            dir: default_scratch_dir(),
            file_name: default_scratch_file_name(),
        }
    }
}

/// Run history written under the project root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct HistoryConfig {
    /// Record test runs and discovered bugs
    #[serde(default = "default_history_enabled")]
    pub enabled: bool,

    /// History directory, relative to the project root
    #[serde(default = "default_history_dir")]
    pub dir: PathBuf,
}

const fn default_history_enabled() -> bool {
    true
}

fn default_history_dir() -> PathBuf {
    PathBuf::from(".fixloop/history")
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: default_history_enabled(),
            dir: default_history_dir(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stderr only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fix_stages_lists_unset_and_empty() {
        let stages = StagesConfig {
            bug_analyzer: Some(vec!["analyze".into()]),
            verifier: Some(vec!["verify".into()]),
            root_cause: Some(vec![]),
            fix_generator: None,
            fix_verifier: Some(vec!["check".into()]),
            timeout_secs: None,
        };

        assert_eq!(stages.missing_fix_stages(), vec!["root_cause", "fix_generator"]);
    }

    #[test]
    fn test_yaml_sections_default_independently() {
        let yaml = r"
loop_policy:
  fix_enabled: true
  max_fix_loops: 3
runner:
  command: [make, test]
";
        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert!(config.loop_policy.fix_enabled);
        assert_eq!(config.loop_policy.max_fix_loops, 3);
        assert_eq!(config.loop_policy.test_timeout_secs, 120);
        assert_eq!(config.runner.command, vec!["make", "test"]);
        assert_eq!(config.runner.report_path, PathBuf::from(".fixloop/report.json"));
        assert_eq!(config.scratch.file_name, "repro_test");
        assert!(config.history.enabled);
        assert_eq!(config.history.dir, PathBuf::from(".fixloop/history"));
        assert_eq!(config.logging.level, "info");
    }
}
