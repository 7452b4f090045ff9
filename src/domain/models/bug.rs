//! Bug reports and analyzer verdicts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of defect an analyzer attributed a failure to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BugType {
    /// Use of a null or missing value
    NullDereference,
    /// Name used before definition
    UndefinedVariable,
    /// Operation on a value of the wrong type
    TypeError,
    /// Division by zero, overflow and the like
    ArithmeticError,
    /// Out-of-range index or missing key
    IndexError,
    /// An assertion in the code under test fired
    AssertionError,
    /// An exception escaped unhandled
    UncaughtException,
    /// Wrong result with no crash
    LogicError,
    /// Handle or memory never released
    ResourceLeak,
    /// Outcome depends on interleaving
    RaceCondition,
    /// Exploitable flaw
    SecurityVulnerability,
    /// Anything the analyzer could not classify
    #[serde(other)]
    Unknown,
}

impl fmt::Display for BugType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NullDereference => "null_dereference",
            Self::UndefinedVariable => "undefined_variable",
            Self::TypeError => "type_error",
            Self::ArithmeticError => "arithmetic_error",
            Self::IndexError => "index_error",
            Self::AssertionError => "assertion_error",
            Self::UncaughtException => "uncaught_exception",
            Self::LogicError => "logic_error",
            Self::ResourceLeak => "resource_leak",
            Self::RaceCondition => "race_condition",
            Self::SecurityVulnerability => "security_vulnerability",
            Self::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// How bad a bug is, most severe first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BugSeverity {
    /// Crash or data loss
    Critical,
    /// Core behavior broken
    High,
    /// Degraded behavior
    Medium,
    /// Minor or cosmetic
    Low,
    /// Worth knowing, not worth fixing
    Info,
}

impl fmt::Display for BugSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Info => "info",
        };
        write!(f, "{s}")
    }
}

/// Where in the source a bug lives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BugLocation {
    /// Path as reported, relative to the project root
    pub file_path: String,

    /// 1-based line, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u32>,

    /// Enclosing function, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
}

impl BugLocation {
    /// Location naming only a file.
    pub fn file(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            line_number: None,
            function_name: None,
        }
    }
}

/// A failure the analyzer judged to be a genuine code bug.
///
/// Owned by the round that produced it; the next round re-derives its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BugReport {
    /// Kind of defect
    #[serde(rename = "type")]
    pub bug_type: BugType,
    /// How bad it is
    pub severity: BugSeverity,
    /// One-line summary
    pub title: String,
    /// Longer explanation
    #[serde(default)]
    pub description: String,
    /// Where the bug lives
    pub location: BugLocation,
    /// Failure message of the case that exposed it
    #[serde(default)]
    pub error_message: String,

    /// Stack trace of that failure, if captured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,

    /// Analyzer confidence in `[0.0, 1.0]`
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

const fn default_confidence() -> f64 {
    1.0
}

impl BugReport {
    /// Report with default confidence and no message.
    pub fn new(
        bug_type: BugType,
        severity: BugSeverity,
        title: impl Into<String>,
        location: BugLocation,
    ) -> Self {
        Self {
            bug_type,
            severity,
            title: title.into(),
            description: String::new(),
            location,
            error_message: String::new(),
            stack_trace: None,
            confidence: default_confidence(),
        }
    }

    /// Attach the failure message.
    #[must_use]
    pub fn with_error_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = message.into();
        self
    }
}

/// What a bug analyzer concluded about one failing case.
///
/// `is_code_bug == false` means the failure is a test-only issue. A report is
/// only taken into account when the analyzer both flags a code bug and
/// supplies the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BugAnalysis {
    /// Whether the failure points at the code rather than the test
    pub is_code_bug: bool,

    /// Report backing a code-bug verdict
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bug_report: Option<BugReport>,
}

impl BugAnalysis {
    /// Verdict: a genuine code bug.
    pub fn code_bug(report: BugReport) -> Self {
        Self {
            is_code_bug: true,
            bug_report: Some(report),
        }
    }

    /// Verdict: the test itself is at fault.
    pub fn test_issue() -> Self {
        Self {
            is_code_bug: false,
            bug_report: None,
        }
    }

    /// The confirmed report, if any.
    pub fn into_report(self) -> Option<BugReport> {
        if self.is_code_bug {
            self.bug_report
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_report_requires_code_bug_flag() {
        let report = BugReport::new(
            BugType::ArithmeticError,
            BugSeverity::Medium,
            "Division by zero in ratio",
            BugLocation::file("src/math.py"),
        );

        let flagged_off = BugAnalysis {
            is_code_bug: false,
            bug_report: Some(report.clone()),
        };
        assert!(flagged_off.into_report().is_none());

        let missing = BugAnalysis {
            is_code_bug: true,
            bug_report: None,
        };
        assert!(missing.into_report().is_none());

        assert_eq!(BugAnalysis::code_bug(report.clone()).into_report(), Some(report));
    }

    #[test]
    fn test_bug_report_deserializes_wire_shape() {
        let json = r#"{
            "type": "null_dereference",
            "severity": "high",
            "title": "None access in load",
            "location": {"file_path": "src/app.py", "line_number": 42, "function_name": "load"}
        }"#;

        let report: BugReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.bug_type, BugType::NullDereference);
        assert_eq!(report.severity, BugSeverity::High);
        assert_eq!(report.location.line_number, Some(42));
        assert!((report.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unrecognized_bug_type_maps_to_unknown() {
        let bug_type: BugType = serde_json::from_str(r#""off_by_one""#).unwrap();
        assert_eq!(bug_type, BugType::Unknown);
    }
}
