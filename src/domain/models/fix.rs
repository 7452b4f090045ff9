//! Artifacts produced by the four fix stages.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Output of the verify stage: whether the bug reproduces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Whether the reproduction test triggered the bug
    pub is_confirmed: bool,

    /// Source text of a test that deterministically triggers the bug
    #[serde(default)]
    pub reproduction_test: String,

    /// Output of the reproduction run
    #[serde(default)]
    pub test_output: String,

    /// Verifier confidence in `[0.0, 1.0]`
    #[serde(default)]
    pub confidence: f64,
}

/// Output of the diagnose stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootCause {
    /// Broad class of cause
    pub category: String,
    /// What is wrong and why
    pub description: String,
    /// Excerpt of the offending code
    #[serde(default)]
    pub affected_code: String,
}

/// Output of the generate stage: a full replacement for the source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedFix {
    /// Complete new contents of the source file
    pub fixed_code: String,

    /// Unified diff of the change, for display
    #[serde(default)]
    pub patch: String,

    /// Why the change fixes the bug
    #[serde(default)]
    pub explanation: String,

    /// Lines the change touches
    #[serde(default)]
    pub changed_lines: Vec<u32>,

    /// Caveats worth a reviewer's attention
    #[serde(default)]
    pub safety_notes: Vec<String>,
}

/// Output of the verify-fix stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixVerificationOutcome {
    /// Whether the fix made the reproduction test pass
    pub is_verified: bool,
    /// Verifier remarks
    #[serde(default)]
    pub notes: String,
}

/// A fix that passed all four stages, paired with the file it replaces.
///
/// `file_path` is the location named in the bug report, unresolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedFix {
    /// File to replace
    pub file_path: PathBuf,
    /// The verified fix
    pub fix: GeneratedFix,
}

impl VerifiedFix {
    /// Pair `fix` with the file it replaces.
    pub fn new(file_path: impl Into<PathBuf>, fix: GeneratedFix) -> Self {
        Self {
            file_path: file_path.into(),
            fix,
        }
    }
}
