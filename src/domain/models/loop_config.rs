//! Loop policy: fixing, caps, budget and test timeout.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Loop policy for the fix loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoopConfig {
    /// Whether to generate and apply fixes at all
    #[serde(default)]
    pub fix_enabled: bool,

    /// Maximum fix-rerun iterations (0 = unlimited, 1 = single pass)
    #[serde(default = "default_max_fix_loops")]
    pub max_fix_loops: u32,

    /// Total LLM token budget for the run (0 = unlimited)
    #[serde(default)]
    pub token_budget: u64,

    /// Constrained (CI) policy: always a single pass
    #[serde(default)]
    pub constrained_mode: bool,

    /// Timeout applied to each test run, in seconds
    #[serde(default = "default_test_timeout_secs")]
    pub test_timeout_secs: u64,
}

const fn default_max_fix_loops() -> u32 {
    1
}

const fn default_test_timeout_secs() -> u64 {
    120
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            fix_enabled: false,
            max_fix_loops: default_max_fix_loops(),
            token_budget: 0,
            constrained_mode: false,
            test_timeout_secs: default_test_timeout_secs(),
        }
    }
}

impl LoopConfig {
    /// Loop cap actually enforced; constrained mode always collapses it to 1.
    pub const fn effective_max_loops(&self) -> u32 {
        if self.constrained_mode {
            1
        } else {
            self.max_fix_loops
        }
    }

    /// Whether `tokens_used` has reached the budget. Never true when unlimited.
    pub const fn budget_exceeded(&self, tokens_used: u64) -> bool {
        self.token_budget > 0 && tokens_used >= self.token_budget
    }

    /// Whether `iteration` (1-based) lies beyond the effective cap.
    pub const fn cap_reached(&self, iteration: u32) -> bool {
        let cap = self.effective_max_loops();
        cap > 0 && iteration > cap
    }

    /// Limit for a single test run.
    pub const fn test_timeout(&self) -> Duration {
        Duration::from_secs(self.test_timeout_secs)
    }
}
