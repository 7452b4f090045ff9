//! Token usage port.

/// Source of cumulative LLM token usage for the current session.
///
/// The counter only ever grows. Injected into the loop controller so tests can
/// supply deterministic values.
pub trait UsageTracker: Send + Sync {
    /// Tokens spent so far.
    fn total_tokens(&self) -> u64;
}
