//! Usage accumulation across one agent invocation.

use serde::{Deserialize, Serialize};

use crate::cli::MessageUsage;

/// Accumulated token, cost and turn counters for one spawn.
///
/// Every field is monotonically non-decreasing for the lifetime of the
/// spawn except `context_tokens`, which is a last-write-wins snapshot of
/// the child's reported context size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageStats {
    /// Input tokens consumed.
    pub input_tokens: u64,
    /// Output tokens produced.
    pub output_tokens: u64,
    /// Tokens served from prompt cache.
    pub cache_read_tokens: u64,
    /// Tokens written to prompt cache.
    pub cache_write_tokens: u64,
    /// Cumulative cost in USD.
    pub cost_usd: f64,
    /// Context size after the most recent message. Not a sum.
    pub context_tokens: u64,
    /// Completed assistant turns.
    pub turns: u32,
}

impl UsageStats {
    /// Fold one message's usage block into the accumulator.
    pub fn fold(&mut self, usage: &MessageUsage) {
        self.input_tokens = self.input_tokens.saturating_add(usage.input);
        self.output_tokens = self.output_tokens.saturating_add(usage.output);
        self.cache_read_tokens = self.cache_read_tokens.saturating_add(usage.cache_read);
        self.cache_write_tokens = self.cache_write_tokens.saturating_add(usage.cache_write);
        self.cost_usd += usage.cost.total;
        if usage.context_tokens > 0 {
            self.context_tokens = usage.context_tokens;
        }
    }

    /// Record one completed assistant turn.
    pub fn record_turn(&mut self) {
        self.turns = self.turns.saturating_add(1);
    }

    /// Total tokens billed (input + output).
    #[must_use]
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}
