//! Token usage tracking across exchanges and providers.

use std::collections::HashMap;

use crate::TokenUsage;

/// Usage and exchange count attributed to one provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderUsage {
    pub usage: TokenUsage,
    pub exchanges: u64,
}

/// Tracks cumulative token usage per provider.
///
/// One record corresponds to one network exchange; a turn that resolves
/// tool calls records several.
#[derive(Debug, Default)]
pub struct TokenTracker {
    total: TokenUsage,
    by_provider: HashMap<String, ProviderUsage>,
    exchanges: u64,
}

impl TokenTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the usage reported for one exchange.
    pub fn record(&mut self, provider: &str, usage: &TokenUsage) {
        add(&mut self.total, usage);
        self.exchanges += 1;

        let entry = self.by_provider.entry(provider.to_string()).or_default();
        add(&mut entry.usage, usage);
        entry.exchanges += 1;
    }

    pub fn total(&self) -> &TokenUsage {
        &self.total
    }

    pub fn for_provider(&self, provider: &str) -> Option<&ProviderUsage> {
        self.by_provider.get(provider)
    }

    pub fn total_tokens(&self) -> u64 {
        self.total.total_tokens()
    }

    /// Number of exchanges recorded.
    pub fn call_count(&self) -> u64 {
        self.exchanges
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn add(into: &mut TokenUsage, usage: &TokenUsage) {
    into.input_tokens = into.input_tokens.saturating_add(usage.input_tokens);
    into.output_tokens = into.output_tokens.saturating_add(usage.output_tokens);
}
