//! Token usage accounting

use crate::provider::TokenUsage;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Post-completion usage sink.
pub trait TokenTracker: Send + Sync {
    fn record(&self, session_id: &str, usage: &TokenUsage);
}

/// Keeps running totals per session in memory
#[derive(Default)]
pub struct InMemoryTokenTracker {
    totals: Mutex<HashMap<String, TokenUsage>>,
}

impl InMemoryTokenTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total usage recorded for a session so far
    pub fn usage_for(&self, session_id: &str) -> Option<TokenUsage> {
        self.totals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(session_id)
            .copied()
    }
}

impl TokenTracker for InMemoryTokenTracker {
    fn record(&self, session_id: &str, usage: &TokenUsage) {
        let mut totals = self.totals.lock().unwrap_or_else(PoisonError::into_inner);
        totals.entry(session_id.to_string()).or_default().add(usage);
        tracing::debug!(
            session = session_id,
            total_tokens = usage.total_tokens,
            "Recorded token usage"
        );
    }
}
