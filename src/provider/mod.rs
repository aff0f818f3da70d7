//! Provider client abstraction
//!
//! Agents never talk to a model backend directly; they go through a
//! `ProviderClient`, which exposes the one capability the dispatcher needs:
//! turn a prompt into text for a given model, within a time bound.

mod command;
#[cfg(test)]
pub(crate) mod mock;

pub use command::CommandProvider;

use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Name of a configured provider (e.g. `claude`, `codex`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(pub String);

impl ProviderId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.0)
    }
}

/// Token accounting reported by a provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    /// Accumulate another usage report into this one
    pub fn add(&mut self, other: &TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// Text produced by a provider, plus usage when the backend reports it
#[derive(Debug, Clone)]
pub struct Generation {
    pub text: String,
    pub usage: Option<TokenUsage>,
}

#[async_trait]
pub trait ProviderClient: Send + Sync {
    fn id(&self) -> &ProviderId;

    /// Generate a completion. Fails with `AtelierError::Provider` on
    /// auth/network/quota problems and `AtelierError::Timeout` when the
    /// provider gives up on its own.
    async fn generate(&self, prompt: &str, model: &str, timeout: Duration) -> Result<Generation>;

    /// Cheap readiness probe for the given model
    async fn health_check(&self, model: &str) -> Result<()>;
}
