//! Scripted provider for tests

use super::{Generation, ProviderClient, ProviderId, TokenUsage};
use crate::{AtelierError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub(crate) struct MockProvider {
    id: ProviderId,
    reply: std::result::Result<String, String>,
    usage: Option<TokenUsage>,
    delay: Duration,
    health: std::result::Result<(), String>,
    health_delay: Duration,
    calls: AtomicUsize,
}

impl MockProvider {
    pub(crate) fn replying(text: &str) -> Self {
        Self {
            id: ProviderId::new("mock"),
            reply: Ok(text.to_string()),
            usage: None,
            delay: Duration::ZERO,
            health: Ok(()),
            health_delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            ..Self::replying("")
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn with_usage(mut self, prompt_tokens: u64, completion_tokens: u64) -> Self {
        self.usage = Some(TokenUsage::new(prompt_tokens, completion_tokens));
        self
    }

    pub(crate) fn unhealthy(mut self, message: &str) -> Self {
        self.health = Err(message.to_string());
        self
    }

    pub(crate) fn with_health_delay(mut self, delay: Duration) -> Self {
        self.health_delay = delay;
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderClient for MockProvider {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    async fn generate(&self, _prompt: &str, _model: &str, _timeout: Duration) -> Result<Generation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        match &self.reply {
            Ok(text) => Ok(Generation {
                text: text.clone(),
                usage: self.usage,
            }),
            Err(message) => Err(AtelierError::Provider {
                provider: self.id.to_string(),
                message: message.clone(),
            }),
        }
    }

    async fn health_check(&self, _model: &str) -> Result<()> {
        tokio::time::sleep(self.health_delay).await;
        self.health.clone().map_err(|message| AtelierError::Provider {
            provider: self.id.to_string(),
            message,
        })
    }
}
