//! Agent contract and the specialized agent implementation
//!
//! An agent is one AI capability bound to a provider/model pair. All agents
//! share the same contract so the orchestrator never branches on provider.

mod registry;

pub use registry::*;

use crate::provider::{ProviderClient, ProviderId, TokenUsage};
use crate::{AtelierError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// Opaque key/value payload passed to and returned from agents
pub type Payload = Map<String, Value>;

/// Supported agent types
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum AgentType {
    Research,
    CodeReview,
    Testing,
    Documentation,
    Debugging,
    Security,
    Performance,
    Fork,
}

impl AgentType {
    pub const ALL: [AgentType; 8] = [
        AgentType::Research,
        AgentType::CodeReview,
        AgentType::Testing,
        AgentType::Documentation,
        AgentType::Debugging,
        AgentType::Security,
        AgentType::Performance,
        AgentType::Fork,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentType::Research => "research",
            AgentType::CodeReview => "code-review",
            AgentType::Testing => "testing",
            AgentType::Documentation => "documentation",
            AgentType::Debugging => "debugging",
            AgentType::Security => "security",
            AgentType::Performance => "performance",
            AgentType::Fork => "fork",
        }
    }

    /// Role line prepended to every prompt sent on behalf of this agent
    fn role(&self) -> &'static str {
        match self {
            AgentType::Research => "You are a research agent. Investigate the question and report findings with sources.",
            AgentType::CodeReview => "You are a code review agent. Review the code for correctness, clarity and maintainability.",
            AgentType::Testing => "You are a testing agent. Design and write tests that exercise the described behavior.",
            AgentType::Documentation => "You are a documentation agent. Write clear, accurate documentation for the material given.",
            AgentType::Debugging => "You are a debugging agent. Find the root cause of the problem and propose a fix.",
            AgentType::Security => "You are a security agent. Identify vulnerabilities and unsafe practices.",
            AgentType::Performance => "You are a performance agent. Find bottlenecks and suggest measurable improvements.",
            AgentType::Fork => "You are a general-purpose agent handling a forked task. Complete it as described.",
        }
    }
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl std::str::FromStr for AgentType {
    type Err = AtelierError;

    /// Accepts `CodeReview`, `code-review`, `code_review`, `code review`...
    fn from_str(s: &str) -> Result<Self> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "research" => Ok(AgentType::Research),
            "codereview" | "review" => Ok(AgentType::CodeReview),
            "testing" | "test" => Ok(AgentType::Testing),
            "documentation" | "docs" => Ok(AgentType::Documentation),
            "debugging" | "debug" => Ok(AgentType::Debugging),
            "security" => Ok(AgentType::Security),
            "performance" | "perf" => Ok(AgentType::Performance),
            "fork" => Ok(AgentType::Fork),
            _ => Err(AtelierError::NotFound(s.to_string())),
        }
    }
}

/// Deserializes through `FromStr`, so config files take the same spellings as the CLI
impl<'de> Deserialize<'de> for AgentType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// What an agent hands back after a successful execution
#[derive(Debug, Clone)]
pub struct AgentOutput {
    pub data: Payload,
    pub token_usage: Option<TokenUsage>,
    pub model_used: String,
}

/// Contract shared by every agent, regardless of provider
#[async_trait]
pub trait Agent: Send + Sync {
    fn agent_type(&self) -> AgentType;

    fn provider(&self) -> &ProviderId;

    fn model(&self) -> &str;

    /// Timeout applied when the caller does not supply one
    fn default_timeout(&self) -> Duration;

    /// Run the agent. `timeout` is the bound the caller will enforce, passed
    /// through so the provider can apply it on its side too.
    async fn execute(
        &self,
        input: &Payload,
        options: &Payload,
        timeout: Duration,
    ) -> Result<AgentOutput>;

    /// Cheap readiness probe. No retries.
    async fn health_check(&self) -> Result<()>;
}

/// Agent backed by a provider client and a fixed role prompt
pub struct SpecializedAgent {
    agent_type: AgentType,
    provider: Arc<dyn ProviderClient>,
    provider_id: ProviderId,
    model: String,
    default_timeout: Duration,
}

impl SpecializedAgent {
    pub fn new(
        agent_type: AgentType,
        provider: Arc<dyn ProviderClient>,
        model: impl Into<String>,
        default_timeout: Duration,
    ) -> Self {
        let provider_id = provider.id().clone();
        Self {
            agent_type,
            provider,
            provider_id,
            model: model.into(),
            default_timeout,
        }
    }

    /// Render the prompt: role line, then each input field, then any options
    /// the provider cannot take directly.
    fn build_prompt(&self, input: &Payload, options: &Payload) -> String {
        let mut prompt = String::from(self.agent_type.role());
        prompt.push_str("\n\n");

        for (key, value) in input {
            let rendered = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            prompt.push_str(&format!("## {}\n{}\n\n", key, rendered));
        }

        if let Some(max_tokens) = options.get("max_tokens").and_then(Value::as_u64) {
            prompt.push_str(&format!("Keep the answer under {} tokens.\n", max_tokens));
        }

        prompt.trim_end().to_string()
    }
}

#[async_trait]
impl Agent for SpecializedAgent {
    fn agent_type(&self) -> AgentType {
        self.agent_type
    }

    fn provider(&self) -> &ProviderId {
        &self.provider_id
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    async fn execute(
        &self,
        input: &Payload,
        options: &Payload,
        timeout: Duration,
    ) -> Result<AgentOutput> {
        let prompt = self.build_prompt(input, options);
        tracing::debug!(
            agent = %self.agent_type,
            provider = %self.provider_id,
            model = %self.model,
            prompt_chars = prompt.len(),
            "Sending prompt to provider"
        );

        let generation = self
            .provider
            .generate(&prompt, &self.model, timeout)
            .await?;

        let mut data = Payload::new();
        data.insert("response".to_string(), Value::String(generation.text));
        data.insert(
            "agent_type".to_string(),
            Value::String(self.agent_type.to_string()),
        );

        Ok(AgentOutput {
            data,
            token_usage: generation.usage,
            model_used: self.model.clone(),
        })
    }

    async fn health_check(&self) -> Result<()> {
        self.provider.health_check(&self.model).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::MockProvider;

    #[test]
    fn test_agent_type_parsing() {
        assert_eq!("CodeReview".parse::<AgentType>().unwrap(), AgentType::CodeReview);
        assert_eq!("code-review".parse::<AgentType>().unwrap(), AgentType::CodeReview);
        assert_eq!("code_review".parse::<AgentType>().unwrap(), AgentType::CodeReview);
        assert_eq!("FORK".parse::<AgentType>().unwrap(), AgentType::Fork);
        assert!("DoesNotExist".parse::<AgentType>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for agent_type in AgentType::ALL {
            let parsed: AgentType = agent_type.to_string().parse().unwrap();
            assert_eq!(parsed, agent_type);
        }
    }

    #[test]
    fn test_prompt_includes_role_and_input() {
        let agent = SpecializedAgent::new(
            AgentType::CodeReview,
            Arc::new(MockProvider::replying("ok")),
            "test-model",
            Duration::from_secs(5),
        );
        let mut input = Payload::new();
        input.insert("code".to_string(), Value::String("x=1".to_string()));
        let mut options = Payload::new();
        options.insert("max_tokens".to_string(), Value::from(200));

        let prompt = agent.build_prompt(&input, &options);
        assert!(prompt.starts_with("You are a code review agent."));
        assert!(prompt.contains("## code\nx=1"));
        assert!(prompt.contains("under 200 tokens"));
    }

    #[tokio::test]
    async fn test_execute_wraps_provider_text() {
        let agent = SpecializedAgent::new(
            AgentType::Testing,
            Arc::new(MockProvider::replying("write more tests").with_usage(10, 4)),
            "test-model",
            Duration::from_secs(5),
        );

        let output = agent
            .execute(&Payload::new(), &Payload::new(), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(output.data["response"], "write more tests");
        assert_eq!(output.data["agent_type"], "testing");
        assert_eq!(output.model_used, "test-model");
        assert_eq!(output.token_usage.unwrap().total_tokens, 14);
    }
}
