//! Agent registry - the fixed AgentType -> Agent map built at startup

use super::{Agent, AgentType, SpecializedAgent};
use crate::config::AppConfig;
use crate::provider::{CommandProvider, ProviderClient, ProviderId};
use crate::{AtelierError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Immutable registry of configured agents.
///
/// Never mutated after `build()`, so concurrent readers need no locking.
pub struct AgentRegistry {
    /// Agents in registration order
    agents: Vec<Arc<dyn Agent>>,
    /// Index into `agents` by type
    index: HashMap<AgentType, usize>,
}

impl AgentRegistry {
    pub fn builder() -> AgentRegistryBuilder {
        AgentRegistryBuilder::default()
    }

    /// Build providers and agents from configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let mut providers: HashMap<&str, Arc<dyn ProviderClient>> = HashMap::new();
        for (name, provider) in &config.providers {
            providers.insert(
                name.as_str(),
                Arc::new(CommandProvider::new(
                    ProviderId::new(name.as_str()),
                    provider.command.clone(),
                    provider.args.clone(),
                    provider.health_args.clone(),
                )),
            );
        }

        let mut builder = Self::builder();
        for binding in &config.agents {
            let provider = providers.get(binding.provider.as_str()).ok_or_else(|| {
                AtelierError::Config(format!(
                    "agent '{}' uses unknown provider '{}'",
                    binding.agent_type, binding.provider
                ))
            })?;
            let timeout = binding
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or_else(|| config.execution_timeout());

            builder = builder.register(Arc::new(SpecializedAgent::new(
                binding.agent_type,
                Arc::clone(provider),
                binding.model.clone(),
                timeout,
            )))?;
        }

        Ok(builder.build())
    }

    /// Look up the agent for a type
    pub fn get(&self, agent_type: AgentType) -> Result<Arc<dyn Agent>> {
        self.index
            .get(&agent_type)
            .map(|&i| Arc::clone(&self.agents[i]))
            .ok_or_else(|| AtelierError::NotFound(agent_type.to_string()))
    }

    /// Parse a raw type name and look it up. Errors name the raw string.
    pub fn resolve(&self, raw: &str) -> Result<Arc<dyn Agent>> {
        let agent_type: AgentType = raw
            .parse()
            .map_err(|_| AtelierError::NotFound(raw.to_string()))?;
        self.get(agent_type)
            .map_err(|_| AtelierError::NotFound(raw.to_string()))
    }

    /// All agents, in registration order
    pub fn list_all(&self) -> &[Arc<dyn Agent>] {
        &self.agents
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[derive(Default)]
pub struct AgentRegistryBuilder {
    agents: Vec<Arc<dyn Agent>>,
    index: HashMap<AgentType, usize>,
}

impl AgentRegistryBuilder {
    /// Add an agent. A second agent for the same type is rejected.
    pub fn register(mut self, agent: Arc<dyn Agent>) -> Result<Self> {
        let agent_type = agent.agent_type();
        if self.index.contains_key(&agent_type) {
            return Err(AtelierError::Config(format!(
                "agent type '{}' registered twice",
                agent_type
            )));
        }
        tracing::debug!(
            agent = %agent_type,
            provider = %agent.provider(),
            model = agent.model(),
            "Registered agent"
        );
        self.index.insert(agent_type, self.agents.len());
        self.agents.push(agent);
        Ok(self)
    }

    pub fn build(self) -> AgentRegistry {
        AgentRegistry {
            agents: self.agents,
            index: self.index,
        }
    }
}
