//! Per-agent health probes and their aggregate

use crate::agent::{Agent, AgentType};
use crate::redact;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Health of a single agent, recomputed on every request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub agent_type: AgentType,
    pub provider: String,
    pub model: String,
    pub healthy: bool,
    pub response_time_ms: f64,
    pub error: Option<String>,
}

impl HealthStatus {
    /// Status for an agent whose probe never reported back
    pub(crate) fn lost(agent_type: AgentType, provider: String, model: String, error: String) -> Self {
        Self {
            agent_type,
            provider,
            model,
            healthy: false,
            response_time_ms: 0.0,
            error: Some(error),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateHealth {
    pub overall_healthy: bool,
    pub healthy_count: usize,
    pub total_count: usize,
    pub per_agent: BTreeMap<AgentType, HealthStatus>,
}

impl AggregateHealth {
    pub fn from_statuses(statuses: impl IntoIterator<Item = HealthStatus>) -> Self {
        let per_agent: BTreeMap<AgentType, HealthStatus> = statuses
            .into_iter()
            .map(|status| (status.agent_type, status))
            .collect();
        let healthy_count = per_agent.values().filter(|s| s.healthy).count();
        let total_count = per_agent.len();

        Self {
            overall_healthy: healthy_count == total_count,
            healthy_count,
            total_count,
            per_agent,
        }
    }
}

/// Probe one agent under its own bound
pub(crate) async fn probe_agent(agent: Arc<dyn Agent>, bound: Duration) -> HealthStatus {
    let start = Instant::now();
    let outcome = tokio::time::timeout(bound, agent.health_check()).await;
    let response_time_ms = start.elapsed().as_secs_f64() * 1000.0;

    let error = match outcome {
        Ok(Ok(())) => None,
        Ok(Err(e)) => Some(redact::sanitize(&e.to_string())),
        Err(_) => Some(format!(
            "Health check timed out after {}ms",
            bound.as_millis()
        )),
    };

    if let Some(error) = &error {
        tracing::warn!(agent = %agent.agent_type(), "Agent unhealthy: {}", error);
    }

    HealthStatus {
        agent_type: agent.agent_type(),
        provider: agent.provider().to_string(),
        model: agent.model().to_string(),
        healthy: error.is_none(),
        response_time_ms,
        error,
    }
}
