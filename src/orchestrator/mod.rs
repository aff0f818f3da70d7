//! Dispatch service: the single entry point for running agents and probing
//! their health.
//!
//! Every outcome of `execute_agent` - bad request, unknown agent, provider
//! failure, timeout, even a panicking agent - comes back as a terminal
//! `ExecutionResult`. Nothing escapes to the caller as an error.

mod health;
mod tracker;

pub use health::{AggregateHealth, HealthStatus};
pub use tracker::{ExecutionResult, ExecutionStatus, ExecutionTracker, generate_execution_id};

use crate::agent::{AgentRegistry, Payload};
use crate::config::AppConfig;
use crate::hooks::{CallerContext, RateLimiter, TokenTracker};
use crate::{AtelierError, Result};
use futures::FutureExt;
use futures::future::join_all;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

/// Default bound for a single health probe
const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

/// Parameters for one dispatch
#[derive(Debug, Clone, Default)]
pub struct ExecutionRequest {
    /// Agent type name, e.g. `CodeReview` or `code-review`
    pub agent_type: String,
    pub input_data: Option<Payload>,
    /// Provider options such as `max_tokens`
    pub options: Payload,
    /// Overrides the agent's default timeout
    pub timeout: Option<Duration>,
    pub caller: Option<CallerContext>,
}

impl ExecutionRequest {
    pub fn new(agent_type: impl Into<String>, input_data: Payload) -> Self {
        Self {
            agent_type: agent_type.into(),
            input_data: Some(input_data),
            ..Self::default()
        }
    }

    pub fn with_options(mut self, options: Payload) -> Self {
        self.options = options;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_caller(mut self, caller: CallerContext) -> Self {
        self.caller = Some(caller);
        self
    }
}

/// Provider-agnostic dispatcher over an immutable agent registry
pub struct AgentOrchestrator {
    registry: Arc<AgentRegistry>,
    health_timeout: Duration,
    rate_limiter: Option<Arc<dyn RateLimiter>>,
    token_tracker: Option<Arc<dyn TokenTracker>>,
}

impl AgentOrchestrator {
    pub fn new(registry: AgentRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            health_timeout: DEFAULT_HEALTH_TIMEOUT,
            rate_limiter: None,
            token_tracker: None,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let registry = AgentRegistry::from_config(config)?;
        Ok(Self::new(registry).with_health_timeout(config.health_check_timeout()))
    }

    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    pub fn with_rate_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    pub fn with_token_tracker(mut self, tracker: Arc<dyn TokenTracker>) -> Self {
        self.token_tracker = Some(tracker);
        self
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    /// Dispatch one request and return its terminal result. No retries.
    pub async fn execute_agent(&self, request: ExecutionRequest) -> ExecutionResult {
        let mut tracker = ExecutionTracker::new(&request.agent_type);
        let requested = request.agent_type.trim();

        if requested.is_empty() {
            return tracker.fail(&AtelierError::Validation(
                "agent type must not be empty".to_string(),
            ));
        }
        let Some(input) = request.input_data.as_ref() else {
            return tracker.fail(&AtelierError::Validation(
                "input data is required".to_string(),
            ));
        };

        let agent = match self.registry.resolve(requested) {
            Ok(agent) => agent,
            Err(e) => {
                tracing::warn!(execution_id = %tracker.execution_id(), "{}", e);
                return tracker.fail(&e);
            }
        };

        if let (Some(limiter), Some(caller)) = (&self.rate_limiter, &request.caller) {
            if let Err(e) = limiter.check(&caller.user_id, agent.agent_type().as_str()) {
                tracing::warn!(
                    execution_id = %tracker.execution_id(),
                    user = %caller.user_id,
                    "{}",
                    e
                );
                return tracker.fail(&e);
            }
        }

        let bound = request.timeout.unwrap_or_else(|| agent.default_timeout());
        tracker.start_running(agent.model());
        tracing::info!(
            execution_id = %tracker.execution_id(),
            agent = %agent.agent_type(),
            provider = %agent.provider(),
            model = agent.model(),
            timeout_secs = bound.as_secs_f64(),
            "Dispatching"
        );

        // Race the agent against the clock. On expiry the agent future is
        // dropped and never polled again.
        let call = AssertUnwindSafe(agent.execute(input, &request.options, bound)).catch_unwind();
        let result = match tokio::time::timeout(bound, call).await {
            Ok(Ok(Ok(output))) => tracker.complete(output),
            Ok(Ok(Err(AtelierError::Timeout(_)))) | Err(_) => tracker.time_out(bound),
            Ok(Ok(Err(e))) => tracker.fail(&e),
            Ok(Err(_panic)) => tracker.fail(&AtelierError::Provider {
                provider: agent.provider().to_string(),
                message: "agent panicked during execution".to_string(),
            }),
        };

        match result.status {
            ExecutionStatus::Completed => tracing::info!(
                execution_id = %result.execution_id,
                duration_secs = result.duration_seconds,
                "Execution completed"
            ),
            status => tracing::warn!(
                execution_id = %result.execution_id,
                %status,
                duration_secs = result.duration_seconds,
                error = result.error_message.as_deref().unwrap_or_default(),
                "Execution did not complete"
            ),
        }

        self.record_usage(request.caller.as_ref(), &result);
        result
    }

    /// Run independent requests concurrently; results keep request order.
    pub async fn execute_many(&self, requests: Vec<ExecutionRequest>) -> Vec<ExecutionResult> {
        join_all(requests.into_iter().map(|r| self.execute_agent(r))).await
    }

    /// Probe every registered agent concurrently. Each probe has its own
    /// timeout, so a hanging agent only marks itself unhealthy.
    pub async fn get_agent_health(&self) -> AggregateHealth {
        let probes: Vec<_> = self
            .registry
            .list_all()
            .iter()
            .map(|agent| {
                let task = tokio::spawn(health::probe_agent(Arc::clone(agent), self.health_timeout));
                (Arc::clone(agent), task)
            })
            .collect();

        let mut statuses = Vec::with_capacity(probes.len());
        for (agent, task) in probes {
            let status = task.await.unwrap_or_else(|e| {
                HealthStatus::lost(
                    agent.agent_type(),
                    agent.provider().to_string(),
                    agent.model().to_string(),
                    format!("health probe aborted: {}", e),
                )
            });
            statuses.push(status);
        }

        let aggregate = AggregateHealth::from_statuses(statuses);
        tracing::info!(
            healthy = aggregate.healthy_count,
            total = aggregate.total_count,
            "Agent health collected"
        );
        aggregate
    }

    fn record_usage(&self, caller: Option<&CallerContext>, result: &ExecutionResult) {
        if result.status != ExecutionStatus::Completed {
            return;
        }
        let (Some(tracker), Some(usage)) = (&self.token_tracker, &result.token_usage) else {
            return;
        };
        if let Some(session_id) = caller.and_then(|c| c.session_id.as_deref()) {
            tracker.record(session_id, usage);
        }
    }
}
