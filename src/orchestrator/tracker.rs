//! Execution records and their lifecycle
//!
//! `Pending -> Running -> {Completed | Failed | TimedOut}`, with
//! `Pending -> Failed` for requests rejected before dispatch. Terminal
//! transitions consume the tracker, so a finished result cannot be touched.

use crate::agent::AgentOutput;
use crate::provider::TokenUsage;
use crate::redact;
use crate::AtelierError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::{Duration, Instant};

/// Status of an execution (state machine)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    TimedOut,
}

impl ExecutionStatus {
    /// Check if the execution is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed | ExecutionStatus::Failed | ExecutionStatus::TimedOut
        )
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionStatus::Pending => write!(f, "pending"),
            ExecutionStatus::Running => write!(f, "running"),
            ExecutionStatus::Completed => write!(f, "completed"),
            ExecutionStatus::Failed => write!(f, "failed"),
            ExecutionStatus::TimedOut => write!(f, "timed_out"),
        }
    }
}

/// Outcome of one dispatch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub execution_id: String,
    /// Agent type as the caller named it
    pub agent_type: String,
    pub status: ExecutionStatus,
    pub output_data: Option<Map<String, Value>>,
    pub error_message: Option<String>,
    pub duration_seconds: f64,
    pub token_usage: Option<TokenUsage>,
    pub model_used: String,
    pub started_at: DateTime<Utc>,
}

impl ExecutionResult {
    /// Text response, when the agent produced one
    pub fn response_text(&self) -> Option<&str> {
        self.output_data
            .as_ref()
            .and_then(|data| data.get("response"))
            .and_then(Value::as_str)
    }
}

/// Generate a unique execution ID
pub fn generate_execution_id() -> String {
    let suffix: u32 = rand::random();
    format!("exec-{:x}-{:08x}", Utc::now().timestamp_millis(), suffix)
}

/// Drives a single `ExecutionResult` from creation to a terminal state
pub struct ExecutionTracker {
    result: ExecutionResult,
    started: Instant,
}

impl ExecutionTracker {
    /// Create a pending record and start the clock
    pub fn new(agent_type: &str) -> Self {
        Self {
            result: ExecutionResult {
                execution_id: generate_execution_id(),
                agent_type: agent_type.to_string(),
                status: ExecutionStatus::Pending,
                output_data: None,
                error_message: None,
                duration_seconds: 0.0,
                token_usage: None,
                model_used: String::new(),
                started_at: Utc::now(),
            },
            started: Instant::now(),
        }
    }

    pub fn execution_id(&self) -> &str {
        &self.result.execution_id
    }

    pub fn status(&self) -> ExecutionStatus {
        self.result.status
    }

    /// Pending -> Running, immediately before the provider call
    pub fn start_running(&mut self, model: &str) {
        if self.result.status != ExecutionStatus::Pending {
            tracing::warn!(
                execution_id = %self.result.execution_id,
                status = %self.result.status,
                "Ignoring start_running outside Pending"
            );
            return;
        }
        self.result.status = ExecutionStatus::Running;
        self.result.model_used = model.to_string();
    }

    /// Running -> Completed
    pub fn complete(mut self, output: AgentOutput) -> ExecutionResult {
        self.result.output_data = Some(output.data);
        self.result.token_usage = output.token_usage;
        self.result.model_used = output.model_used;
        self.finish(ExecutionStatus::Completed)
    }

    /// Pending/Running -> Failed, with a sanitized message
    pub fn fail(mut self, error: &AtelierError) -> ExecutionResult {
        self.result.error_message = Some(redact::sanitize(&error.to_string()));
        self.finish(ExecutionStatus::Failed)
    }

    /// Running -> TimedOut, naming the bound that was exceeded
    pub fn time_out(mut self, bound: Duration) -> ExecutionResult {
        self.result.error_message = Some(format!(
            "Execution exceeded timeout of {:.1}s",
            bound.as_secs_f64()
        ));
        self.finish(ExecutionStatus::TimedOut)
    }

    fn finish(mut self, status: ExecutionStatus) -> ExecutionResult {
        self.result.status = status;
        self.result.duration_seconds = self.started.elapsed().as_secs_f64();
        self.result
    }
}
