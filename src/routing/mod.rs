//! Loop-prevention routing
//!
//! Looks at a finished response and the request that produced it, and
//! decides whether the work should go to a specialized agent next. Each
//! detected issue is fingerprinted; an issue that was already routed once is
//! not routed again, which keeps two agents from bouncing the same problem
//! between them forever.

mod dedup;
mod detectors;

pub use dedup::{BoundedHashStore, DedupStore, IssueHash};
pub use detectors::{Detection, detect};

use crate::agent::AgentType;
use crate::config::RouterConfig;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What kind of follow-up a response needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteCategory {
    Testing,
    Review,
    Deployment,
    Documentation,
    Clarification,
    Elaboration,
}

impl RouteCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteCategory::Testing => "testing",
            RouteCategory::Review => "review",
            RouteCategory::Deployment => "deployment",
            RouteCategory::Documentation => "documentation",
            RouteCategory::Clarification => "clarification",
            RouteCategory::Elaboration => "elaboration",
        }
    }

    /// Specialized agent for this category, if one exists. Categories without
    /// an agent are handled by the caller's default flow.
    pub fn agent_type(&self) -> Option<AgentType> {
        match self {
            RouteCategory::Testing => Some(AgentType::Testing),
            RouteCategory::Review => Some(AgentType::CodeReview),
            RouteCategory::Documentation => Some(AgentType::Documentation),
            RouteCategory::Deployment
            | RouteCategory::Clarification
            | RouteCategory::Elaboration => None,
        }
    }
}

impl std::fmt::Display for RouteCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// A recommendation to send the work on to another agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub category: RouteCategory,
    pub target_agent: Option<AgentType>,
    pub reason: String,
    pub priority: Priority,
}

/// Who produced a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One prior turn of the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
    /// Produced by an automatic re-route rather than by the user's request
    #[serde(default)]
    pub auto_routed: bool,
}

pub struct LoopPreventionRouter {
    config: RouterConfig,
    store: Arc<dyn DedupStore>,
}

impl LoopPreventionRouter {
    /// Router with the default full-clear store sized from `config`
    pub fn new(config: RouterConfig) -> Self {
        let store = Arc::new(BoundedHashStore::new(config.dedup_capacity));
        Self::with_store(config, store)
    }

    pub fn with_store(config: RouterConfig, store: Arc<dyn DedupStore>) -> Self {
        Self { config, store }
    }

    pub fn store(&self) -> &dyn DedupStore {
        self.store.as_ref()
    }

    /// Decide whether `ai_response` should be routed to a specialized agent.
    ///
    /// Returns `None` when no detector fires, when the same issue was already
    /// routed, or when the history ends in too many automatic routes.
    pub fn should_route(
        &self,
        ai_response: &str,
        user_request: &str,
        history: &[ConversationTurn],
    ) -> Option<RoutingDecision> {
        let chain = history.iter().rev().take_while(|t| t.auto_routed).count();
        if chain >= self.config.max_consecutive_routes {
            tracing::debug!(chain, "Routing chain limit reached");
            return None;
        }

        let detection = detect(ai_response, user_request, self.config.min_response_chars)?;

        let hash = IssueHash::compute(detection.reason, user_request, self.config.request_prefix_chars);
        if !self.store.insert_if_new(hash) {
            tracing::debug!(
                category = %detection.category,
                issue = %hash,
                "Issue already routed, preventing loop"
            );
            return None;
        }

        tracing::info!(
            category = %detection.category,
            priority = ?detection.priority,
            "Routing response"
        );
        Some(RoutingDecision {
            category: detection.category,
            target_agent: detection.category.agent_type(),
            reason: detection.reason.to_string(),
            priority: detection.priority,
        })
    }
}

/// Follow-up prompt for the routed agent
pub fn prompt_for(decision: &RoutingDecision, original_request: &str) -> String {
    let reason = &decision.reason;
    match decision.category {
        RouteCategory::Testing => format!(
            "Write tests for the work done on this request: \"{original_request}\". \
             Cover the main behavior and the edge cases. ({reason})"
        ),
        RouteCategory::Review => format!(
            "Review the solution produced for: \"{original_request}\". \
             Point out bugs, security problems and maintainability issues. ({reason})"
        ),
        RouteCategory::Deployment => format!(
            "Describe how to deploy the result of: \"{original_request}\". \
             Include configuration, rollout steps and how to roll back. ({reason})"
        ),
        RouteCategory::Documentation => format!(
            "Write documentation for the work done on: \"{original_request}\". \
             Explain usage, parameters and examples. ({reason})"
        ),
        RouteCategory::Clarification => format!(
            "The previous answer to \"{original_request}\" was uncertain. \
             Research the question, state what is known and what is not, \
             and give a definite recommendation. ({reason})"
        ),
        RouteCategory::Elaboration => format!(
            "The previous answer to \"{original_request}\" was too brief. \
             Give a complete, detailed answer. ({reason})"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> LoopPreventionRouter {
        LoopPreventionRouter::new(RouterConfig::default())
    }

    fn routed_turn() -> ConversationTurn {
        ConversationTurn {
            role: TurnRole::Assistant,
            content: "follow-up".to_string(),
            auto_routed: true,
        }
    }

    #[test]
    fn test_uncertain_response_routes_once() {
        let router = router();
        let decision = router
            .should_route("I am not sure, maybe this works", "fix my bug", &[])
            .unwrap();
        assert_eq!(decision.category, RouteCategory::Clarification);
        assert_eq!(decision.category.as_str(), "clarification");
        assert_eq!(decision.target_agent, None);
        assert_eq!(decision.priority, Priority::High);

        assert!(router
            .should_route("I am not sure, maybe this works", "fix my bug", &[])
            .is_none());
    }

    #[test]
    fn test_same_issue_different_wording_is_deduplicated() {
        let router = router();
        assert!(router.should_route("Maybe?", "fix my bug", &[]).is_some());
        // Different response, same detector reason and request prefix
        assert!(router.should_route("Hard to say really", "Fix  my bug", &[]).is_none());
        // Same detector, different request
        assert!(router.should_route("Maybe?", "fix my other bug", &[]).is_some());
    }

    #[test]
    fn test_decision_targets_specialized_agent() {
        let router = router();
        let decision = router
            .should_route(
                "Implemented the parser. You should add tests for the error paths before shipping.",
                "write a parser",
                &[],
            )
            .unwrap();
        assert_eq!(decision.category, RouteCategory::Testing);
        assert_eq!(decision.target_agent, Some(AgentType::Testing));
    }

    #[test]
    fn test_no_detector_no_route_and_no_store_entry() {
        let router = router();
        let response = "The function iterates over the list once and returns the accumulated sum.";
        assert!(router.should_route(response, "explain this", &[]).is_none());
        assert!(router.store().is_empty());
    }

    #[test]
    fn test_store_full_clear_allows_repeat() {
        let config = RouterConfig {
            dedup_capacity: 3,
            ..RouterConfig::default()
        };
        let router = LoopPreventionRouter::new(config);

        for n in 0..3 {
            assert!(router.should_route("Maybe", &format!("request {n}"), &[]).is_some());
        }
        assert_eq!(router.store().len(), 3);
        assert!(router.should_route("Maybe", "request 0", &[]).is_none());

        // Fourth distinct issue overflows the store and clears it
        assert!(router.should_route("Maybe", "request 3", &[]).is_some());
        assert!(router.store().is_empty());
        assert!(router.should_route("Maybe", "request 0", &[]).is_some());
    }

    #[test]
    fn test_injected_store_is_used() {
        let store = Arc::new(BoundedHashStore::new(10));
        let router = LoopPreventionRouter::with_store(RouterConfig::default(), store.clone());
        router.should_route("Maybe", "anything", &[]).unwrap();
        assert_eq!(store.len(), 1);
        store.clear();
        assert!(router.should_route("Maybe", "anything", &[]).is_some());
    }

    #[test]
    fn test_chain_of_auto_routes_stops_routing() {
        let router = router();
        let history = vec![routed_turn(), routed_turn(), routed_turn()];
        assert!(router.should_route("Maybe", "fix my bug", &history).is_none());
        // Nothing was recorded, so the issue can still route later
        assert!(router.store().is_empty());

        let mut broken_chain = history.clone();
        broken_chain.push(ConversationTurn {
            role: TurnRole::User,
            content: "still broken".to_string(),
            auto_routed: false,
        });
        assert!(router.should_route("Maybe", "fix my bug", &broken_chain).is_some());
    }

    #[test]
    fn test_prompt_templates() {
        let decision = RoutingDecision {
            category: RouteCategory::Clarification,
            target_agent: None,
            reason: "Response expresses uncertainty".to_string(),
            priority: Priority::High,
        };
        let prompt = prompt_for(&decision, "fix my bug");
        assert!(prompt.contains("\"fix my bug\""));
        assert!(prompt.contains("uncertain"));
        assert!(prompt.contains("(Response expresses uncertainty)"));

        let review = RoutingDecision {
            category: RouteCategory::Review,
            ..decision
        };
        assert!(prompt_for(&review, "x").starts_with("Review the solution"));
    }
}
