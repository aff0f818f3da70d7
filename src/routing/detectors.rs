//! Heuristic detectors that flag a response for re-routing
//!
//! Detectors run in a fixed order and the first match wins, so an earlier
//! detector takes precedence when several would fire.

use super::{Priority, RouteCategory};

/// A detector hit: which category, why, and how urgent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub category: RouteCategory,
    pub reason: &'static str,
    pub priority: Priority,
}

/// Keyword detector over the lowercased response and request
struct KeywordDetector {
    category: RouteCategory,
    reason: &'static str,
    priority: Priority,
    response_keywords: &'static [&'static str],
    request_keywords: &'static [&'static str],
}

impl KeywordDetector {
    fn matches(&self, response: &str, request: &str) -> bool {
        self.response_keywords.iter().any(|k| response.contains(k))
            || self.request_keywords.iter().any(|k| request.contains(k))
    }
}

/// Keyword detectors in precedence order. The length check runs after them.
static KEYWORD_DETECTORS: [KeywordDetector; 5] = [
    KeywordDetector {
        category: RouteCategory::Testing,
        reason: "Response suggests the change needs tests",
        priority: Priority::Medium,
        response_keywords: &[
            "add tests",
            "write tests",
            "unit test",
            "test coverage",
            "untested",
            "should be tested",
            "needs testing",
        ],
        request_keywords: &["write tests", "add tests", "test this", "unit test"],
    },
    KeywordDetector {
        category: RouteCategory::Review,
        reason: "Response suggests the code needs review",
        priority: Priority::High,
        response_keywords: &[
            "code review",
            "should be reviewed",
            "needs review",
            "security issue",
            "vulnerab",
            "code smell",
        ],
        request_keywords: &["review my", "review this", "audit"],
    },
    KeywordDetector {
        category: RouteCategory::Deployment,
        reason: "Response involves deployment concerns",
        priority: Priority::Medium,
        response_keywords: &["deploy", "ci/cd", "pipeline config", "dockerfile", "kubernetes"],
        request_keywords: &["deploy", "release to", "ship it"],
    },
    KeywordDetector {
        category: RouteCategory::Documentation,
        reason: "Response suggests documentation is missing",
        priority: Priority::Low,
        response_keywords: &[
            "needs documentation",
            "missing documentation",
            "docstring",
            "readme",
            "undocumented",
        ],
        request_keywords: &["document this", "write docs", "readme"],
    },
    KeywordDetector {
        category: RouteCategory::Clarification,
        reason: "Response expresses uncertainty",
        priority: Priority::High,
        response_keywords: &[
            "not sure",
            "not certain",
            "i'm unsure",
            "maybe",
            "might not",
            "unclear",
            "i don't know",
            "hard to say",
        ],
        request_keywords: &[],
    },
];

const TOO_SHORT_REASON: &str = "Response is too short to be complete";

/// Run all detectors in order; `None` if nothing fires
pub fn detect(ai_response: &str, user_request: &str, min_response_chars: usize) -> Option<Detection> {
    let response = ai_response.to_lowercase();
    let request = user_request.to_lowercase();

    if let Some(hit) = KEYWORD_DETECTORS
        .iter()
        .find(|d| d.matches(&response, &request))
    {
        return Some(Detection {
            category: hit.category,
            reason: hit.reason,
            priority: hit.priority,
        });
    }

    (ai_response.trim().chars().count() < min_response_chars).then_some(Detection {
        category: RouteCategory::Elaboration,
        reason: TOO_SHORT_REASON,
        priority: Priority::Low,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG_NEUTRAL: &str =
        "The function iterates over the list once and returns the accumulated sum of all values.";

    #[test]
    fn test_uncertainty_detected() {
        let hit = detect("I am not sure, maybe this works", "fix my bug", 50).unwrap();
        assert_eq!(hit.category, RouteCategory::Clarification);
        assert_eq!(hit.priority, Priority::High);
    }

    #[test]
    fn test_earlier_detector_wins() {
        // Mentions both tests and documentation; testing comes first
        let hit = detect(
            "You should add tests and a docstring for this function before merging it.",
            "refactor",
            50,
        )
        .unwrap();
        assert_eq!(hit.category, RouteCategory::Testing);

        // Uncertain but also about deployment; deployment comes first
        let hit = detect("Maybe deploy it on Friday", "help", 50).unwrap();
        assert_eq!(hit.category, RouteCategory::Deployment);
    }

    #[test]
    fn test_request_keywords_trigger() {
        let hit = detect(LONG_NEUTRAL, "Please review this module", 50).unwrap();
        assert_eq!(hit.category, RouteCategory::Review);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let hit = detect("See the README for setup steps that apply to this project.", "x", 50).unwrap();
        assert_eq!(hit.category, RouteCategory::Documentation);
    }

    #[test]
    fn test_short_response_detected_last() {
        let hit = detect("Done.", "fix my bug", 50).unwrap();
        assert_eq!(hit.category, RouteCategory::Elaboration);
        assert_eq!(hit.reason, TOO_SHORT_REASON);
    }

    #[test]
    fn test_neutral_response_not_routed() {
        assert!(detect(LONG_NEUTRAL, "explain this function", 50).is_none());
    }
}
