//! Collaborator hooks around dispatch
//!
//! Rate limiting runs before an agent is invoked, token accounting after a
//! completed execution. Both are optional; the orchestrator works without them.

mod rate_limit;
mod tokens;

pub use rate_limit::*;
pub use tokens::*;

use serde::{Deserialize, Serialize};

/// Who is asking, for rate limiting and usage accounting
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerContext {
    pub user_id: String,
    pub session_id: Option<String>,
}

impl CallerContext {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            session_id: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}
