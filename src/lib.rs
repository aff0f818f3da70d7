//! Atelier: dispatch engine for specialized AI agents
//!
//! Each apprentice in the workshop handles one kind of work. The master hands
//! out pieces, keeps an eye on who is fit to work, and decides when a finished
//! piece should go to another apprentice for a second pass.

pub mod agent;
pub mod cli;
pub mod config;
pub mod hooks;
pub mod orchestrator;
pub mod provider;
pub mod redact;
pub mod routing;

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AtelierError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown agent type: {0}")]
    NotFound(String),

    #[error("Provider '{provider}' failed: {message}")]
    Provider { provider: String, message: String },

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, AtelierError>;
