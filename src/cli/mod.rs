//! CLI command definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "atelier")]
#[command(about = "Dispatch work to specialized AI agents", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to a config file (defaults to ~/.atelier/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List configured agents
    Agents,

    /// Probe every agent and report aggregate health
    Health,

    /// Run one agent and print the execution result
    Run {
        /// Agent type (research, code-review, testing, documentation,
        /// debugging, security, performance, fork)
        agent: String,

        /// Input field as key=value (repeatable)
        #[arg(short, long = "input", value_parser = parse_key_value)]
        inputs: Vec<(String, String)>,

        /// Timeout in seconds (defaults to the agent's configured timeout)
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Passed to the agent as the `max_tokens` option
        #[arg(long)]
        max_tokens: Option<u64>,
    },

    /// Check whether a response should be routed to another agent
    Route {
        /// The AI response to inspect
        #[arg(long)]
        response: String,

        /// The user request that produced it
        #[arg(long)]
        request: String,
    },
}

/// Parse `key=value`
pub fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .filter(|(key, _)| !key.trim().is_empty())
        .map(|(key, value)| (key.trim().to_string(), value.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))
}
