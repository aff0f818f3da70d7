use anyhow::Result;
use atelier::agent::Payload;
use atelier::cli::{Cli, Commands};
use atelier::config::AppConfig;
use atelier::orchestrator::{AgentOrchestrator, ExecutionRequest, ExecutionStatus};
use atelier::routing::{LoopPreventionRouter, prompt_for};
use clap::Parser;
use serde_json::{Value, json};
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("atelier=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::discover(cli.config.as_deref())?;

    match cli.command {
        Commands::Agents => {
            let orchestrator = AgentOrchestrator::from_config(&config)?;
            for agent in orchestrator.registry().list_all() {
                println!(
                    "{:<14} {:<8} {:<14} {}s",
                    agent.agent_type(),
                    agent.provider(),
                    agent.model(),
                    agent.default_timeout().as_secs()
                );
            }
        }

        Commands::Health => {
            let orchestrator = AgentOrchestrator::from_config(&config)?;
            let health = orchestrator.get_agent_health().await;
            println!("{}", serde_json::to_string_pretty(&health)?);
            if !health.overall_healthy {
                std::process::exit(1);
            }
        }

        Commands::Run { agent, inputs, timeout, max_tokens } => {
            let orchestrator = AgentOrchestrator::from_config(&config)?;

            let input: Payload = inputs
                .into_iter()
                .map(|(key, value)| (key, Value::String(value)))
                .collect();
            let mut options = Payload::new();
            if let Some(max_tokens) = max_tokens {
                options.insert("max_tokens".to_string(), Value::from(max_tokens));
            }

            let mut request = ExecutionRequest::new(agent, input).with_options(options);
            if let Some(secs) = timeout {
                request = request.with_timeout(Duration::from_secs(secs));
            }

            let result = orchestrator.execute_agent(request).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if result.status != ExecutionStatus::Completed {
                std::process::exit(1);
            }
        }

        Commands::Route { response, request } => {
            let router = LoopPreventionRouter::new(config.router.clone());
            let output = match router.should_route(&response, &request, &[]) {
                Some(decision) => json!({
                    "prompt": prompt_for(&decision, &request),
                    "decision": decision,
                }),
                None => json!({ "decision": null }),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
