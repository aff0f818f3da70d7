//! Provider backed by a locally installed model CLI
//!
//! The prompt goes in on stdin, the completion comes back on stdout. This is
//! how `claude -p`, `codex exec` and friends are driven non-interactively.

use super::{Generation, ProviderClient, ProviderId};
use crate::{AtelierError, Result};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Placeholder substituted with the agent's model in configured arguments
const MODEL_PLACEHOLDER: &str = "{model}";

/// Longest stderr excerpt carried into an error message
const MAX_STDERR_CHARS: usize = 500;

pub struct CommandProvider {
    id: ProviderId,
    /// Executable to spawn
    command: String,
    /// Arguments for a generation call; `{model}` is substituted
    args: Vec<String>,
    /// Arguments for the health probe (e.g. `--version`)
    health_args: Vec<String>,
}

impl CommandProvider {
    pub fn new(
        id: ProviderId,
        command: impl Into<String>,
        args: Vec<String>,
        health_args: Vec<String>,
    ) -> Self {
        Self {
            id,
            command: command.into(),
            args,
            health_args,
        }
    }

    fn render_args(&self, model: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace(MODEL_PLACEHOLDER, model))
            .collect()
    }

    fn provider_error(&self, message: impl Into<String>) -> AtelierError {
        AtelierError::Provider {
            provider: self.id.to_string(),
            message: message.into(),
        }
    }

    fn spawn_error(&self, err: std::io::Error) -> AtelierError {
        if err.kind() == std::io::ErrorKind::NotFound {
            self.provider_error(format!("command '{}' not found", self.command))
        } else {
            self.provider_error(format!("failed to spawn '{}': {}", self.command, err))
        }
    }
}

#[async_trait]
impl ProviderClient for CommandProvider {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    async fn generate(&self, prompt: &str, model: &str, timeout: Duration) -> Result<Generation> {
        let mut child = Command::new(&self.command)
            .args(self.render_args(model))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // An abandoned call must not leave the CLI running
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        // stdin is closed when the write future finishes and drops it
        let stdin = child.stdin.take();
        let write_prompt = async move {
            let Some(mut stdin) = stdin else {
                return Ok(());
            };
            match stdin.write_all(prompt.as_bytes()).await {
                // The CLI quit without reading everything; its exit status says why
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
                other => other,
            }
        };

        // Feed stdin while draining stdout/stderr so neither side blocks on a full pipe
        let run = async { tokio::join!(write_prompt, child.wait_with_output()) };
        let (written, waited) = match tokio::time::timeout(timeout, run).await {
            Ok(pair) => pair,
            Err(_) => return Err(AtelierError::Timeout(timeout)),
        };
        let output = waited.map_err(|e| self.provider_error(format!("wait failed: {}", e)))?;

        if !output.status.success() {
            let stderr = strip_ansi_escapes::strip_str(String::from_utf8_lossy(&output.stderr));
            let excerpt: String = stderr.trim().chars().take(MAX_STDERR_CHARS).collect();
            return Err(self.provider_error(format!(
                "exited with {}: {}",
                output.status.code().unwrap_or(-1),
                excerpt
            )));
        }

        written.map_err(|e| self.provider_error(format!("failed to write prompt: {}", e)))?;

        let text = strip_ansi_escapes::strip_str(String::from_utf8_lossy(&output.stdout));
        let text = text.trim();
        if text.is_empty() {
            return Err(self.provider_error("empty response"));
        }

        Ok(Generation {
            text: text.to_string(),
            usage: None,
        })
    }

    async fn health_check(&self, _model: &str) -> Result<()> {
        let status = Command::new(&self.command)
            .args(&self.health_args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if status.success() {
            Ok(())
        } else {
            Err(self.provider_error(format!(
                "health probe exited with {}",
                status.code().unwrap_or(-1)
            )))
        }
    }
}
