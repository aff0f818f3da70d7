//! Atelier configuration.
//!
//! Read from `~/.atelier/config.toml` (or an explicit path). Every field has a
//! default, so a partial file only overrides what it names.

use crate::agent::AgentType;
use crate::{AtelierError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Directory name for atelier state within the home directory
const CONFIG_DIR: &str = ".atelier";
const CONFIG_FILE: &str = "config.toml";

/// A model CLI the dispatcher can drive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub command: String,
    /// Generation arguments; `{model}` is replaced with the agent's model
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_health_args")]
    pub health_args: Vec<String>,
}

fn default_health_args() -> Vec<String> {
    vec!["--version".to_string()]
}

/// Binds one agent type to a provider/model pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentBinding {
    pub agent_type: AgentType,
    pub provider: String,
    pub model: String,
    /// Overrides `execution_timeout_secs` for this agent
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Loop-prevention router settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Fingerprints kept before the dedup store is cleared
    pub dedup_capacity: usize,
    /// Characters of the user request folded into a fingerprint
    pub request_prefix_chars: usize,
    /// Responses shorter than this (in characters) ask for elaboration
    pub min_response_chars: usize,
    /// Trailing auto-routed turns after which routing stops
    pub max_consecutive_routes: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            dedup_capacity: 100,
            request_prefix_chars: 100,
            min_response_chars: 50,
            max_consecutive_routes: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub execution_timeout_secs: u64,
    pub health_check_timeout_secs: u64,
    pub router: RouterConfig,
    pub providers: BTreeMap<String, ProviderConfig>,
    pub agents: Vec<AgentBinding>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let mut providers = BTreeMap::new();
        providers.insert(
            "claude".to_string(),
            ProviderConfig {
                command: "claude".to_string(),
                args: vec!["-p".into(), "--model".into(), "{model}".into()],
                health_args: default_health_args(),
            },
        );
        providers.insert(
            "codex".to_string(),
            ProviderConfig {
                command: "codex".to_string(),
                args: vec!["exec".into(), "--model".into(), "{model}".into(), "-".into()],
                health_args: default_health_args(),
            },
        );

        let bind = |agent_type, provider: &str, model: &str| AgentBinding {
            agent_type,
            provider: provider.to_string(),
            model: model.to_string(),
            timeout_secs: None,
        };

        Self {
            execution_timeout_secs: 120,
            health_check_timeout_secs: 5,
            router: RouterConfig::default(),
            providers,
            agents: vec![
                bind(AgentType::Research, "claude", "sonnet"),
                bind(AgentType::CodeReview, "claude", "opus"),
                bind(AgentType::Testing, "codex", "gpt-5-codex"),
                bind(AgentType::Documentation, "claude", "haiku"),
                bind(AgentType::Debugging, "codex", "gpt-5-codex"),
                bind(AgentType::Security, "claude", "opus"),
                bind(AgentType::Performance, "codex", "gpt-5-codex"),
                bind(AgentType::Fork, "claude", "sonnet"),
            ],
        }
    }
}

impl AppConfig {
    /// Load from an explicit TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&raw)?;
        config.validate()?;
        tracing::debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Load `explicit` if given, else `~/.atelier/config.toml` if it exists,
    /// else defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.execution_timeout_secs == 0 {
            return Err(AtelierError::Config(
                "execution_timeout_secs must be positive".to_string(),
            ));
        }
        if self.health_check_timeout_secs == 0 {
            return Err(AtelierError::Config(
                "health_check_timeout_secs must be positive".to_string(),
            ));
        }
        if self.router.dedup_capacity == 0 {
            return Err(AtelierError::Config(
                "router.dedup_capacity must be positive".to_string(),
            ));
        }
        for binding in &self.agents {
            if !self.providers.contains_key(&binding.provider) {
                return Err(AtelierError::Config(format!(
                    "agent '{}' uses unknown provider '{}'",
                    binding.agent_type, binding.provider
                )));
            }
        }
        Ok(())
    }

    pub fn execution_timeout(&self) -> Duration {
        Duration::from_secs(self.execution_timeout_secs)
    }

    pub fn health_check_timeout(&self) -> Duration {
        Duration::from_secs(self.health_check_timeout_secs)
    }
}

/// `~/.atelier/config.toml`, if a home directory can be determined
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_bind_every_agent_type() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        for agent_type in AgentType::ALL {
            assert!(config.agents.iter().any(|b| b.agent_type == agent_type));
        }
        assert_eq!(config.router.dedup_capacity, 100);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
execution_timeout_secs = 30

[router]
dedup_capacity = 10
"#
        )
        .unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.execution_timeout(), Duration::from_secs(30));
        assert_eq!(config.router.dedup_capacity, 10);
        assert_eq!(config.router.request_prefix_chars, 100);
        assert_eq!(config.health_check_timeout_secs, 5);
        assert_eq!(config.agents.len(), 8);
    }

    #[test]
    fn test_custom_agents_and_providers() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[providers.local]
command = "llm"
args = ["-m", "{{model}}"]

[[agents]]
agent_type = "security"
provider = "local"
model = "llama3"
timeout_secs = 45
"#
        )
        .unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.agents.len(), 1);
        assert_eq!(config.agents[0].agent_type, AgentType::Security);
        assert_eq!(config.agents[0].timeout_secs, Some(45));
        assert_eq!(config.providers["local"].args, vec!["-m", "{model}"]);
        assert_eq!(config.providers["local"].health_args, vec!["--version"]);
    }

    #[test]
    fn test_agent_type_spellings_in_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[[agents]]
agent_type = "CodeReview"
provider = "claude"
model = "opus"

[[agents]]
agent_type = "code_review"
provider = "claude"
model = "sonnet"

[[agents]]
agent_type = "Debugging"
provider = "codex"
model = "gpt-5-codex"
"#
        )
        .unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.agents[0].agent_type, AgentType::CodeReview);
        assert_eq!(config.agents[1].agent_type, AgentType::CodeReview);
        assert_eq!(config.agents[2].agent_type, AgentType::Debugging);
    }

    #[test]
    fn test_unknown_agent_type_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[[agents]]
agent_type = "astrology"
provider = "claude"
model = "opus"
"#
        )
        .unwrap();

        let err = AppConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, AtelierError::ConfigParse(_)));
        assert!(err.to_string().contains("astrology"));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[[agents]]
agent_type = "fork"
provider = "nowhere"
model = "m"
"#
        )
        .unwrap();

        let err = AppConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, AtelierError::Config(_)));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = AppConfig {
            execution_timeout_secs: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
