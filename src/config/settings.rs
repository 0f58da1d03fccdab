//! Configuration settings for grok-agents.

use crate::agent::AgentConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub model: ModelSettings,
    pub storage: StorageSettings,
    pub server: ServerSettings,
    pub agent: AgentSettings,
    pub tools: ToolSettings,
    /// Custom agents. An entry whose `agent_id` matches a built-in agent replaces it.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub agents: Vec<AgentConfig>,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.grok-agents".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// LLM provider type. Both speak the OpenAI chat completions protocol.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    /// xAI Grok models (default).
    #[default]
    Xai,
    /// OpenAI models.
    OpenAI,
}

impl ModelProvider {
    /// Base URL of the provider's API.
    pub fn default_api_base(&self) -> &'static str {
        match self {
            ModelProvider::Xai => "https://api.x.ai/v1",
            ModelProvider::OpenAI => "https://api.openai.com/v1",
        }
    }

    /// Environment variable holding the provider's API key.
    pub fn default_api_key_env(&self) -> &'static str {
        match self {
            ModelProvider::Xai => "XAI_API_KEY",
            ModelProvider::OpenAI => "OPENAI_API_KEY",
        }
    }
}

impl std::str::FromStr for ModelProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "xai" | "grok" => Ok(ModelProvider::Xai),
            "openai" => Ok(ModelProvider::OpenAI),
            _ => Err(format!("Unknown model provider: {}", s)),
        }
    }
}

impl std::fmt::Display for ModelProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelProvider::Xai => write!(f, "xai"),
            ModelProvider::OpenAI => write!(f, "openai"),
        }
    }
}

/// LLM connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Provider the `api_base` and `api_key_env` overrides apply to.
    pub provider: ModelProvider,
    /// Override for the provider's API base URL.
    pub api_base: Option<String>,
    /// Override for the environment variable holding the API key.
    pub api_key_env: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            provider: ModelProvider::Xai,
            api_base: None,
            api_key_env: None,
            timeout_secs: 300,
        }
    }
}

impl ModelSettings {
    /// API base URL for the given provider, honoring the override.
    pub fn api_base_for(&self, provider: ModelProvider) -> String {
        match &self.api_base {
            Some(base) if provider == self.provider => base.clone(),
            _ => provider.default_api_base().to_string(),
        }
    }

    /// API key environment variable for the given provider, honoring the override.
    pub fn api_key_env_for(&self, provider: ModelProvider) -> String {
        match &self.api_key_env {
            Some(var) if provider == self.provider => var.clone(),
            _ => provider.default_api_key_env().to_string(),
        }
    }
}

/// Conversation history storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Path to the SQLite database shared by all agents.
    pub db_file: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            db_file: "~/.grok-agents/xai_agents.db".to_string(),
        }
    }
}

/// Playground server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7777,
        }
    }
}

/// Agent runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Maximum number of model calls per run.
    pub max_tool_iterations: usize,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_tool_iterations: 10,
        }
    }
}

/// Tool plugin settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    /// HTTP timeout for tool requests in seconds.
    pub timeout_secs: u64,
    /// User agent sent to search and finance endpoints.
    pub user_agent: String,
    /// Preferred caption language for YouTube videos.
    pub captions_language: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36".to_string(),
            captions_language: "en".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::AgentsError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("grok-agents")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded SQLite database path.
    pub fn db_path(&self) -> PathBuf {
        Self::expand_path(&self.storage.db_file)
    }
}
