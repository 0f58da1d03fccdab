//! LLM client configuration for OpenAI-compatible providers (xAI by default).

use crate::config::{ModelProvider, ModelSettings};
use crate::error::{AgentsError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Client type shared by every agent.
pub type LlmClient = Client<OpenAIConfig>;

/// Create a client for `provider`, reading the API key from the configured
/// environment variable.
pub fn create_client(provider: ModelProvider, settings: &ModelSettings) -> Result<LlmClient> {
    let key_env = settings.api_key_env_for(provider);
    let api_key = match std::env::var(&key_env) {
        Ok(key) if !key.is_empty() => key,
        _ => {
            return Err(AgentsError::Config(format!(
                "{} not set. Set it with: export {}='...'",
                key_env, key_env
            )))
        }
    };

    create_client_with_key(provider, settings, &api_key)
}

/// Create a client with an explicit API key.
pub fn create_client_with_key(
    provider: ModelProvider,
    settings: &ModelSettings,
    api_key: &str,
) -> Result<LlmClient> {
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .build()?;

    let config = OpenAIConfig::new()
        .with_api_base(settings.api_base_for(provider))
        .with_api_key(api_key);

    Ok(Client::with_config(config).with_http_client(http_client))
}
