//! Pre-flight checks before talking to the model.
//!
//! Validates that every API key the selected agents need is available
//! before starting a server or a run that would otherwise fail midway.

use crate::agent::AgentConfig;
use crate::config::{ModelProvider, Settings};
use crate::error::{AgentsError, Result};
use crate::tools::Toolkit;
use std::process::Command;
use tracing::warn;

/// Check the agents about to run.
///
/// A missing API key is an error; a missing `yt-dlp` only warns since
/// YouTube metadata still works without it.
pub fn check<'a, I>(agents: I, settings: &Settings) -> Result<()>
where
    I: IntoIterator<Item = &'a AgentConfig>,
{
    let mut providers: Vec<ModelProvider> = Vec::new();
    let mut needs_ytdlp = false;

    for agent in agents {
        if !providers.contains(&agent.model.provider) {
            providers.push(agent.model.provider);
        }
        needs_ytdlp |= agent.tools.iter().any(|t| matches!(t, Toolkit::YouTube));
    }

    for provider in providers {
        check_api_key(&settings.model.api_key_env_for(provider))?;
    }

    if needs_ytdlp {
        if let Err(e) = check_tool("yt-dlp") {
            warn!("{}; YouTube captions will be unavailable", e);
        }
    }

    Ok(())
}

/// Check if an API key environment variable is set.
fn check_api_key(var: &str) -> Result<()> {
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(()),
        Ok(_) => Err(AgentsError::Config(format!(
            "{} is empty. Set it with: export {}='xai-...'",
            var, var
        ))),
        Err(_) => Err(AgentsError::Config(format!(
            "{} not set. Set it with: export {}='xai-...'",
            var, var
        ))),
    }
}

/// Check if an external tool is available.
pub fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg("--version").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(AgentsError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(AgentsError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(AgentsError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
