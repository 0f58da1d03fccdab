//! Single-message run command.

use super::{find_agent, load_registry};
use crate::agent::Agent;
use crate::cli::preflight;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Send one message to an agent and print the answer.
pub async fn run_run(
    agent_id: &str,
    message: &str,
    session: Option<String>,
    user: Option<String>,
    ephemeral: bool,
    settings: Settings,
) -> Result<()> {
    let registry = load_registry(&settings)?;
    let config = find_agent(&registry, agent_id)?;

    if let Err(e) = preflight::check([config.as_ref()], &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'grok-agents doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let agent = Agent::from_settings(config.clone(), &settings, ephemeral)?;

    let spinner = Output::spinner(&format!("{} is thinking...", config.name));
    let result = agent
        .run(message, session.as_deref(), user.as_deref())
        .await;
    spinner.finish_and_clear();

    let response = result?;
    Output::agent_reply(&config.name, &response.content);
    Output::kv("Session", &response.session_id);

    Ok(())
}
