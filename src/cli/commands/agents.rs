//! List the agent registry.

use super::load_registry;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Print every registered agent in playground order.
pub fn run_agents(settings: &Settings) -> Result<()> {
    let registry = load_registry(settings)?;

    Output::header(&format!("Agents ({})", registry.len()));
    println!();

    for agent in registry.iter() {
        Output::agent_info(
            &agent.name,
            &agent.agent_id,
            &agent.model.to_string(),
            &agent.tool_names(),
        );
        if let Some(description) = &agent.description {
            println!("      {}", Output::dim(description));
        }
    }

    println!();
    Output::kv("Storage", &settings.db_path().display().to_string());

    Ok(())
}
