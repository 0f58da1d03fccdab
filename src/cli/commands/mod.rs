//! CLI command implementations.

mod agents;
mod chat;
mod config;
mod doctor;
mod run;
mod serve;
mod sessions;

pub use agents::run_agents;
pub use chat::run_chat;
pub use config::run_config;
pub use doctor::run_doctor;
pub use run::run_run;
pub use serve::run_serve;
pub use sessions::run_sessions;

use crate::agent::{AgentConfig, AgentRegistry};
use crate::config::Settings;
use crate::error::{AgentsError, Result};
use std::sync::Arc;

/// Built-in agents with the configured overrides applied.
fn load_registry(settings: &Settings) -> Result<AgentRegistry> {
    AgentRegistry::builtin()?.with_overrides(settings.agents.clone())
}

/// Look up one agent, listing the known ids when it is missing.
fn find_agent(registry: &AgentRegistry, agent_id: &str) -> Result<Arc<AgentConfig>> {
    registry.get(agent_id).ok_or_else(|| {
        AgentsError::AgentNotFound(format!(
            "{} (available: {})",
            agent_id,
            registry.ids().join(", ")
        ))
    })
}
