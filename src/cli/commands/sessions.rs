//! List stored sessions of an agent.

use super::{find_agent, load_registry};
use crate::cli::Output;
use crate::config::Settings;
use crate::storage::{AgentStorage, SqliteAgentStorage};
use anyhow::Result;

/// Print the sessions in an agent's table, newest first.
pub async fn run_sessions(agent_id: &str, user: Option<String>, settings: Settings) -> Result<()> {
    let registry = load_registry(&settings)?;
    let config = find_agent(&registry, agent_id)?;

    let db_path = settings.db_path();
    if !db_path.exists() {
        Output::info("No sessions yet. Start one with: grok-agents chat <agent_id>");
        return Ok(());
    }

    let storage = SqliteAgentStorage::new(&db_path, &config.storage.table_name)?;
    let sessions = storage.get_all_sessions(user.as_deref()).await?;

    if sessions.is_empty() {
        Output::info(&format!("No sessions stored for {}.", config.name));
        return Ok(());
    }

    Output::header(&format!("{} sessions ({})", config.name, sessions.len()));
    println!();

    for session in &sessions {
        Output::session_info(
            &session.title(),
            &session.session_id,
            session.runs.len(),
            &session.updated_at.format("%Y-%m-%d %H:%M").to_string(),
        );
    }

    Ok(())
}
