//! Playground server command.

use super::load_registry;
use crate::cli::preflight;
use crate::cli::Output;
use crate::config::Settings;
use crate::playground::{self, PlaygroundState};
use std::sync::Arc;

/// Run the playground HTTP server.
pub async fn run_serve(
    host: Option<String>,
    port: Option<u16>,
    ephemeral: bool,
    settings: Settings,
) -> anyhow::Result<()> {
    let registry = load_registry(&settings)?;

    if let Err(e) = preflight::check(registry.iter().map(|a| a.as_ref()), &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'grok-agents doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);

    let state = Arc::new(PlaygroundState::from_settings(registry, &settings, ephemeral)?);

    Output::header("grok-agents Playground");
    println!();
    Output::success(&format!("Listening on http://{}:{}", host, port));
    if ephemeral {
        Output::warning("Ephemeral mode: sessions are kept in memory only.");
    } else {
        Output::kv("Storage", &settings.db_path().display().to_string());
    }
    println!();
    println!("Agents:");
    for agent in state.registry().iter() {
        Output::kv(&agent.agent_id, &agent.name);
    }
    println!();
    println!("Endpoints:");
    Output::kv("Status", "GET  /v1/playground/status");
    Output::kv("Agents", "GET  /v1/playground/agent/get");
    Output::kv("Run", "POST /v1/playground/agent/run");
    Output::kv("Sessions", "POST /v1/playground/agent/sessions/all");
    Output::kv("Session", "POST /v1/playground/agent/sessions/{session_id}");
    Output::kv("Rename", "POST /v1/playground/agent/session/rename");
    Output::kv("Delete", "POST /v1/playground/agent/session/delete");
    println!();

    playground::serve(state, &host, port).await?;

    Ok(())
}
