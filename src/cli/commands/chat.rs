//! Interactive chat command.

use super::{find_agent, load_registry};
use crate::agent::Agent;
use crate::cli::preflight;
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};

/// Run an interactive chat with one agent.
///
/// Every message is a run in the same session, so the agent's history
/// settings decide how much of the conversation it sees.
pub async fn run_chat(
    agent_id: &str,
    session: Option<String>,
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
    let mut session_id = session;

    println!("\n{}", style(&config.name).bold().cyan());
    if let Some(description) = &config.description {
        println!("{}", Output::dim(description));
    }
    println!(
        "{}\n",
        style("Type your messages, or 'exit' to quit. Use 'new' to start a new session.").dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("new") || input.eq_ignore_ascii_case("clear") {
            session_id = None;
            Output::info("Started a new session.");
            continue;
        }

        let spinner = Output::spinner("Thinking...");
        let result = agent.run(input, session_id.as_deref(), None).await;
        spinner.finish_and_clear();

        match result {
            Ok(response) => {
                session_id = Some(response.session_id);
                Output::agent_reply(&config.name, &response.content);
            }
            Err(e) => {
                Output::error(&format!("Error: {}", e));
            }
        }
    }

    if let Some(id) = session_id {
        Output::kv("Session", &id);
    }

    Ok(())
}
