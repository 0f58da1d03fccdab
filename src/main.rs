//! grok-agents CLI entry point.

use anyhow::Result;
use clap::Parser;
use grok_agents::cli::{commands, Cli, Commands};
use grok_agents::config::Settings;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli.config.as_ref().map(PathBuf::from);
    let settings = Settings::load_from(config_path.as_ref())?;

    // Initialize logging
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("grok_agents={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Ensure data directory exists
    std::fs::create_dir_all(settings.data_dir())?;

    // Execute command
    match &cli.command {
        Commands::Serve {
            host,
            port,
            ephemeral,
        } => {
            commands::run_serve(host.clone(), *port, *ephemeral, settings).await?;
        }

        Commands::Agents => {
            commands::run_agents(&settings)?;
        }

        Commands::Run {
            agent_id,
            message,
            session,
            user,
            ephemeral,
        } => {
            commands::run_run(
                agent_id,
                message,
                session.clone(),
                user.clone(),
                *ephemeral,
                settings,
            )
            .await?;
        }

        Commands::Chat {
            agent_id,
            session,
            ephemeral,
        } => {
            commands::run_chat(agent_id, session.clone(), *ephemeral, settings).await?;
        }

        Commands::Sessions { agent_id, user } => {
            commands::run_sessions(agent_id, user.clone(), settings).await?;
        }

        Commands::Doctor => {
            let path = config_path.unwrap_or_else(Settings::default_config_path);
            commands::run_doctor(&settings, &path)?;
        }

        Commands::Config { action } => {
            commands::run_config(action, config_path, settings)?;
        }
    }

    Ok(())
}
