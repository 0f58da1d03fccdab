//! CLI module for grok-agents.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// grok-agents - Preconfigured tool-using agents on xAI Grok
///
/// Serves a registry of agents (web search, finance, YouTube, jokes, weather,
/// executive advice) through a playground HTTP API, or runs them from the terminal.
#[derive(Parser, Debug)]
#[command(name = "grok-agents")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "GROK_AGENTS_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the playground server
    Serve {
        /// Host to bind to (defaults to the configured host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to the configured port, 7777)
        #[arg(short, long)]
        port: Option<u16>,

        /// Keep sessions in memory instead of the SQLite file
        #[arg(long)]
        ephemeral: bool,
    },

    /// List the registered agents
    Agents,

    /// Send a single message to an agent
    Run {
        /// Agent identifier (e.g., web-agent)
        agent_id: String,

        /// The message to send
        message: String,

        /// Continue an existing session
        #[arg(short, long)]
        session: Option<String>,

        /// User the session belongs to
        #[arg(short, long)]
        user: Option<String>,

        /// Keep the session in memory instead of the SQLite file
        #[arg(long)]
        ephemeral: bool,
    },

    /// Start an interactive chat with an agent
    Chat {
        /// Agent identifier (e.g., finance-agent)
        agent_id: String,

        /// Continue an existing session
        #[arg(short, long)]
        session: Option<String>,

        /// Keep the session in memory instead of the SQLite file
        #[arg(long)]
        ephemeral: bool,
    },

    /// List stored sessions of an agent
    Sessions {
        /// Agent identifier
        agent_id: String,

        /// Only show sessions of this user
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "grok-agents",
            "-vv",
            "run",
            "joke-agent",
            "Tell me a joke",
            "--session",
            "abc",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Run {
                agent_id,
                message,
                session,
                user,
                ephemeral,
            } => {
                assert_eq!(agent_id, "joke-agent");
                assert_eq!(message, "Tell me a joke");
                assert_eq!(session.as_deref(), Some("abc"));
                assert!(user.is_none());
                assert!(!ephemeral);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_serve_defaults() {
        let cli = Cli::try_parse_from(["grok-agents", "serve", "--ephemeral"]).unwrap();
        match cli.command {
            Commands::Serve {
                host,
                port,
                ephemeral,
            } => {
                assert!(host.is_none());
                assert!(port.is_none());
                assert!(ephemeral);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_config_path() {
        let cli = Cli::try_parse_from(["grok-agents", "config", "path"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Path
            }
        ));
    }
}
