//! grok-agents - Preconfigured tool-using agents on xAI Grok
//!
//! A registry of conversational agents served through a playground HTTP API.
//!
//! # Overview
//!
//! Each agent is a declarative bundle: name, role, description, model,
//! tools, instructions, a storage table and feature flags. The built-in
//! registry holds six agents:
//! - Finance (Yahoo Finance prices, recommendations, company info and news)
//! - YouTube (video metadata, captions and timestamps)
//! - Web (DuckDuckGo search and news)
//! - Joke, Weather and CEO (instructions only)
//!
//! # Architecture
//!
//! - `config` - Configuration management
//! - `agent` - Agent definitions, registry, prompt assembly and run loop
//! - `llm` - OpenAI-compatible client bound to xAI
//! - `tools` - DuckDuckGo, Yahoo Finance and YouTube tool plugins
//! - `storage` - Per-agent session tables (SQLite or in-memory)
//! - `playground` - HTTP application serving the registry
//!
//! # Example
//!
//! ```rust,no_run
//! use grok_agents::agent::AgentRegistry;
//! use grok_agents::config::Settings;
//! use grok_agents::playground::{self, PlaygroundState};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let registry = AgentRegistry::builtin()?.with_overrides(settings.agents.clone())?;
//!
//!     let state = Arc::new(PlaygroundState::from_settings(registry, &settings, false)?);
//!     playground::serve(state, "127.0.0.1", 7777).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod playground;
pub mod storage;
pub mod tools;

pub use error::{AgentsError, Result};
