//! Configuration module for grok-agents.
//!
//! Handles loading and managing application settings.

mod settings;

pub use settings::{
    AgentSettings, GeneralSettings, ModelProvider, ModelSettings, ServerSettings, Settings,
    StorageSettings, ToolSettings,
};
