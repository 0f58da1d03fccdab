//! Declarative agent configuration.

use crate::config::ModelProvider;
use crate::tools::Toolkit;
use serde::{Deserialize, Serialize};

/// Model an agent runs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelRef {
    #[serde(default)]
    pub provider: ModelProvider,
    pub id: String,
}

impl ModelRef {
    /// An xAI model reference.
    pub fn xai(id: &str) -> Self {
        Self {
            provider: ModelProvider::Xai,
            id: id.to_string(),
        }
    }
}

impl Default for ModelRef {
    fn default() -> Self {
        Self::xai("grok-beta")
    }
}

impl std::fmt::Display for ModelRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.provider, self.id)
    }
}

/// Persistence handle: the table in the shared store holding this agent's sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRef {
    pub table_name: String,
}

/// Configuration of a single agent.
///
/// Constructed once at startup and never mutated; the runner and the
/// playground share it behind an `Arc`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub name: String,
    #[serde(default)]
    pub role: String,
    pub agent_id: String,
    #[serde(default)]
    pub model: ModelRef,
    #[serde(default)]
    pub tools: Vec<Toolkit>,
    #[serde(default)]
    pub description: Option<String>,
    pub instructions: Vec<String>,
    pub storage: StorageRef,
    /// Prefix responses with the tool calls made while producing them.
    #[serde(default)]
    pub show_tool_calls: bool,
    /// Replay previous runs of the session as chat history.
    #[serde(default)]
    pub add_history_to_messages: bool,
    /// Number of previous runs replayed when history is enabled.
    #[serde(default = "default_num_history_responses")]
    pub num_history_responses: usize,
    #[serde(default)]
    pub add_name_to_instructions: bool,
    #[serde(default)]
    pub add_datetime_to_instructions: bool,
    #[serde(default)]
    pub markdown: bool,
}

fn default_num_history_responses() -> usize {
    3
}

impl AgentConfig {
    /// Create a configuration with no tools, no instructions and all flags off.
    pub fn new(name: &str, agent_id: &str, table_name: &str) -> Self {
        Self {
            name: name.to_string(),
            role: String::new(),
            agent_id: agent_id.to_string(),
            model: ModelRef::default(),
            tools: Vec::new(),
            description: None,
            instructions: Vec::new(),
            storage: StorageRef {
                table_name: table_name.to_string(),
            },
            show_tool_calls: false,
            add_history_to_messages: false,
            num_history_responses: default_num_history_responses(),
            add_name_to_instructions: false,
            add_datetime_to_instructions: false,
            markdown: false,
        }
    }

    pub fn with_role(mut self, role: &str) -> Self {
        self.role = role.to_string();
        self
    }

    pub fn with_model(mut self, model: ModelRef) -> Self {
        self.model = model;
        self
    }

    pub fn with_tools(mut self, tools: Vec<Toolkit>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    /// Append instructions to the existing list.
    pub fn with_instructions<I, S>(mut self, instructions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.instructions
            .extend(instructions.into_iter().map(Into::into));
        self
    }

    /// Enable history replay with the given depth.
    pub fn with_history(mut self, num_history_responses: usize) -> Self {
        self.add_history_to_messages = true;
        self.num_history_responses = num_history_responses;
        self
    }

    /// Enable tool call display, name and datetime instructions, and markdown output.
    pub fn with_display_flags(mut self) -> Self {
        self.show_tool_calls = true;
        self.add_name_to_instructions = true;
        self.add_datetime_to_instructions = true;
        self.markdown = true;
        self
    }

    /// Names of every tool function this agent can call.
    pub fn tool_names(&self) -> Vec<&'static str> {
        self.tools.iter().flat_map(|t| t.function_names()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = AgentConfig::new("Test Agent", "test-agent", "test_agent")
            .with_role("Testing")
            .with_instructions(["one", "two"])
            .with_instructions(vec!["three".to_string()])
            .with_history(4)
            .with_display_flags();

        assert_eq!(config.role, "Testing");
        assert_eq!(config.instructions, vec!["one", "two", "three"]);
        assert!(config.add_history_to_messages);
        assert_eq!(config.num_history_responses, 4);
        assert!(config.show_tool_calls && config.markdown);
        assert_eq!(config.model.to_string(), "xai/grok-beta");
    }

    #[test]
    fn test_deserialize_from_toml() {
        let config: AgentConfig = toml::from_str(
            r#"
            name = "Poet"
            agent_id = "poet-agent"
            instructions = ["Answer in verse."]
            markdown = true

            [storage]
            table_name = "poet_agent"

            [[tools]]
            kind = "duckduckgo"
            "#,
        )
        .unwrap();

        assert_eq!(config.name, "Poet");
        assert_eq!(config.model, ModelRef::default());
        assert_eq!(config.num_history_responses, 3);
        assert!(!config.show_tool_calls);
        assert_eq!(config.tool_names(), vec!["duckduckgo_search", "duckduckgo_news"]);
    }
}
