//! The agent registry and the built-in agent table.

use super::definition::{AgentConfig, ModelRef};
use crate::error::{AgentsError, Result};
use crate::tools::Toolkit;
use regex::Regex;
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Instructions appended to every built-in agent.
pub const COMMON_INSTRUCTIONS: [&str; 3] = [
    "Introduce yourself with your name and role when asked.",
    "Provide clear and concise responses.",
    "If unsure, ask the user for more context or clarify the question.",
];

/// Model used by every built-in agent.
const BUILTIN_MODEL: &str = "grok-beta";

/// Ordered, validated list of agents served by the playground.
#[derive(Debug, Clone)]
pub struct AgentRegistry {
    agents: Vec<Arc<AgentConfig>>,
}

impl AgentRegistry {
    /// Build a registry, rejecting invalid or conflicting configurations.
    pub fn new(agents: Vec<AgentConfig>) -> Result<Self> {
        validate(&agents)?;
        debug!("Registered {} agents", agents.len());
        Ok(Self {
            agents: agents.into_iter().map(Arc::new).collect(),
        })
    }

    /// The six preconfigured agents.
    pub fn builtin() -> Result<Self> {
        Self::new(builtin_agents())
    }

    /// Apply custom agents: same `agent_id` replaces in place, new ids are appended.
    pub fn with_overrides(self, custom: Vec<AgentConfig>) -> Result<Self> {
        if custom.is_empty() {
            return Ok(self);
        }

        let mut custom_ids = HashSet::new();
        for agent in &custom {
            if !custom_ids.insert(agent.agent_id.as_str()) {
                return Err(AgentsError::Registry(format!(
                    "duplicate agent_id '{}' in custom agents",
                    agent.agent_id
                )));
            }
        }

        let mut agents: Vec<AgentConfig> =
            self.agents.iter().map(|a| a.as_ref().clone()).collect();

        for agent in custom {
            match agents.iter_mut().find(|a| a.agent_id == agent.agent_id) {
                Some(existing) => *existing = agent,
                None => agents.push(agent),
            }
        }

        Self::new(agents)
    }

    pub fn get(&self, agent_id: &str) -> Option<Arc<AgentConfig>> {
        self.agents
            .iter()
            .find(|a| a.agent_id == agent_id)
            .cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<AgentConfig>> {
        self.agents.iter()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.agents.iter().map(|a| a.agent_id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

fn table_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Invalid regex"))
}

/// Check that a table name is safe to interpolate into SQL.
pub fn is_valid_table_name(name: &str) -> bool {
    table_name_regex().is_match(name)
}

fn validate(agents: &[AgentConfig]) -> Result<()> {
    let mut ids = HashSet::new();
    let mut tables = HashSet::new();

    for agent in agents {
        if agent.name.trim().is_empty() {
            return Err(AgentsError::Registry(format!(
                "agent '{}' has an empty name",
                agent.agent_id
            )));
        }
        if agent.agent_id.trim().is_empty() {
            return Err(AgentsError::Registry(format!(
                "agent '{}' has an empty agent_id",
                agent.name
            )));
        }
        if agent.instructions.is_empty() {
            return Err(AgentsError::Registry(format!(
                "agent '{}' has no instructions",
                agent.agent_id
            )));
        }
        if !is_valid_table_name(&agent.storage.table_name) {
            return Err(AgentsError::Registry(format!(
                "agent '{}' has invalid table name '{}'",
                agent.agent_id, agent.storage.table_name
            )));
        }
        if !ids.insert(agent.agent_id.as_str()) {
            return Err(AgentsError::Registry(format!(
                "duplicate agent_id '{}'",
                agent.agent_id
            )));
        }
        if !tables.insert(agent.storage.table_name.as_str()) {
            return Err(AgentsError::Registry(format!(
                "table '{}' is used by more than one agent",
                agent.storage.table_name
            )));
        }
    }

    Ok(())
}

fn web_agent() -> AgentConfig {
    AgentConfig::new("Web Agent", "web-agent", "web_agent")
        .with_role("Search the web for accurate information")
        .with_model(ModelRef::xai(BUILTIN_MODEL))
        .with_tools(vec![Toolkit::duckduckgo()])
        .with_instructions([
            "Use the `duckduckgo_search` or `duckduckgo_news` tools to gather up-to-date and relevant information.",
            "Summarize the key points clearly and concisely.",
            "Always include the sources you used to gather the information in your response.",
            "If you cannot find specific details, provide the closest relevant information.",
        ])
        .with_instructions(COMMON_INSTRUCTIONS)
        .with_history(2)
        .with_display_flags()
}

fn finance_agent() -> AgentConfig {
    AgentConfig::new("Finance Agent", "finance-agent", "finance_agent")
        .with_role("Provide financial data and analysis")
        .with_model(ModelRef::xai(BUILTIN_MODEL))
        .with_tools(vec![Toolkit::YFinance {
            stock_price: true,
            analyst_recommendations: true,
            company_info: true,
            company_news: true,
        }])
        .with_description("You provide financial data and help users make informed investment decisions.")
        .with_instructions([
            "Always provide current and accurate stock prices when asked.",
            "Use tables to present stock prices, recommendations, or financial data clearly.",
            "Summarize analyst recommendations and any important news related to the requested stock.",
            "If you don’t have relevant data, suggest other stocks or related financial info.",
        ])
        .with_instructions(COMMON_INSTRUCTIONS)
        .with_history(5)
        .with_display_flags()
}

fn youtube_agent() -> AgentConfig {
    AgentConfig::new("YouTube Agent", "youtube-agent", "youtube_agent")
        .with_role("Analyze YouTube videos and answer questions based on their content")
        .with_model(ModelRef::xai(BUILTIN_MODEL))
        .with_tools(vec![Toolkit::YouTube])
        .with_description("You analyze YouTube videos and answer user questions based on video content.")
        .with_instructions([
            "Use the `get_youtube_video_data` tool to extract video details such as title, description, and metadata.",
            "Extract captions using the `get_youtube_video_data` tool to understand the content of the video.",
            "Summarize the video’s main points clearly, and answer the user's questions based on the video content.",
            "Focus on providing answers based on factual content from the video and avoid assumptions.",
            "If the video lacks necessary details, ask the user for clarification or another video.",
        ])
        .with_instructions(COMMON_INSTRUCTIONS)
        .with_history(5)
        .with_display_flags()
}

fn joke_agent() -> AgentConfig {
    AgentConfig::new("Joke Agent", "joke-agent", "joke_agent")
        .with_role("Tell light-hearted, funny jokes")
        .with_model(ModelRef::xai(BUILTIN_MODEL))
        .with_description("You tell jokes and make light-hearted, humorous responses.")
        .with_instructions([
            "When asked for a joke, provide a brief, family-friendly joke or pun.",
            "Keep the jokes simple and suitable for all ages.",
            "Avoid offensive or inappropriate content at all times.",
        ])
        .with_instructions(COMMON_INSTRUCTIONS)
        .with_history(2)
        .with_display_flags()
}

fn weather_agent() -> AgentConfig {
    // Weather data comes from web search results.
    AgentConfig::new("Weather Agent", "weather-agent", "weather_agent")
        .with_role("Provide real-time weather information and forecasts")
        .with_model(ModelRef::xai(BUILTIN_MODEL))
        .with_tools(vec![Toolkit::duckduckgo()])
        .with_description("You provide up-to-date weather reports and forecasts.")
        .with_instructions([
            "Search for the most recent weather reports and forecasts using the `duckduckgo_search` tool.",
            "Present the current temperature, weather conditions, and forecast clearly and concisely.",
            "Include the source of the weather information in your response.",
            "If no specific location is given, ask for the city or region to provide accurate weather data.",
        ])
        .with_instructions(COMMON_INSTRUCTIONS)
        .with_history(2)
        .with_display_flags()
}

fn ceo_agent() -> AgentConfig {
    AgentConfig::new("CEO Agent", "ceo-agent", "ceo_agent")
        .with_role("Provide technical leadership and insights into software engineering, physics, and research")
        .with_model(ModelRef::xai(BUILTIN_MODEL))
        .with_tools(vec![Toolkit::duckduckgo()])
        .with_description("You are a co-founder and CEO with expertise in software engineering, physics, and research. You can also stay updated with the latest research papers and provide technical leadership.")
        .with_instructions([
            "Provide strategic and technical insights when asked about software engineering, including best practices, frameworks, and architectural advice.",
            "For physics-related questions, offer clear explanations of complex concepts and suggest up-to-date research or studies.",
            "Use the `duckduckgo_search` tool to find and summarize recent research papers, and highlight the most relevant findings.",
            "Assist with startup advice, leadership strategies, and co-founder-level decisions.",
            "Summarize research papers and scientific advances concisely, focusing on how they impact technology or industry trends.",
            "If unsure of the latest updates, ask the user for clarification or additional context.",
        ])
        .with_instructions(COMMON_INSTRUCTIONS)
        .with_history(5)
        .with_display_flags()
}

/// Built-in agents in playground order.
pub fn builtin_agents() -> Vec<AgentConfig> {
    vec![
        finance_agent(),
        youtube_agent(),
        web_agent(),
        joke_agent(),
        weather_agent(),
        ceo_agent(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_is_valid() {
        let registry = AgentRegistry::builtin().unwrap();
        assert_eq!(
            registry.ids(),
            vec![
                "finance-agent",
                "youtube-agent",
                "web-agent",
                "joke-agent",
                "weather-agent",
                "ceo-agent"
            ]
        );
    }

    #[test]
    fn test_builtin_agents_are_well_formed() {
        let agents = builtin_agents();
        let ids: HashSet<_> = agents.iter().map(|a| a.agent_id.clone()).collect();
        let tables: HashSet<_> = agents.iter().map(|a| a.storage.table_name.clone()).collect();
        assert_eq!(ids.len(), agents.len());
        assert_eq!(tables.len(), agents.len());

        for agent in &agents {
            assert!(!agent.name.is_empty());
            assert!(!agent.instructions.is_empty());
            assert_eq!(agent.model.id, "grok-beta");
            assert!(agent.show_tool_calls && agent.add_history_to_messages && agent.markdown);

            let tail = &agent.instructions[agent.instructions.len() - 3..];
            assert_eq!(tail, COMMON_INSTRUCTIONS);
        }
    }

    #[test]
    fn test_builtin_history_depths() {
        let registry = AgentRegistry::builtin().unwrap();
        let depth = |id: &str| registry.get(id).unwrap().num_history_responses;
        assert_eq!(depth("web-agent"), 2);
        assert_eq!(depth("finance-agent"), 5);
        assert_eq!(depth("youtube-agent"), 5);
        assert_eq!(depth("joke-agent"), 2);
        assert_eq!(depth("weather-agent"), 2);
        assert_eq!(depth("ceo-agent"), 5);
        assert!(registry.get("joke-agent").unwrap().tools.is_empty());
    }

    #[test]
    fn test_rejects_duplicate_agent_id() {
        let a = AgentConfig::new("A", "same", "table_a").with_instructions(["x"]);
        let b = AgentConfig::new("B", "same", "table_b").with_instructions(["x"]);
        let err = AgentRegistry::new(vec![a, b]).unwrap_err();
        assert!(err.to_string().contains("duplicate agent_id"));
    }

    #[test]
    fn test_rejects_shared_table() {
        let a = AgentConfig::new("A", "a", "shared").with_instructions(["x"]);
        let b = AgentConfig::new("B", "b", "shared").with_instructions(["x"]);
        assert!(AgentRegistry::new(vec![a, b]).is_err());
    }

    #[test]
    fn test_rejects_empty_instructions_and_name() {
        let no_instructions = AgentConfig::new("A", "a", "table_a");
        assert!(AgentRegistry::new(vec![no_instructions]).is_err());

        let no_name = AgentConfig::new("  ", "a", "table_a").with_instructions(["x"]);
        assert!(AgentRegistry::new(vec![no_name]).is_err());
    }

    #[test]
    fn test_rejects_unsafe_table_name() {
        assert!(is_valid_table_name("web_agent"));
        assert!(!is_valid_table_name("web-agent"));
        assert!(!is_valid_table_name("x; DROP TABLE y"));
        let agent = AgentConfig::new("A", "a", "bad name").with_instructions(["x"]);
        assert!(AgentRegistry::new(vec![agent]).is_err());
    }

    #[test]
    fn test_overrides_replace_and_append() {
        let registry = AgentRegistry::builtin().unwrap();
        let joke = AgentConfig::new("Pun Agent", "joke-agent", "joke_agent")
            .with_instructions(["Only puns."]);
        let extra = AgentConfig::new("Poet", "poet-agent", "poet_agent")
            .with_instructions(["Answer in verse."]);

        let registry = registry.with_overrides(vec![joke, extra]).unwrap();
        assert_eq!(registry.len(), 7);
        assert_eq!(registry.ids()[3], "joke-agent");
        assert_eq!(registry.get("joke-agent").unwrap().name, "Pun Agent");
        assert_eq!(registry.ids()[6], "poet-agent");
    }

    #[test]
    fn test_override_conflicting_table_rejected() {
        let registry = AgentRegistry::builtin().unwrap();
        let clash = AgentConfig::new("Clash", "clash-agent", "web_agent").with_instructions(["x"]);
        assert!(registry.with_overrides(vec![clash]).is_err());
    }

    #[test]
    fn test_override_duplicate_custom_ids_rejected() {
        let registry = AgentRegistry::builtin().unwrap();
        let first = AgentConfig::new("Poet", "poet-agent", "poet_agent")
            .with_instructions(["Answer in verse."]);
        let second = AgentConfig::new("Other Poet", "poet-agent", "other_poet_agent")
            .with_instructions(["Answer in haiku."]);

        let err = registry.with_overrides(vec![first, second]).unwrap_err();
        assert!(matches!(err, AgentsError::Registry(_)));
        assert!(err.to_string().contains("poet-agent"));
    }
}
