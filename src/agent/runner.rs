//! Agent runner with session history and the tool calling loop.

use super::definition::AgentConfig;
use super::prompt::build_system_message;
use crate::config::Settings;
use crate::error::{AgentsError, Result};
use crate::llm::{create_client, LlmClient};
use crate::storage::{
    AgentRun, AgentSession, AgentStorage, MemoryAgentStorage, SqliteAgentStorage, ToolCallRecord,
};
use crate::tools::{parse_tool_call, ToolContext};
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use chrono::Local;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// A configured agent bound to its model client, storage table and tools.
pub struct Agent {
    config: Arc<AgentConfig>,
    client: LlmClient,
    storage: Arc<dyn AgentStorage>,
    tools: ToolContext,
    max_iterations: usize,
}

impl Agent {
    /// Create a new agent from its parts.
    pub fn new(
        config: Arc<AgentConfig>,
        client: LlmClient,
        storage: Arc<dyn AgentStorage>,
        tools: ToolContext,
    ) -> Self {
        Self {
            config,
            client,
            storage,
            tools,
            max_iterations: 10,
        }
    }

    /// Wire an agent from application settings.
    ///
    /// With `ephemeral` set, sessions live in memory instead of the SQLite file.
    pub fn from_settings(
        config: Arc<AgentConfig>,
        settings: &Settings,
        ephemeral: bool,
    ) -> Result<Self> {
        let client = create_client(config.model.provider, &settings.model)?;

        let storage: Arc<dyn AgentStorage> = if ephemeral {
            Arc::new(MemoryAgentStorage::new(&config.storage.table_name))
        } else {
            Arc::new(SqliteAgentStorage::new(
                &settings.db_path(),
                &config.storage.table_name,
            )?)
        };

        let tools = ToolContext::new(config.tools.clone(), &settings.tools)?;

        Ok(Self::new(config, client, storage, tools)
            .with_max_iterations(settings.agent.max_tool_iterations))
    }

    /// Set maximum iterations for the agent loop.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn AgentStorage> {
        &self.storage
    }

    /// Load a session owned by this agent, or start a new one.
    ///
    /// A requested id that does not exist yet becomes the id of the new session.
    pub async fn load_session(
        &self,
        session_id: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<AgentSession> {
        let Some(session_id) = session_id else {
            return Ok(AgentSession::new(
                &self.config.agent_id,
                user_id.map(String::from),
            ));
        };

        match self.storage.read(session_id).await? {
            Some(session) if session.agent_id != self.config.agent_id => {
                Err(AgentsError::Session(format!(
                    "session {} belongs to agent {}",
                    session_id, session.agent_id
                )))
            }
            Some(session) => Ok(session),
            None => Ok(AgentSession::with_id(
                session_id,
                &self.config.agent_id,
                user_id.map(String::from),
            )),
        }
    }

    /// Run the agent on a user message within a session.
    #[instrument(skip(self, message), fields(agent = %self.config.agent_id))]
    pub async fn run(
        &self,
        message: &str,
        session_id: Option<&str>,
        user_id: Option<&str>,
    ) -> Result<AgentResponse> {
        let mut session = self.load_session(session_id, user_id).await?;
        let mut messages = build_messages(&self.config, &session, message)?;

        let definitions = self.tools.definitions();
        let mut iterations = 0;
        let mut tool_calls_made = Vec::new();

        let content = loop {
            iterations += 1;
            if iterations > self.max_iterations {
                return Err(AgentsError::Agent(format!(
                    "Agent exceeded maximum iterations ({})",
                    self.max_iterations
                )));
            }

            debug!("Agent iteration {}, {} messages", iterations, messages.len());

            let mut args = CreateChatCompletionRequestArgs::default();
            args.model(&self.config.model.id).messages(messages.clone());
            if !definitions.is_empty() {
                args.tools(definitions.clone());
            }
            let request = args.build().map_err(|e| AgentsError::Agent(e.to_string()))?;

            let response = self
                .client
                .chat()
                .create(request)
                .await
                .map_err(|e| AgentsError::Llm(format!("Chat API error: {}", e)))?;

            let choice = response
                .choices
                .first()
                .ok_or_else(|| AgentsError::Agent("No response from model".to_string()))?;

            let tool_calls = match &choice.message.tool_calls {
                Some(calls) if !calls.is_empty() => calls.clone(),
                _ => break choice.message.content.clone().unwrap_or_default(),
            };

            // Add assistant message with tool calls to history
            let mut assistant = ChatCompletionRequestAssistantMessageArgs::default();
            assistant.tool_calls(tool_calls.clone());
            if let Some(text) = choice.message.content.as_ref().filter(|t| !t.is_empty()) {
                assistant.content(text.clone());
            }
            messages.push(
                assistant
                    .build()
                    .map_err(|e| AgentsError::Agent(e.to_string()))?
                    .into(),
            );

            let records = join_all(tool_calls.iter().map(|tc| self.execute_tool_call(tc))).await;

            for (tool_call, record) in tool_calls.iter().zip(records) {
                let tool_msg = ChatCompletionRequestToolMessageArgs::default()
                    .tool_call_id(&tool_call.id)
                    .content(record.result.clone())
                    .build()
                    .map_err(|e| AgentsError::Agent(e.to_string()))?;
                messages.push(tool_msg.into());
                tool_calls_made.push(record);
            }
        };

        let run = AgentRun::new(message, &content, tool_calls_made.clone());
        let run_id = run.run_id.clone();
        session.push_run(run);
        self.storage.upsert(&session).await?;

        info!(
            "Run {} finished in {} iteration(s) with {} tool call(s)",
            run_id,
            iterations,
            tool_calls_made.len()
        );

        let content = if self.config.show_tool_calls && !tool_calls_made.is_empty() {
            format!("{}\n\n{}", format_tool_calls(&tool_calls_made), content)
        } else {
            content
        };

        Ok(AgentResponse {
            run_id,
            session_id: session.session_id,
            content,
            tool_calls: tool_calls_made,
            iterations,
        })
    }

    /// Execute a single tool call and return a record of it.
    async fn execute_tool_call(&self, tool_call: &ChatCompletionMessageToolCall) -> ToolCallRecord {
        let name = &tool_call.function.name;
        let arguments = &tool_call.function.arguments;

        info!("Agent calling tool: {} with args: {}", name, arguments);

        let result = match parse_tool_call(name, arguments) {
            Ok(tool) => match self.tools.execute(&tool).await {
                Ok(output) => output,
                Err(e) => format!("Tool error: {}", e),
            },
            Err(e) => format!("Failed to parse tool call: {}", e),
        };

        ToolCallRecord {
            name: name.clone(),
            arguments: arguments.clone(),
            result,
        }
    }
}

/// Messages for one run: system prompt, replayed history, then the new user message.
pub fn build_messages(
    config: &AgentConfig,
    session: &AgentSession,
    message: &str,
) -> Result<Vec<ChatCompletionRequestMessage>> {
    let mut messages: Vec<ChatCompletionRequestMessage> = vec![
        ChatCompletionRequestSystemMessageArgs::default()
            .content(build_system_message(config, Local::now()))
            .build()
            .map_err(|e| AgentsError::Agent(e.to_string()))?
            .into(),
    ];

    if config.add_history_to_messages {
        for run in session.recent_runs(config.num_history_responses) {
            messages.push(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(run.input.clone())
                    .build()
                    .map_err(|e| AgentsError::Agent(e.to_string()))?
                    .into(),
            );
            messages.push(
                ChatCompletionRequestAssistantMessageArgs::default()
                    .content(run.output.clone())
                    .build()
                    .map_err(|e| AgentsError::Agent(e.to_string()))?
                    .into(),
            );
        }
    }

    messages.push(
        ChatCompletionRequestUserMessageArgs::default()
            .content(message)
            .build()
            .map_err(|e| AgentsError::Agent(e.to_string()))?
            .into(),
    );

    Ok(messages)
}

/// Render tool calls as ` - Running: name(key=value, ...)` lines.
pub fn format_tool_calls(tool_calls: &[ToolCallRecord]) -> String {
    tool_calls
        .iter()
        .map(|call| {
            let args = match serde_json::from_str::<serde_json::Value>(&call.arguments) {
                Ok(serde_json::Value::Object(map)) => map
                    .iter()
                    .map(|(k, v)| match v {
                        serde_json::Value::String(s) => format!("{}={}", k, s),
                        other => format!("{}={}", k, other),
                    })
                    .collect::<Vec<_>>()
                    .join(", "),
                _ => call.arguments.clone(),
            };
            format!(" - Running: {}({})", call.name, args)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Response from an agent run.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    pub run_id: String,
    pub session_id: String,
    /// The final response content, prefixed by tool calls when the agent shows them.
    pub content: String,
    /// Record of all tool calls made during execution.
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of iterations (LLM calls) used.
    pub iterations: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ModelSettings, ToolSettings};
    use crate::llm::create_client_with_key;
    use axum::{extract::State, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::sync::Mutex;

    fn test_agent(config: AgentConfig, storage: Arc<dyn AgentStorage>) -> Agent {
        let client = create_client_with_key(
            config.model.provider,
            &ModelSettings::default(),
            "xai-test",
        )
        .unwrap();
        let tools = ToolContext::new(config.tools.clone(), &ToolSettings::default()).unwrap();
        Agent::new(Arc::new(config), client, storage, tools)
    }

    fn session_with_runs(n: usize) -> AgentSession {
        let mut session = AgentSession::new("joke-agent", None);
        for i in 0..n {
            session.push_run(AgentRun::new(&format!("q{}", i), &format!("a{}", i), vec![]));
        }
        session
    }

    #[test]
    fn test_build_messages_replays_history_window() {
        let config = AgentConfig::new("Joke Agent", "joke-agent", "joke_agent")
            .with_instructions(["Be funny."])
            .with_history(2);
        let session = session_with_runs(4);

        let messages = build_messages(&config, &session, "one more").unwrap();
        // system + 2 runs * (user, assistant) + new user message
        assert_eq!(messages.len(), 6);
        assert!(matches!(messages[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(messages[5], ChatCompletionRequestMessage::User(_)));
    }

    #[test]
    fn test_build_messages_without_history() {
        let config = AgentConfig::new("Joke Agent", "joke-agent", "joke_agent")
            .with_instructions(["Be funny."]);
        let session = session_with_runs(4);

        let messages = build_messages(&config, &session, "hi").unwrap();
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn test_format_tool_calls() {
        let calls = vec![
            ToolCallRecord {
                name: "get_current_stock_price".to_string(),
                arguments: r#"{"symbol":"NVDA"}"#.to_string(),
                result: "140.1200".to_string(),
            },
            ToolCallRecord {
                name: "duckduckgo_search".to_string(),
                arguments: r#"{"max_results":3,"query":"rust"}"#.to_string(),
                result: "[]".to_string(),
            },
        ];

        assert_eq!(
            format_tool_calls(&calls),
            " - Running: get_current_stock_price(symbol=NVDA)\n - Running: duckduckgo_search(max_results=3, query=rust)"
        );
    }

    #[tokio::test]
    async fn test_load_session_creates_and_resumes() {
        let storage: Arc<dyn AgentStorage> = Arc::new(MemoryAgentStorage::new("joke_agent"));
        let config = AgentConfig::new("Joke Agent", "joke-agent", "joke_agent")
            .with_instructions(["Be funny."]);
        let agent = test_agent(config, storage.clone());

        let fresh = agent.load_session(None, Some("ana")).await.unwrap();
        assert!(fresh.runs.is_empty());
        assert_eq!(fresh.user_id.as_deref(), Some("ana"));

        let named = agent.load_session(Some("s-1"), None).await.unwrap();
        assert_eq!(named.session_id, "s-1");

        let stored = session_with_runs(1);
        storage.upsert(&stored).await.unwrap();
        let resumed = agent.load_session(Some(&stored.session_id), None).await.unwrap();
        assert_eq!(resumed.runs.len(), 1);
    }

    #[tokio::test]
    async fn test_load_session_rejects_foreign_session() {
        let storage: Arc<dyn AgentStorage> = Arc::new(MemoryAgentStorage::new("shared"));
        let foreign = AgentSession::with_id("s-9", "web-agent", None);
        storage.upsert(&foreign).await.unwrap();

        let config = AgentConfig::new("Joke Agent", "joke-agent", "shared")
            .with_instructions(["Be funny."]);
        let agent = test_agent(config, storage);

        let err = agent.load_session(Some("s-9"), None).await.unwrap_err();
        assert!(matches!(err, AgentsError::Session(_)));
    }

    /// Chat completions stand-in: asks for a tool call after a user message,
    /// answers "done" after a tool result.
    #[derive(Default)]
    struct MockModel {
        always_call_tool: bool,
        requests: Mutex<Vec<Value>>,
    }

    async fn chat_completions(
        State(mock): State<Arc<MockModel>>,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        let last_role = body["messages"]
            .as_array()
            .and_then(|m| m.last())
            .and_then(|m| m["role"].as_str())
            .unwrap_or_default()
            .to_string();
        mock.requests.lock().unwrap().push(body);

        let (message, finish_reason) = if mock.always_call_tool || last_role == "user" {
            (
                json!({
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "duckduckgo_search",
                            "arguments": "{\"query\":\"x\"}"
                        }
                    }]
                }),
                "tool_calls",
            )
        } else {
            (json!({ "role": "assistant", "content": "done" }), "stop")
        };

        Json(json!({
            "id": "chatcmpl-test",
            "object": "chat.completion",
            "created": 0,
            "model": "grok-beta",
            "choices": [{ "index": 0, "message": message, "finish_reason": finish_reason }]
        }))
    }

    async fn serve_mock(mock: Arc<MockModel>) -> ModelSettings {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new()
            .route("/v1/chat/completions", post(chat_completions))
            .with_state(mock);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        ModelSettings {
            api_base: Some(format!("http://{}/v1", addr)),
            ..ModelSettings::default()
        }
    }

    fn mock_agent(settings: &ModelSettings, storage: Arc<dyn AgentStorage>) -> Agent {
        // No toolkits: the requested search is rejected and reported back to the model.
        let config = AgentConfig::new("Web Agent", "web-agent", "web_agent")
            .with_instructions(["Search the web."])
            .with_history(2)
            .with_display_flags();
        let client = create_client_with_key(config.model.provider, settings, "xai-test").unwrap();
        let tools = ToolContext::new(Vec::new(), &ToolSettings::default()).unwrap();
        Agent::new(Arc::new(config), client, storage, tools)
    }

    #[tokio::test]
    async fn test_run_tool_loop_and_history() {
        let mock = Arc::new(MockModel::default());
        let settings = serve_mock(mock.clone()).await;
        let storage: Arc<dyn AgentStorage> = Arc::new(MemoryAgentStorage::new("web_agent"));
        let agent = mock_agent(&settings, storage.clone());

        let response = agent.run("find x", None, Some("ana")).await.unwrap();
        assert_eq!(response.iterations, 2);
        assert_eq!(
            response.content,
            " - Running: duckduckgo_search(query=x)\n\ndone"
        );
        assert_eq!(response.tool_calls.len(), 1);
        assert!(response.tool_calls[0].result.starts_with("Tool error:"));
        assert!(response.tool_calls[0].result.contains("not available"));

        // The failed tool result went back to the model as the tool message.
        {
            let requests = mock.requests.lock().unwrap();
            assert_eq!(requests.len(), 2);
            let last = requests[1]["messages"].as_array().unwrap().last().unwrap().clone();
            assert_eq!(last["role"], "tool");
            assert_eq!(last["tool_call_id"], "call_1");
            assert!(last["content"].as_str().unwrap().contains("not available"));
        }

        // Stored output carries no tool-call prefix.
        let stored = storage.read(&response.session_id).await.unwrap().unwrap();
        assert_eq!(stored.runs.len(), 1);
        assert_eq!(stored.runs[0].input, "find x");
        assert_eq!(stored.runs[0].output, "done");
        assert_eq!(stored.user_id.as_deref(), Some("ana"));

        // A follow-up run replays the first run as history.
        agent
            .run("and y?", Some(&response.session_id), Some("ana"))
            .await
            .unwrap();
        let requests = mock.requests.lock().unwrap();
        assert_eq!(requests.len(), 4);
        let messages = requests[2]["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[1]["content"], "find x");
        assert_eq!(messages[2]["role"], "assistant");
        assert_eq!(messages[2]["content"], "done");
        assert_eq!(messages[3]["content"], "and y?");
    }

    #[tokio::test]
    async fn test_run_stops_at_max_iterations() {
        let mock = Arc::new(MockModel {
            always_call_tool: true,
            ..MockModel::default()
        });
        let settings = serve_mock(mock.clone()).await;
        let storage: Arc<dyn AgentStorage> = Arc::new(MemoryAgentStorage::new("web_agent"));
        let agent = mock_agent(&settings, storage.clone()).with_max_iterations(3);

        let err = agent.run("loop forever", None, None).await.unwrap_err();
        assert!(matches!(err, AgentsError::Agent(_)));
        assert!(err.to_string().contains("maximum iterations (3)"));

        assert_eq!(mock.requests.lock().unwrap().len(), 3);
        assert!(storage.get_all_sessions(None).await.unwrap().is_empty());
    }
}
