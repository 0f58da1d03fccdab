//! Conversation history storage.
//!
//! Every agent owns one table in a shared SQLite file. A row holds one
//! session: the ordered list of runs exchanged under a `session_id`.

mod memory;
mod sqlite;

pub use memory::MemoryAgentStorage;
pub use sqlite::SqliteAgentStorage;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Record of a tool call made during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    /// Name of the tool called.
    pub name: String,
    /// JSON arguments passed to the tool.
    pub arguments: String,
    /// Result returned by the tool.
    pub result: String,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}

/// One user message and the agent's answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRun {
    pub run_id: String,
    pub input: String,
    pub output: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRecord>,
    pub created_at: DateTime<Utc>,
}

impl AgentRun {
    pub fn new(input: &str, output: &str, tool_calls: Vec<ToolCallRecord>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            input: input.to_string(),
            output: output.to_string(),
            tool_calls,
            created_at: Utc::now(),
        }
    }
}

/// A conversation with one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSession {
    pub session_id: String,
    pub agent_id: String,
    pub user_id: Option<String>,
    pub session_name: Option<String>,
    pub runs: Vec<AgentRun>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AgentSession {
    /// Start an empty session with a fresh id.
    pub fn new(agent_id: &str, user_id: Option<String>) -> Self {
        Self::with_id(&uuid::Uuid::new_v4().to_string(), agent_id, user_id)
    }

    /// Start an empty session with a caller-chosen id.
    pub fn with_id(session_id: &str, agent_id: &str, user_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.to_string(),
            agent_id: agent_id.to_string(),
            user_id,
            session_name: None,
            runs: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a finished run.
    pub fn push_run(&mut self, run: AgentRun) {
        self.updated_at = run.created_at;
        self.runs.push(run);
    }

    /// The last `n` runs, oldest first.
    pub fn recent_runs(&self, n: usize) -> &[AgentRun] {
        let start = self.runs.len().saturating_sub(n);
        &self.runs[start..]
    }

    /// Display title: the session name, or the first message.
    pub fn title(&self) -> String {
        self.session_name
            .clone()
            .or_else(|| self.runs.first().map(|r| r.input.clone()))
            .unwrap_or_else(|| "New session".to_string())
    }
}

/// Storage backend for an agent's sessions.
#[async_trait]
pub trait AgentStorage: Send + Sync {
    /// Table (or namespace) this storage writes to.
    fn table_name(&self) -> &str;

    /// Read a session by id.
    async fn read(&self, session_id: &str) -> Result<Option<AgentSession>>;

    /// Insert or replace a session.
    async fn upsert(&self, session: &AgentSession) -> Result<()>;

    /// All sessions, newest first, optionally filtered by user.
    async fn get_all_sessions(&self, user_id: Option<&str>) -> Result<Vec<AgentSession>>;

    /// All session ids, newest first, optionally filtered by user.
    async fn get_all_session_ids(&self, user_id: Option<&str>) -> Result<Vec<String>> {
        let sessions = self.get_all_sessions(user_id).await?;
        Ok(sessions.into_iter().map(|s| s.session_id).collect())
    }

    /// Delete a session. Returns whether it existed.
    async fn delete_session(&self, session_id: &str) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_runs_window() {
        let mut session = AgentSession::new("web-agent", None);
        for i in 0..5 {
            session.push_run(AgentRun::new(&format!("q{}", i), &format!("a{}", i), vec![]));
        }

        let recent: Vec<_> = session.recent_runs(2).iter().map(|r| r.input.as_str()).collect();
        assert_eq!(recent, vec!["q3", "q4"]);
        assert_eq!(session.recent_runs(10).len(), 5);
        assert!(session.recent_runs(0).is_empty());
    }

    #[test]
    fn test_title() {
        let mut session = AgentSession::new("web-agent", None);
        assert_eq!(session.title(), "New session");
        session.push_run(AgentRun::new("What is Rust?", "A language.", vec![]));
        assert_eq!(session.title(), "What is Rust?");
        session.session_name = Some("Rust".to_string());
        assert_eq!(session.title(), "Rust");
    }

    #[test]
    fn test_tool_call_record_display() {
        let record = ToolCallRecord {
            name: "duckduckgo_search".to_string(),
            arguments: r#"{"query": "test"}"#.to_string(),
            result: "[]".to_string(),
        };
        assert_eq!(format!("{}", record), r#"duckduckgo_search({"query": "test"})"#);
    }
}
