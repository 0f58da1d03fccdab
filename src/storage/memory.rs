//! In-memory session storage.
//!
//! Used by tests and by `--ephemeral` runs that should leave no trace on disk.

use super::{AgentSession, AgentStorage};
use crate::error::{AgentsError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// Session storage backed by a `HashMap`.
pub struct MemoryAgentStorage {
    sessions: RwLock<HashMap<String, AgentSession>>,
    table_name: String,
}

impl MemoryAgentStorage {
    pub fn new(table_name: &str) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            table_name: table_name.to_string(),
        }
    }
}

#[async_trait]
impl AgentStorage for MemoryAgentStorage {
    fn table_name(&self) -> &str {
        &self.table_name
    }

    async fn read(&self, session_id: &str) -> Result<Option<AgentSession>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|e| AgentsError::Storage(format!("Failed to acquire lock: {}", e)))?;
        Ok(sessions.get(session_id).cloned())
    }

    async fn upsert(&self, session: &AgentSession) -> Result<()> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|e| AgentsError::Storage(format!("Failed to acquire lock: {}", e)))?;
        sessions.insert(session.session_id.clone(), session.clone());
        Ok(())
    }

    async fn get_all_sessions(&self, user_id: Option<&str>) -> Result<Vec<AgentSession>> {
        let sessions = self
            .sessions
            .read()
            .map_err(|e| AgentsError::Storage(format!("Failed to acquire lock: {}", e)))?;

        let mut result: Vec<AgentSession> = sessions
            .values()
            .filter(|s| user_id.is_none() || s.user_id.as_deref() == user_id)
            .cloned()
            .collect();

        result.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(result)
    }

    async fn delete_session(&self, session_id: &str) -> Result<bool> {
        let mut sessions = self
            .sessions
            .write()
            .map_err(|e| AgentsError::Storage(format!("Failed to acquire lock: {}", e)))?;
        Ok(sessions.remove(session_id).is_some())
    }
}
