//! SQLite-backed session storage.
//!
//! All agents share one database file; each agent reads and writes its own
//! table. Runs are kept as a JSON column so the schema never changes when
//! run records grow new fields.

use super::{AgentRun, AgentSession, AgentStorage};
use crate::agent::is_valid_table_name;
use crate::error::{AgentsError, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Per-session values that are not runs.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionData {
    #[serde(skip_serializing_if = "Option::is_none")]
    session_name: Option<String>,
}

/// Session storage in one table of a SQLite database.
pub struct SqliteAgentStorage {
    conn: Mutex<Connection>,
    table_name: String,
}

impl SqliteAgentStorage {
    /// Open (creating if needed) the database file and the agent's table.
    #[instrument(skip_all, fields(table = %table_name))]
    pub fn new(path: &Path, table_name: &str) -> Result<Self> {
        // Create parent directories if needed
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        // Several agents hold connections to the same file
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.busy_timeout(Duration::from_secs(5))?;

        let storage = Self::with_connection(conn, table_name)?;
        info!("Opened session table {} in {:?}", table_name, path);
        Ok(storage)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory(table_name: &str) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, table_name)
    }

    fn with_connection(conn: Connection, table_name: &str) -> Result<Self> {
        if !is_valid_table_name(table_name) {
            return Err(AgentsError::Storage(format!(
                "Invalid table name: {}",
                table_name
            )));
        }

        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                session_id TEXT PRIMARY KEY,
                agent_id TEXT NOT NULL,
                user_id TEXT,
                memory TEXT NOT NULL,
                session_data TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_{table}_user_id ON {table}(user_id);
            CREATE INDEX IF NOT EXISTS idx_{table}_updated_at ON {table}(updated_at);
            "#,
            table = table_name
        ))?;

        Ok(Self {
            conn: Mutex::new(conn),
            table_name: table_name.to_string(),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| AgentsError::Storage(format!("Failed to acquire lock: {}", e)))
    }

    fn format_time(time: &DateTime<Utc>) -> String {
        // Fixed width so ORDER BY on the text column is chronological
        time.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn parse_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now())
    }

    fn select_columns(&self) -> String {
        format!(
            "SELECT session_id, agent_id, user_id, memory, session_data, created_at, updated_at FROM {}",
            self.table_name
        )
    }

    fn row_to_session(row: &Row<'_>) -> rusqlite::Result<(AgentSession, String, String)> {
        let memory: String = row.get(3)?;
        let session_data: String = row.get(4)?;
        let created_at: String = row.get(5)?;
        let updated_at: String = row.get(6)?;

        let session = AgentSession {
            session_id: row.get(0)?,
            agent_id: row.get(1)?,
            user_id: row.get(2)?,
            session_name: None,
            runs: Vec::new(),
            created_at: Self::parse_time(&created_at),
            updated_at: Self::parse_time(&updated_at),
        };

        Ok((session, memory, session_data))
    }

    fn decode(raw: (AgentSession, String, String)) -> Result<AgentSession> {
        let (mut session, memory, session_data) = raw;
        let runs: Vec<AgentRun> = serde_json::from_str(&memory).map_err(|e| {
            AgentsError::Storage(format!(
                "Corrupt run history for session {}: {}",
                session.session_id, e
            ))
        })?;
        let data: SessionData = serde_json::from_str(&session_data).unwrap_or_default();

        session.runs = runs;
        session.session_name = data.session_name;
        Ok(session)
    }
}

#[async_trait]
impl AgentStorage for SqliteAgentStorage {
    fn table_name(&self) -> &str {
        &self.table_name
    }

    #[instrument(skip(self), fields(table = %self.table_name))]
    async fn read(&self, session_id: &str) -> Result<Option<AgentSession>> {
        let conn = self.lock()?;

        let raw = conn
            .query_row(
                &format!("{} WHERE session_id = ?1", self.select_columns()),
                params![session_id],
                Self::row_to_session,
            )
            .optional()?;

        raw.map(Self::decode).transpose()
    }

    #[instrument(skip(self, session), fields(table = %self.table_name, session_id = %session.session_id))]
    async fn upsert(&self, session: &AgentSession) -> Result<()> {
        let conn = self.lock()?;

        let memory = serde_json::to_string(&session.runs)?;
        let session_data = serde_json::to_string(&SessionData {
            session_name: session.session_name.clone(),
        })?;

        conn.execute(
            &format!(
                r#"
                INSERT OR REPLACE INTO {}
                (session_id, agent_id, user_id, memory, session_data, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                self.table_name
            ),
            params![
                session.session_id,
                session.agent_id,
                session.user_id,
                memory,
                session_data,
                Self::format_time(&session.created_at),
                Self::format_time(&session.updated_at),
            ],
        )?;

        debug!("Upserted session with {} runs", session.runs.len());
        Ok(())
    }

    #[instrument(skip(self), fields(table = %self.table_name))]
    async fn get_all_sessions(&self, user_id: Option<&str>) -> Result<Vec<AgentSession>> {
        let conn = self.lock()?;

        let raw: Vec<(AgentSession, String, String)> = match user_id {
            Some(user) => {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE user_id = ?1 ORDER BY updated_at DESC",
                    self.select_columns()
                ))?;
                let rows = stmt.query_map(params![user], Self::row_to_session)?;
                rows.collect::<rusqlite::Result<_>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "{} ORDER BY updated_at DESC",
                    self.select_columns()
                ))?;
                let rows = stmt.query_map([], Self::row_to_session)?;
                rows.collect::<rusqlite::Result<_>>()?
            }
        };

        raw.into_iter().map(Self::decode).collect()
    }

    #[instrument(skip(self), fields(table = %self.table_name))]
    async fn get_all_session_ids(&self, user_id: Option<&str>) -> Result<Vec<String>> {
        let conn = self.lock()?;

        let ids = match user_id {
            Some(user) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT session_id FROM {} WHERE user_id = ?1 ORDER BY updated_at DESC",
                    self.table_name
                ))?;
                let rows = stmt.query_map(params![user], |row| row.get(0))?;
                rows.collect::<rusqlite::Result<Vec<String>>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT session_id FROM {} ORDER BY updated_at DESC",
                    self.table_name
                ))?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.collect::<rusqlite::Result<Vec<String>>>()?
            }
        };

        Ok(ids)
    }

    #[instrument(skip(self), fields(table = %self.table_name))]
    async fn delete_session(&self, session_id: &str) -> Result<bool> {
        let conn = self.lock()?;

        let deleted = conn.execute(
            &format!("DELETE FROM {} WHERE session_id = ?1", self.table_name),
            params![session_id],
        )?;

        info!("Deleted session {} ({} rows)", session_id, deleted);
        Ok(deleted > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::ToolCallRecord;

    fn sample_session(agent_id: &str, user: Option<&str>) -> AgentSession {
        let mut session = AgentSession::new(agent_id, user.map(String::from));
        session.push_run(AgentRun::new(
            "Price of NVDA?",
            "NVDA trades at 140.1200.",
            vec![ToolCallRecord {
                name: "get_current_stock_price".to_string(),
                arguments: r#"{"symbol":"NVDA"}"#.to_string(),
                result: "140.1200".to_string(),
            }],
        ));
        session
    }

    #[tokio::test]
    async fn test_round_trip() {
        let storage = SqliteAgentStorage::in_memory("finance_agent").unwrap();
        let mut session = sample_session("finance-agent", Some("ana"));
        session.session_name = Some("Chips".to_string());

        storage.upsert(&session).await.unwrap();

        let loaded = storage.read(&session.session_id).await.unwrap().unwrap();
        assert_eq!(loaded.session_id, session.session_id);
        assert_eq!(loaded.agent_id, "finance-agent");
        assert_eq!(loaded.user_id.as_deref(), Some("ana"));
        assert_eq!(loaded.session_name.as_deref(), Some("Chips"));
        assert_eq!(loaded.runs.len(), 1);
        assert_eq!(loaded.runs[0].tool_calls[0].name, "get_current_stock_price");

        assert!(storage.read("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_filter_by_user_and_delete() {
        let storage = SqliteAgentStorage::in_memory("web_agent").unwrap();
        let a = sample_session("web-agent", Some("ana"));
        let b = sample_session("web-agent", Some("bo"));
        storage.upsert(&a).await.unwrap();
        storage.upsert(&b).await.unwrap();

        assert_eq!(storage.get_all_sessions(None).await.unwrap().len(), 2);
        let ids = storage.get_all_session_ids(Some("bo")).await.unwrap();
        assert_eq!(ids, vec![b.session_id.clone()]);

        assert!(storage.delete_session(&a.session_id).await.unwrap());
        assert!(!storage.delete_session(&a.session_id).await.unwrap());
        assert_eq!(storage.get_all_sessions(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_tables_are_isolated_in_shared_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("agents.db");

        let web = SqliteAgentStorage::new(&path, "web_agent").unwrap();
        let joke = SqliteAgentStorage::new(&path, "joke_agent").unwrap();

        let session = sample_session("web-agent", None);
        web.upsert(&session).await.unwrap();

        assert!(path.exists());
        assert_eq!(web.get_all_sessions(None).await.unwrap().len(), 1);
        assert!(joke.get_all_sessions(None).await.unwrap().is_empty());
        assert!(joke.read(&session.session_id).await.unwrap().is_none());

        // Reopening sees persisted data
        drop(web);
        let reopened = SqliteAgentStorage::new(&path, "web_agent").unwrap();
        assert!(reopened.read(&session.session_id).await.unwrap().is_some());
    }

    #[test]
    fn test_rejects_invalid_table_name() {
        assert!(SqliteAgentStorage::in_memory("web-agent").is_err());
    }
}
