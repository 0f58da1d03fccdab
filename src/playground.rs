//! Playground HTTP application serving the registered agents.
//!
//! Routes live under `/v1/playground`: status, agent listing, runs and
//! session management.

use crate::agent::{Agent, AgentRegistry};
use crate::config::Settings;
use crate::error::{AgentsError, Result};
use crate::storage::{AgentSession, ToolCallRecord};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Shared application state.
pub struct PlaygroundState {
    registry: AgentRegistry,
    agents: HashMap<String, Arc<Agent>>,
}

impl PlaygroundState {
    /// Pair each registered configuration with its running agent.
    pub fn new(registry: AgentRegistry, agents: Vec<Agent>) -> Self {
        let agents = agents
            .into_iter()
            .map(|a| (a.config().agent_id.clone(), Arc::new(a)))
            .collect();
        Self { registry, agents }
    }

    /// Build every agent in the registry from settings.
    pub fn from_settings(registry: AgentRegistry, settings: &Settings, ephemeral: bool) -> Result<Self> {
        let agents = registry
            .iter()
            .map(|config| Agent::from_settings(config.clone(), settings, ephemeral))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(registry, agents))
    }

    pub fn registry(&self) -> &AgentRegistry {
        &self.registry
    }

    fn agent(&self, agent_id: &str) -> Result<Arc<Agent>> {
        self.agents
            .get(agent_id)
            .cloned()
            .ok_or_else(|| AgentsError::AgentNotFound(agent_id.to_string()))
    }
}

/// Build the playground router.
pub fn router(state: Arc<PlaygroundState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let playground = Router::new()
        .route("/status", get(status))
        .route("/agent/get", get(get_agents))
        .route("/agent/run", post(run_agent))
        .route("/agent/sessions/all", post(get_all_sessions))
        .route("/agent/sessions/{session_id}", post(get_session))
        .route("/agent/session/rename", post(rename_session))
        .route("/agent/session/delete", post(delete_session));

    Router::new()
        .nest("/v1/playground", playground)
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(state: Arc<PlaygroundState>, host: &str, port: u16) -> Result<()> {
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Playground listening on http://{}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

// === Request/Response Types ===

#[derive(Serialize, Deserialize, Debug)]
pub struct ModelInfo {
    pub provider: String,
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct StorageInfo {
    pub name: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct AgentInfo {
    pub agent_id: String,
    pub name: String,
    pub role: String,
    pub description: Option<String>,
    pub instructions: Vec<String>,
    pub model: ModelInfo,
    pub storage: StorageInfo,
    pub tools: Vec<String>,
}

#[derive(Deserialize)]
pub struct RunRequest {
    pub message: String,
    pub agent_id: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct RunResponse {
    pub run_id: String,
    pub session_id: String,
    pub agent_id: String,
    pub content: String,
    pub tool_calls: Vec<ToolCallRecord>,
}

#[derive(Deserialize)]
pub struct SessionsRequest {
    pub agent_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SessionSummary {
    pub title: String,
    pub session_id: String,
    pub session_name: Option<String>,
    pub created_at: i64,
}

#[derive(Deserialize)]
pub struct RenameRequest {
    pub agent_id: String,
    pub session_id: String,
    pub name: String,
}

#[derive(Deserialize)]
pub struct DeleteRequest {
    pub agent_id: String,
    pub session_id: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(e: AgentsError) -> Response {
    let status = match &e {
        AgentsError::AgentNotFound(_) | AgentsError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        AgentsError::InvalidInput(_) | AgentsError::Session(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        warn!("Playground request failed: {}", e);
    }

    (
        status,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

fn ok_message(message: &str) -> Response {
    Json(serde_json::json!({ "message": message })).into_response()
}

// === Handlers ===

async fn status() -> impl IntoResponse {
    Json(serde_json::json!({ "playground": "available" }))
}

async fn get_agents(State(state): State<Arc<PlaygroundState>>) -> impl IntoResponse {
    let agents: Vec<AgentInfo> = state
        .registry
        .iter()
        .map(|config| AgentInfo {
            agent_id: config.agent_id.clone(),
            name: config.name.clone(),
            role: config.role.clone(),
            description: config.description.clone(),
            instructions: config.instructions.clone(),
            model: ModelInfo {
                provider: config.model.provider.to_string(),
                name: config.model.id.clone(),
            },
            storage: StorageInfo {
                name: config.storage.table_name.clone(),
            },
            tools: config.tool_names().into_iter().map(String::from).collect(),
        })
        .collect();

    Json(agents)
}

async fn run_agent(
    State(state): State<Arc<PlaygroundState>>,
    Json(req): Json<RunRequest>,
) -> Response {
    let agent = match state.agent(&req.agent_id) {
        Ok(agent) => agent,
        Err(e) => return error_response(e),
    };

    if req.message.trim().is_empty() {
        return error_response(AgentsError::InvalidInput("message is empty".to_string()));
    }

    match agent
        .run(&req.message, req.session_id.as_deref(), req.user_id.as_deref())
        .await
    {
        Ok(response) => Json(RunResponse {
            run_id: response.run_id,
            session_id: response.session_id,
            agent_id: req.agent_id,
            content: response.content,
            tool_calls: response.tool_calls,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn get_all_sessions(
    State(state): State<Arc<PlaygroundState>>,
    Json(req): Json<SessionsRequest>,
) -> Response {
    let agent = match state.agent(&req.agent_id) {
        Ok(agent) => agent,
        Err(e) => return error_response(e),
    };

    match agent.storage().get_all_sessions(req.user_id.as_deref()).await {
        Ok(sessions) => Json(
            sessions
                .into_iter()
                .map(|s| SessionSummary {
                    title: s.title(),
                    session_id: s.session_id,
                    session_name: s.session_name,
                    created_at: s.created_at.timestamp(),
                })
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn get_session(
    State(state): State<Arc<PlaygroundState>>,
    Path(session_id): Path<String>,
    Json(req): Json<SessionsRequest>,
) -> Response {
    match load_owned_session(&state, &req.agent_id, &session_id).await {
        Ok(session) => Json(session).into_response(),
        Err(e) => error_response(e),
    }
}

async fn rename_session(
    State(state): State<Arc<PlaygroundState>>,
    Json(req): Json<RenameRequest>,
) -> Response {
    let result = async {
        let mut session = load_owned_session(&state, &req.agent_id, &req.session_id).await?;
        session.session_name = Some(req.name.clone());
        state.agent(&req.agent_id)?.storage().upsert(&session).await
    }
    .await;

    match result {
        Ok(()) => ok_message("successfully renamed session"),
        Err(e) => error_response(e),
    }
}

async fn delete_session(
    State(state): State<Arc<PlaygroundState>>,
    Json(req): Json<DeleteRequest>,
) -> Response {
    let result = async {
        load_owned_session(&state, &req.agent_id, &req.session_id).await?;
        state
            .agent(&req.agent_id)?
            .storage()
            .delete_session(&req.session_id)
            .await
    }
    .await;

    match result {
        Ok(_) => ok_message("successfully deleted session"),
        Err(e) => error_response(e),
    }
}

async fn load_owned_session(
    state: &PlaygroundState,
    agent_id: &str,
    session_id: &str,
) -> Result<AgentSession> {
    let agent = state.agent(agent_id)?;
    match agent.storage().read(session_id).await? {
        Some(session) if session.agent_id == agent_id => Ok(session),
        _ => Err(AgentsError::SessionNotFound(session_id.to_string())),
    }
}
