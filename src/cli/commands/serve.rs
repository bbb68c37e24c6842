//! HTTP API server for integration with other systems.
//!
//! Each conversation is a server-side session with its own memory. Requests to one
//! session are serialized by its mutex; different sessions run concurrently. Sessions
//! idle for longer than [`SessionLimits::idle_timeout`] are dropped, and the least
//! recently used one is evicted when [`SessionLimits::max_sessions`] is reached.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::PulsError;
use crate::rag::{ChatSession, RagEngine};
use crate::vector_store::RetrievalResult;
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
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info};
use uuid::Uuid;

/// Bounds on the sessions kept in memory.
#[derive(Debug, Clone, Copy)]
pub struct SessionLimits {
    pub max_sessions: usize,
    pub idle_timeout: Duration,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            max_sessions: 1000,
            idle_timeout: Duration::from_secs(30 * 60),
        }
    }
}

struct SessionEntry {
    session: Arc<Mutex<ChatSession>>,
    last_used: Instant,
}

/// Shared application state.
struct AppState {
    engine: Arc<RagEngine>,
    limits: SessionLimits,
    sessions: RwLock<HashMap<Uuid, SessionEntry>>,
}

impl AppState {
    fn new(engine: Arc<RagEngine>, limits: SessionLimits) -> Self {
        Self {
            engine,
            limits,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Look up a session and mark it as used.
    async fn session(&self, id: Uuid) -> Option<Arc<Mutex<ChatSession>>> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(&id)?;
        entry.last_used = Instant::now();
        Some(entry.session.clone())
    }

    /// Register a new session, making room for it first.
    async fn insert(&self, id: Uuid, session: ChatSession) {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        prune(&mut sessions, &self.limits, now);
        sessions.insert(
            id,
            SessionEntry {
                session: Arc::new(Mutex::new(session)),
                last_used: now,
            },
        );
    }
}

/// Drop idle sessions, then the least recently used ones until a new session fits.
fn prune(sessions: &mut HashMap<Uuid, SessionEntry>, limits: &SessionLimits, now: Instant) {
    let before = sessions.len();
    sessions.retain(|_, entry| now.duration_since(entry.last_used) < limits.idle_timeout);

    while !sessions.is_empty() && sessions.len() >= limits.max_sessions {
        let oldest = sessions
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(id, _)| *id);
        match oldest {
            Some(id) => {
                sessions.remove(&id);
            }
            None => break,
        }
    }

    if sessions.len() < before {
        debug!("Evicted {} sessions", before - sessions.len());
    }
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Query, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let engine = Arc::new(RagEngine::from_settings(&settings)?);
    let app = router(engine, SessionLimits::default());

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Puls API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET    /health");
    Output::kv("Search", "POST   /search");
    Output::kv("New session", "POST   /sessions");
    Output::kv("Ask", "POST   /sessions/{id}/ask");
    Output::kv("Reset", "POST   /sessions/{id}/reset");
    Output::kv("End session", "DELETE /sessions/{id}");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

fn router(engine: Arc<RagEngine>, limits: SessionLimits) -> Router {
    let state = Arc::new(AppState::new(engine, limits));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/search", post(search))
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", axum::routing::delete(delete_session))
        .route("/sessions/{id}/ask", post(ask))
        .route("/sessions/{id}/reset", post(reset))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    5
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<RetrievalResult>,
}

#[derive(Serialize, Deserialize)]
struct SessionResponse {
    session_id: Uuid,
}

#[derive(Deserialize)]
struct AskRequest {
    question: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(ErrorResponse { error: message })).into_response()
}

impl IntoResponse for PulsError {
    fn into_response(self) -> Response {
        let status = match self {
            PulsError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            PulsError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        error_response(status, self.to_string())
    }
}

fn session_not_found(id: Uuid) -> Response {
    error_response(StatusCode::NOT_FOUND, format!("Session not found: {}", id))
}

// === Handlers ===

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "chunks": state.engine.store().len(),
        "sessions": state.sessions.read().await.len(),
    }))
}

async fn search(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SearchRequest>,
) -> Response {
    match state.engine.retrieve(&req.query, req.limit).await {
        Ok(results) => Json(SearchResponse { results }).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn create_session(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let id = Uuid::new_v4();
    state.insert(id, state.engine.session()).await;
    info!("Created session {}", id);

    (StatusCode::CREATED, Json(SessionResponse { session_id: id }))
}

async fn ask(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<AskRequest>,
) -> Response {
    let Some(session) = state.session(id).await else {
        return session_not_found(id);
    };

    let mut session = session.lock().await;
    match session.ask(&req.question).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn reset(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Response {
    let Some(session) = state.session(id).await else {
        return session_not_found(id);
    };
    session.lock().await.reset();
    StatusCode::NO_CONTENT.into_response()
}

async fn delete_session(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Response {
    match state.sessions.write().await.remove(&id) {
        Some(_) => {
            info!("Closed session {}", id);
            StatusCode::NO_CONTENT.into_response()
        }
        None => session_not_found(id),
    }
}
