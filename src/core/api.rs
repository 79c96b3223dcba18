//! HTTP API for the callbot
//!
//! Endpoints:
//! - GET /health - Health check
//! - POST /decide - Stateless decision + routing for one utterance
//! - POST /call/new - Start a call
//! - GET /call/:id - Call status
//! - POST /call/:id/turn - Caller turn
//! - DELETE /call/:id - Hang up
//! - GET /stats/satisfaction - Satisfaction statistics
//!
//! The decision core and the store are blocking; handlers move that work to
//! the blocking pool. Ended calls are dropped from the session store. A call
//! waiting for its satisfaction answer is closed without feedback once the
//! configured feedback timeout elapses.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::CallbotConfig;
use crate::core::controller::{Collaborators, ControllerSettings, TurnController, TurnInput};
use crate::core::engine::DecisionEngine;
use crate::core::session::{InMemorySessionStore, SessionStore, SharedController};
use crate::core::store::{IntentSatisfaction, SatisfactionStats, SqliteStore};
use crate::error::CallbotError;
use crate::types::{CallState, CallStatus, Decision, HistoryEntry, Observation, RawAudio, RawEmotion, Route, TurnOutput};

/// App state
pub struct AppState {
    pub engine: Arc<DecisionEngine>,
    pub store: Arc<SqliteStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub settings: ControllerSettings,
}

impl AppState {
    pub fn new(engine: Arc<DecisionEngine>, store: Arc<SqliteStore>, settings: ControllerSettings) -> Self {
        Self {
            engine,
            store,
            sessions: Arc::new(InMemorySessionStore::new()),
            settings,
        }
    }

    pub fn from_config(config: &CallbotConfig) -> crate::Result<Self> {
        Ok(Self::new(
            Arc::new(DecisionEngine::from_config(config)?),
            Arc::new(SqliteStore::open(&config.database.path)?),
            ControllerSettings::from(&config.conversation),
        ))
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("internal server error: {0}")]
    Internal(String),
}

impl From<CallbotError> for ApiError {
    fn from(err: CallbotError) -> Self {
        match err {
            CallbotError::SessionNotFound(id) => ApiError::NotFound(format!("call {id}")),
            CallbotError::SessionExists(id) => ApiError::Conflict(format!("call {id} already exists")),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

fn join_error(err: tokio::task::JoinError) -> ApiError {
    ApiError::Internal(format!("task join error: {err}"))
}

/// Health response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub decider: String,
    pub calls_active: usize,
}

/// Decide request
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DecideRequest {
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub emotion: Option<RawEmotion>,
    #[serde(default)]
    pub audio: Option<RawAudio>,
}

/// Decide response
#[derive(Debug, Serialize, Deserialize)]
pub struct DecideResponse {
    pub observation: Observation,
    pub decision: Decision,
    pub route: Route,
}

/// New call request
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct NewCallRequest {
    /// Caller-supplied id (telephony call id); generated when absent
    #[serde(default)]
    pub call_id: Option<String>,
}

/// New call response
#[derive(Debug, Serialize, Deserialize)]
pub struct NewCallResponse {
    pub call_id: String,
    pub interaction_id: Option<String>,
    pub state: CallState,
    pub greeting: String,
}

/// Call status response
#[derive(Debug, Serialize, Deserialize)]
pub struct CallStatusResponse {
    pub call_id: String,
    pub interaction_id: Option<String>,
    pub state: CallState,
    pub turn_number: u32,
    pub has_said_goodbye: bool,
    pub last_decision: Option<Decision>,
    pub history: Vec<HistoryEntry>,
}

/// Hang-up response
#[derive(Debug, Serialize, Deserialize)]
pub struct HangUpResponse {
    pub call_id: String,
    pub status: Option<CallStatus>,
    pub turn_number: u32,
}

#[derive(Debug, Deserialize)]
pub struct StatsParams {
    pub days: Option<u32>,
}

/// Satisfaction statistics response
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub days: Option<u32>,
    pub overall: SatisfactionStats,
    pub by_intent: Vec<IntentSatisfaction>,
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/decide", post(decide))
        .route("/call/new", post(create_call))
        .route("/call/:id", get(get_call).delete(hang_up))
        .route("/call/:id/turn", post(add_turn))
        .route("/stats/satisfaction", get(satisfaction_stats))
        .with_state(state)
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        decider: state.engine.decider_name().to_string(),
        calls_active: state.sessions.len(),
    })
}

/// Stateless decision
async fn decide(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DecideRequest>,
) -> Result<Json<DecideResponse>, ApiError> {
    let response = tokio::task::spawn_blocking(move || {
        let observation = state.engine.observe(req.transcript.as_deref(), req.emotion.as_ref(), req.audio.as_ref());
        let routed = state.engine.route(&observation)?;
        Ok::<_, CallbotError>(DecideResponse {
            observation,
            decision: routed.decision,
            route: routed.route,
        })
    })
    .await
    .map_err(join_error)??;

    Ok(Json(response))
}

/// Start a call
async fn create_call(
    State(state): State<Arc<AppState>>,
    body: Option<Json<NewCallRequest>>,
) -> Result<(StatusCode, Json<NewCallResponse>), ApiError> {
    let call_id = body
        .and_then(|Json(req)| req.call_id)
        .unwrap_or_else(|| format!("call_{}", Uuid::new_v4().simple()));

    let response = tokio::task::spawn_blocking(move || -> crate::Result<NewCallResponse> {
        if state.sessions.get(&call_id).is_some() {
            return Err(CallbotError::SessionExists(call_id));
        }
        let mut controller = TurnController::new(
            call_id.clone(),
            Arc::clone(&state.engine),
            Collaborators::with_store(Arc::clone(&state.store)),
            state.settings.clone(),
        );
        let greeting = controller.welcome();
        let interaction_id = controller.conversation().interaction_id.clone();
        let call_state = controller.state();
        state.sessions.create(&call_id, controller)?;
        Ok(NewCallResponse {
            call_id,
            interaction_id,
            state: call_state,
            greeting,
        })
    })
    .await
    .map_err(join_error)??;

    info!(call_id = %response.call_id, "call created");
    Ok((StatusCode::CREATED, Json(response)))
}

/// Call status
async fn get_call(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CallStatusResponse>, ApiError> {
    let shared = state
        .sessions
        .get(&id)
        .ok_or_else(|| CallbotError::SessionNotFound(id.clone()))?;
    let controller = shared.lock().await;
    let conversation = controller.conversation();

    Ok(Json(CallStatusResponse {
        call_id: id,
        interaction_id: conversation.interaction_id.clone(),
        state: controller.state(),
        turn_number: conversation.turn_number(),
        has_said_goodbye: conversation.has_said_goodbye,
        last_decision: controller.last_decision().copied(),
        history: conversation.conversation_history.clone(),
    }))
}

/// Caller turn
async fn add_turn(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(input): Json<TurnInput>,
) -> Result<Json<TurnOutput>, ApiError> {
    let shared = state
        .sessions
        .get(&id)
        .ok_or_else(|| CallbotError::SessionNotFound(id.clone()))?;

    let controller = Arc::clone(&shared);
    let output = tokio::task::spawn_blocking(move || controller.blocking_lock().handle_turn(&input))
        .await
        .map_err(join_error)?;

    if output.is_ended() {
        release_session(&state, &id, &shared);
        info!(call_id = %id, "call ended, session released");
    } else if output.state == CallState::FeedbackPending {
        tokio::spawn(expire_feedback(Arc::clone(&state), id, shared));
    }
    Ok(Json(output))
}

/// Remove the session only if it still maps to this controller
fn release_session(state: &AppState, id: &str, shared: &SharedController) {
    if let Some(current) = state.sessions.get(id) {
        if Arc::ptr_eq(&current, shared) {
            state.sessions.remove(id);
        }
    }
}

/// Close a call still waiting for feedback after the feedback timeout
async fn expire_feedback(state: Arc<AppState>, id: String, shared: SharedController) {
    tokio::time::sleep(state.settings.feedback_timeout).await;

    let controller = Arc::clone(&shared);
    let expired = tokio::task::spawn_blocking(move || {
        let mut controller = controller.blocking_lock();
        if controller.state() != CallState::FeedbackPending {
            return false;
        }
        controller.handle_feedback_reply(None);
        true
    })
    .await;

    match expired {
        Ok(true) => {
            release_session(&state, &id, &shared);
            info!(call_id = %id, "feedback wait timed out, session released");
        }
        Ok(false) => {}
        Err(err) => warn!(call_id = %id, %err, "feedback timeout task failed"),
    }
}

/// Hang up
async fn hang_up(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<HangUpResponse>, ApiError> {
    let shared = state
        .sessions
        .remove(&id)
        .ok_or_else(|| CallbotError::SessionNotFound(id.clone()))?;

    let response = tokio::task::spawn_blocking(move || {
        let mut controller = shared.blocking_lock();
        controller.hang_up();
        HangUpResponse {
            call_id: id,
            status: controller.status(),
            turn_number: controller.conversation().turn_number(),
        }
    })
    .await
    .map_err(join_error)?;

    Ok(Json(response))
}

/// Satisfaction statistics
async fn satisfaction_stats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StatsParams>,
) -> Result<Json<StatsResponse>, ApiError> {
    let response = tokio::task::spawn_blocking(move || {
        Ok::<_, CallbotError>(StatsResponse {
            days: params.days,
            overall: state.store.satisfaction_statistics(params.days)?,
            by_intent: state.store.satisfaction_by_intent()?,
        })
    })
    .await
    .map_err(join_error)??;

    Ok(Json(response))
}

/// Run the API server
pub async fn run_server(addr: &str, state: Arc<AppState>) -> crate::Result<()> {
    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "callbot API listening");
    axum::serve(listener, router).await?;
    Ok(())
}
