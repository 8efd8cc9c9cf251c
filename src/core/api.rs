//! HTTP + WebSocket API for Blinkscan
//!
//! Endpoints:
//! - POST /session/new - Create and start a session
//! - GET /session/{id} - Get session status
//! - POST /session/{id}/eye - Feed an eye reading or face sample
//! - POST /session/{id}/pause, /reset, /resume - Scan commands
//! - POST /session/{id}/interval - Change cadence (stop + restart)
//! - GET /session/{id}/log-entry - Current frame log entry
//! - DELETE /session/{id} - Stop and drop a session
//! - WS /ws/{id} - Live session events
//! - GET /health - Health check

use axum::{
    extract::{Path, State, WebSocketUpgrade, ws::{Message, WebSocket}},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{info, warn};

use crate::DEFAULT_TICK_INTERVAL_MS;
use crate::core::{default_alphabet, new_session_id, FrameLogWriter, ScanSession, SessionConfig, SessionHandle};
use crate::types::{
    Alphabet, BlinkEdge, BlinkState, EyeSample, FrameLogEntry, PendingCommand, ScanState,
    Sensitivity, SessionEvent, SessionMode,
};

/// Server-wide settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub alphabet: Arc<Alphabet>,
    /// Where frame logs go; recording is refused when unset
    pub log_dir: Option<String>,
    pub sensitivity: Sensitivity,
    pub default_interval_ms: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            alphabet: Arc::new(default_alphabet()),
            log_dir: None,
            sensitivity: Sensitivity::default(),
            default_interval_ms: DEFAULT_TICK_INTERVAL_MS,
        }
    }
}

/// App state
pub struct AppState {
    pub sessions: RwLock<HashMap<String, SessionHandle>>,
    pub config: ServerConfig,
}

/// Create new session request
#[derive(Debug, Default, Deserialize)]
pub struct NewSessionRequest {
    pub mode: Option<SessionMode>,
    pub interval_ms: Option<u32>,
    pub sensitivity: Option<Sensitivity>,
    /// Write a frame log for this session
    #[serde(default)]
    pub record: bool,
}

/// Create new session response
#[derive(Debug, Serialize)]
pub struct NewSessionResponse {
    pub session_id: String,
    pub websocket_url: String,
    pub log_path: Option<String>,
}

/// Session status response
#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub session_id: String,
    pub mode: SessionMode,
    pub running: bool,
    pub interval_ms: u32,
    pub tick_index: u64,
    pub highlighted_index: usize,
    pub highlighted_label: Option<String>,
    pub pending_command: PendingCommand,
    pub paused: bool,
    pub blink_state: BlinkState,
    pub training_word: Option<String>,
    pub training_char: Option<String>,
}

/// Eye input: either a thresholded reading or a raw tracker sample
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum EyeRequest {
    Signal { open: bool },
    Sample(EyeSample),
}

#[derive(Debug, Serialize)]
pub struct EyeResponse {
    pub edge: Option<BlinkEdge>,
    pub blink_state: BlinkState,
}

#[derive(Debug, Serialize)]
pub struct CommandResponse {
    pub pending_command: PendingCommand,
}

#[derive(Debug, Deserialize)]
pub struct IntervalRequest {
    pub interval_ms: u32,
}

#[derive(Debug, Serialize)]
pub struct StopResponse {
    pub session_id: String,
    /// Last state before teardown, if the session was running
    pub last_state: Option<ScanState>,
    pub log_lines: Option<u64>,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub sessions_active: usize,
}

/// Create the API router
pub fn create_router(config: ServerConfig) -> Router {
    let state = Arc::new(AppState {
        sessions: RwLock::new(HashMap::new()),
        config,
    });

    Router::new()
        .route("/health", get(health))
        .route("/session/new", post(create_session))
        .route("/session/:id", get(get_session).delete(delete_session))
        .route("/session/:id/eye", post(eye_input))
        .route("/session/:id/pause", post(pause_session))
        .route("/session/:id/reset", post(reset_session))
        .route("/session/:id/resume", post(resume_session))
        .route("/session/:id/interval", post(set_interval))
        .route("/session/:id/log-entry", get(get_log_entry))
        .route("/ws/:id", get(websocket_handler))
        .with_state(state)
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let sessions = state.sessions.read().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        sessions_active: sessions.len(),
    })
}

/// Look up a session handle without holding the map lock afterwards
async fn find(state: &AppState, id: &str) -> Result<SessionHandle, StatusCode> {
    state
        .sessions
        .read()
        .await
        .get(id)
        .cloned()
        .ok_or(StatusCode::NOT_FOUND)
}

/// Create and start a session
async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewSessionRequest>,
) -> Result<Json<NewSessionResponse>, StatusCode> {
    let mode = req.mode.unwrap_or_default();
    let config = SessionConfig {
        mode,
        tick_interval_ms: req.interval_ms.unwrap_or(state.config.default_interval_ms),
        sensitivity: req.sensitivity.unwrap_or(state.config.sensitivity),
    };

    let mut sessions = state.sessions.write().await;

    // Two sessions created in the same millisecond get a suffix
    let base = new_session_id(mode, Utc::now());
    let mut session_id = base.clone();
    let mut n = 1;
    while sessions.contains_key(&session_id) {
        n += 1;
        session_id = format!("{}-{}", base, n);
    }

    let session = ScanSession::new(session_id.clone(), state.config.alphabet.clone(), config)
        .map_err(|e| {
            warn!(error = %e, "session rejected");
            StatusCode::BAD_REQUEST
        })?;

    let (handle, log_path) = if req.record {
        let dir = state.config.log_dir.as_ref().ok_or(StatusCode::BAD_REQUEST)?;
        let writer = FrameLogWriter::spawn(dir, &session_id);
        let path = writer.path().display().to_string();
        (SessionHandle::with_log(session, writer), Some(path))
    } else {
        (SessionHandle::new(session), None)
    };

    handle.start().await.map_err(|_| StatusCode::BAD_REQUEST)?;
    sessions.insert(session_id.clone(), handle);
    info!(session = %session_id, %mode, "session created");

    Ok(Json(NewSessionResponse {
        websocket_url: format!("/ws/{}", session_id),
        session_id,
        log_path,
    }))
}

/// Get session status
async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionStatusResponse>, StatusCode> {
    let handle = find(&state, &id).await?;
    let running = handle.is_running().await;

    let status = handle
        .with_session(|s| SessionStatusResponse {
            session_id: id.clone(),
            mode: s.mode(),
            running,
            interval_ms: s.tick_interval_ms(),
            tick_index: s.state().tick_index,
            highlighted_index: s.state().highlighted_index,
            highlighted_label: s.highlighted().map(|c| c.label.clone()),
            pending_command: s.state().pending_command,
            paused: s.state().is_paused(),
            blink_state: s.blink_state(),
            training_word: s.training_word().map(str::to_string),
            training_char: s.training_target().map(|c| c.label.clone()),
        })
        .await;

    Ok(Json(status))
}

/// Feed eye input
async fn eye_input(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<EyeRequest>,
) -> Result<Json<EyeResponse>, StatusCode> {
    let handle = find(&state, &id).await?;
    let edge = match req {
        EyeRequest::Signal { open } => handle.eye_signal(open).await,
        EyeRequest::Sample(sample) => handle.eye_sample(sample).await,
    };
    let blink_state = handle.with_session(|s| s.blink_state()).await;
    Ok(Json(EyeResponse { edge, blink_state }))
}

async fn pending(handle: &SessionHandle) -> Json<CommandResponse> {
    let pending_command = handle.with_session(|s| s.state().pending_command).await;
    Json(CommandResponse { pending_command })
}

async fn pause_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CommandResponse>, StatusCode> {
    let handle = find(&state, &id).await?;
    handle.pause().await;
    Ok(pending(&handle).await)
}

async fn reset_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CommandResponse>, StatusCode> {
    let handle = find(&state, &id).await?;
    handle.reset().await;
    Ok(pending(&handle).await)
}

async fn resume_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<CommandResponse>, StatusCode> {
    let handle = find(&state, &id).await?;
    handle.resume().await;
    Ok(pending(&handle).await)
}

/// Change cadence
async fn set_interval(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<IntervalRequest>,
) -> Result<StatusCode, StatusCode> {
    let handle = find(&state, &id).await?;
    handle
        .set_interval(req.interval_ms)
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Current frame log entry
async fn get_log_entry(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<FrameLogEntry>, StatusCode> {
    let handle = find(&state, &id).await?;
    Ok(Json(handle.build_log_entry().await))
}

/// Stop and remove a session
async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<StopResponse>, StatusCode> {
    let handle = state
        .sessions
        .write()
        .await
        .remove(&id)
        .ok_or(StatusCode::NOT_FOUND)?;

    // Capture the last state before shutdown tears it down
    let last_state = handle.stop().await;
    let log_lines = handle.shutdown().await.map_err(|e| {
        warn!(session = %id, error = %e, "frame log could not be flushed");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(StopResponse {
        session_id: id,
        last_state,
        log_lines,
    }))
}

/// WebSocket handler for live updates
async fn websocket_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, StatusCode> {
    let handle = find(&state, &id).await?;
    let rx = handle.subscribe();

    Ok(ws.on_upgrade(move |socket| async move {
        handle_websocket(socket, rx).await;
    }))
}

/// Forward session events until either side goes away
async fn handle_websocket(socket: WebSocket, mut rx: broadcast::Receiver<SessionEvent>) {
    let (mut sender, mut receiver) = socket.split();
    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(event) => {
                    let json = serde_json::to_string(&event).unwrap_or_default();
                    if sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "websocket client lagging, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
}

/// Run the API server
pub async fn run_server(addr: &str, config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let router = create_router(config);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Blinkscan API running on {}", addr);
    info!("  POST   /session/new           - Create session");
    info!("  GET    /session/:id           - Get status");
    info!("  POST   /session/:id/eye       - Eye reading / face sample");
    info!("  POST   /session/:id/pause     - Pause scan");
    info!("  POST   /session/:id/reset     - Restart scan");
    info!("  POST   /session/:id/resume    - Clear pause");
    info!("  POST   /session/:id/interval  - Change cadence");
    info!("  GET    /session/:id/log-entry - Current log entry");
    info!("  DELETE /session/:id           - Stop session");
    info!("  WS     /ws/:id                - Live updates");
    info!("  GET    /health                - Health check");
    axum::serve(listener, router).await?;
    Ok(())
}
