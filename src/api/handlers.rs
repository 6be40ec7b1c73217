//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{extract::State, http::StatusCode, response::Json};
use serde::Deserialize;
use tracing::{error, info};

use crate::error::TimerError;
use crate::state::{AppState, StartPolicy, StartRequest, TimerMode};
use super::responses::{ApiResponse, HealthResponse, StatusResponse};

/// Request body for POST /start
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartBody {
    pub topic_id: String,
    #[serde(default)]
    pub description: Option<String>,
    pub mode: TimerMode,
    /// Target duration in whole minutes; required for count-down sessions
    #[serde(default)]
    pub duration_minutes: Option<u64>,
    /// What to do when a session is already active; defaults to rejecting
    #[serde(default)]
    pub if_active: StartPolicy,
}

impl StartBody {
    fn into_request(self) -> (StartRequest, StartPolicy) {
        let request = StartRequest {
            topic_id: self.topic_id,
            description: self.description,
            mode: self.mode,
            duration_seconds: self.duration_minutes.map(|m| m.saturating_mul(60)),
        };
        (request, self.if_active)
    }
}

type CommandResult = Result<Json<ApiResponse>, (StatusCode, Json<ApiResponse>)>;

/// Handle POST /start - Begin a tracking session
pub async fn start_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<StartBody>,
) -> CommandResult {
    let (request, policy) = body.into_request();
    match state.clone().start_session(request, policy).await {
        Ok(timer) => {
            info!("Start endpoint called - session running");
            Ok(Json(ApiResponse::ok(
                "Tracking session started".to_string(),
                timer,
            )))
        }
        Err(e) => Err(rejection(&state, e).await),
    }
}

/// Handle POST /pause - Freeze the running session
pub async fn pause_handler(State(state): State<Arc<AppState>>) -> CommandResult {
    match state.pause_session().await {
        Ok(timer) => {
            info!("Pause endpoint called - session paused");
            Ok(Json(ApiResponse::ok(
                "Tracking session paused".to_string(),
                timer,
            )))
        }
        Err(e) => Err(rejection(&state, e).await),
    }
}

/// Handle POST /resume - Continue a paused session
pub async fn resume_handler(State(state): State<Arc<AppState>>) -> CommandResult {
    match state.clone().resume_session().await {
        Ok(timer) => {
            info!("Resume endpoint called - session running");
            Ok(Json(ApiResponse::ok(
                "Tracking session resumed".to_string(),
                timer,
            )))
        }
        Err(e) => Err(rejection(&state, e).await),
    }
}

/// Handle POST /stop - Finish the session and submit its time entry
pub async fn stop_handler(State(state): State<Arc<AppState>>) -> CommandResult {
    match state.stop_session().await {
        Ok(finished) => {
            if let Some(e) = finished.submission_error {
                // the session is finished locally; only the entry write failed
                return Err(rejection(&state, TimerError::Submission(e)).await);
            }
            info!("Stop endpoint called - session finished");
            Ok(Json(ApiResponse::ok(
                "Tracking session stopped".to_string(),
                finished.view,
            )))
        }
        Err(e) => Err(rejection(&state, e).await),
    }
}

/// Handle POST /reset - Drop the session without submitting anything
pub async fn reset_handler(State(state): State<Arc<AppState>>) -> Json<ApiResponse> {
    let timer = state.reset_session().await;
    info!("Reset endpoint called - timer idle");
    Json(ApiResponse::ok("Timer reset".to_string(), timer))
}

/// Handle GET /status - Return current timer status and server metadata
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let (last_action, last_action_time) = state.get_last_action();

    Json(StatusResponse {
        timer: state.get_timer_view().await,
        errors: state.get_errors(),
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    })
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

async fn rejection(state: &Arc<AppState>, err: TimerError) -> (StatusCode, Json<ApiResponse>) {
    let code = match &err {
        TimerError::InvalidCommand { .. } | TimerError::SessionActive { .. } => {
            StatusCode::CONFLICT
        }
        TimerError::MissingTopic | TimerError::InvalidDuration => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        TimerError::Submission(_) => StatusCode::BAD_GATEWAY,
    };
    error!("Timer command rejected: {}", err);
    (
        code,
        Json(ApiResponse::error(
            err.to_string(),
            state.get_timer_view().await,
        )),
    )
}
