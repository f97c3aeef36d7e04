use super::state::AppState;
use crate::session::{LectureSession, SessionMetadata};
use crate::transcript::{export_transcript_text, transcript_file_name};
use crate::usage::{format_cost, UsageSummary};
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::{error, info};

// ============================================================================
// Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct SessionListResponse {
    pub sessions: Vec<SessionMetadata>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageResponse {
    pub session_id: String,
    /// Display string, e.g. "$0.0123"
    pub total_cost_display: String,
    #[serde(flatten)]
    pub summary: UsageSummary,
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}

fn not_found(session_id: &str) -> Response {
    error_response(
        StatusCode::NOT_FOUND,
        format!("Session {} not found", session_id),
    )
}

/// Look up a session or produce the error response to return instead
async fn load_session(state: &AppState, session_id: &str) -> Result<LectureSession, Response> {
    match state.store.get(session_id).await {
        Ok(Some(session)) => Ok(session),
        Ok(None) => Err(not_found(session_id)),
        Err(e) => {
            error!("Failed to load session {}: {:#}", session_id, e);
            Err(error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to load session: {}", e),
            ))
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /sessions
/// Session browser entries, newest first
pub async fn list_sessions(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.list_metadata().await {
        Ok(sessions) => (StatusCode::OK, Json(SessionListResponse { sessions })).into_response(),
        Err(e) => {
            error!("Failed to list sessions: {:#}", e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to list sessions: {}", e),
            )
        }
    }
}

/// GET /sessions/:session_id
/// Full session snapshot including slides and transcript
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match load_session(&state, &session_id).await {
        Ok(session) => (StatusCode::OK, Json(session)).into_response(),
        Err(response) => response,
    }
}

/// DELETE /sessions/:session_id
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    info!("Deleting session: {}", session_id);

    match state.store.delete(&session_id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => not_found(&session_id),
        Err(e) => {
            error!("Failed to delete session {}: {:#}", session_id, e);
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to delete session: {}", e),
            )
        }
    }
}

/// GET /sessions/:session_id/usage
/// Cost breakdown by tag
pub async fn get_session_usage(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let session = match load_session(&state, &session_id).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    let summary = UsageSummary::from_reports(&session.usage_reports);
    (
        StatusCode::OK,
        Json(UsageResponse {
            session_id,
            total_cost_display: format_cost(summary.total_cost),
            summary,
        }),
    )
        .into_response()
}

/// GET /sessions/:session_id/transcript
/// Plain-text transcript download
pub async fn get_session_transcript(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    let session = match load_session(&state, &session_id).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    let body = export_transcript_text(&session.general_info, &session.transcript);
    let disposition = format!(
        "attachment; filename=\"{}\"",
        transcript_file_name(&session.file_name).replace('"', "")
    );

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response()
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
