//! HTTP request handlers

use super::types::{
    ActivityRequest, ErrorResponse, LoginRequest, StackResponse, SuccessResponse,
    TranscriptResponse,
};
use super::AppState;
use crate::runtime::{RuntimeError, TurnOutcome};
use crate::services::AccessToken;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, Utc};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // One turn per inbound activity
        .route("/api/conversations/:id/activities", post(post_activity))
        // Sign-in callback and sign-out
        .route("/api/conversations/:id/login", post(login))
        .route("/api/conversations/:id/logout", post(logout))
        // Inspection
        .route("/api/conversations/:id/stack", get(get_stack))
        .route("/api/conversations/:id/transcript", get(get_transcript))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Turns
// ============================================================

async fn post_activity(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ActivityRequest>,
) -> Result<Json<TurnOutcome>, AppError> {
    let activity = req
        .into_activity()
        .ok_or_else(|| AppError::BadRequest("Activity needs text or a value".to_string()))?;

    let outcome = state.runtime.handle_activity(&id, activity).await?;
    Ok(Json(outcome))
}

// ============================================================
// Sign-in
// ============================================================

async fn login(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    if req.token.trim().is_empty() {
        return Err(AppError::BadRequest("Token cannot be empty".to_string()));
    }

    let expires_at = req
        .expires_in_secs
        .map(|secs| Utc::now() + Duration::seconds(i64::from(secs)));
    state
        .tokens
        .deposit(&id, AccessToken::new(req.token, expires_at))
        .await;

    Ok(Json(SuccessResponse { success: true }))
}

async fn logout(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.runtime.logout(&id).await?;
    Ok(Json(SuccessResponse { success: true }))
}

// ============================================================
// Inspection
// ============================================================

async fn get_stack(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StackResponse>, AppError> {
    let stack = state.runtime.stack(&id).await?;
    Ok(Json(StackResponse {
        waiting: stack.is_waiting(),
        depth: stack.depth(),
        stack: stack.redacted(),
    }))
}

async fn get_transcript(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TranscriptResponse>, AppError> {
    let entries = state.runtime.transcript(&id).await?;
    Ok(Json(TranscriptResponse { entries }))
}

async fn get_version() -> &'static str {
    concat!("turnstack ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    Internal(String),
}

impl From<RuntimeError> for AppError {
    fn from(e: RuntimeError) -> Self {
        tracing::error!(error = %e, "Request failed");
        AppError::Internal(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
