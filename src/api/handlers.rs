//! HTTP request handlers

use super::sse::snapshot_stream;
use super::types::{
    CreateSessionResponse, ErrorResponse, QueryTextRequest, QueuedResponse, SessionView,
};
use super::AppState;
use crate::runtime::{SessionClosed, SessionHandle};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Session lifecycle
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session).delete(delete_session))
        // Snapshot streaming
        .route("/api/sessions/:id/stream", get(stream_session))
        // User actions
        .route("/api/sessions/:id/query", post(set_query_text))
        .route("/api/sessions/:id/submit", post(submit_query))
        .route("/api/sessions/:id/listen", post(start_listening))
        .route("/api/sessions/:id/speak", post(speak_answer))
        .route("/api/sessions/:id/speak/stop", post(stop_speaking))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

async fn lookup(state: &AppState, id: &str) -> Result<SessionHandle, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session not found: {id}")))
}

// ============================================================
// Session Lifecycle
// ============================================================

async fn create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<CreateSessionResponse>) {
    let handle = state.sessions.create().await;
    (
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            id: handle.id().to_string(),
            snapshot: handle.snapshot().into(),
        }),
    )
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    let handle = lookup(&state, &id).await?;
    Ok(Json(handle.snapshot().into()))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if state.sessions.discard(&id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Session not found: {id}")))
    }
}

async fn stream_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let handle = lookup(&state, &id).await?;
    Ok(snapshot_stream(handle.subscribe()))
}

// ============================================================
// User Actions
// ============================================================

async fn set_query_text(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<QueryTextRequest>, JsonRejection>,
) -> Result<Json<QueuedResponse>, AppError> {
    let Json(req) = body.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let handle = lookup(&state, &id).await?;
    handle.query_text_changed(req.text).await?;
    Ok(Json(QueuedResponse::queued()))
}

async fn submit_query(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<QueuedResponse>, AppError> {
    lookup(&state, &id).await?.submit().await?;
    Ok(Json(QueuedResponse::queued()))
}

async fn start_listening(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<QueuedResponse>, AppError> {
    lookup(&state, &id).await?.request_voice_input().await?;
    Ok(Json(QueuedResponse::queued()))
}

async fn speak_answer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<QueuedResponse>, AppError> {
    lookup(&state, &id).await?.speak().await?;
    Ok(Json(QueuedResponse::queued()))
}

async fn stop_speaking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<QueuedResponse>, AppError> {
    lookup(&state, &id).await?.stop_speaking().await?;
    Ok(Json(QueuedResponse::queued()))
}

async fn get_version() -> &'static str {
    concat!("stack-assist ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
}

impl From<SessionClosed> for AppError {
    fn from(e: SessionClosed) -> Self {
        AppError::NotFound(e.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
