//! API request and response types

use crate::render;
use crate::session::SessionState;
use serde::{Deserialize, Serialize};

/// Snapshot as served to clients, with the answer pre-rendered
#[derive(Debug, Serialize)]
pub struct SessionView {
    #[serde(flatten)]
    pub state: SessionState,
    pub answer_html: String,
}

impl From<SessionState> for SessionView {
    fn from(state: SessionState) -> Self {
        let answer_html = render::to_html(&state.answer_text);
        Self { state, answer_html }
    }
}

/// Response for session creation
#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub id: String,
    pub snapshot: SessionView,
}

/// Request to replace the query text
#[derive(Debug, Deserialize)]
pub struct QueryTextRequest {
    pub text: String,
}

/// Response for user actions: the event is in the session queue
#[derive(Debug, Serialize)]
pub struct QueuedResponse {
    pub queued: bool,
}

impl QueuedResponse {
    pub fn queued() -> Self {
        Self { queued: true }
    }
}

/// Generic error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
