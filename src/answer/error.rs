//! Answer service error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Answer request failure with classification
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct AnswerError {
    pub kind: AnswerErrorKind,
    pub message: String,
}

impl AnswerError {
    pub fn new(kind: AnswerErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(AnswerErrorKind::NetworkFailure, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(AnswerErrorKind::MalformedResponse, message)
    }
}

/// Error classification surfaced in the session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerErrorKind {
    /// Connectivity, timeout, or a non-success status
    NetworkFailure,
    /// Success status but no usable `answer` field
    MalformedResponse,
}
