//! Session state types

use crate::answer::AnswerErrorKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque handle identifying one speech-output session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UtteranceId(Uuid);

impl UtteranceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Deterministic ids for property tests
    #[cfg(test)]
    pub(crate) fn from_u128(n: u128) -> Self {
        Self(Uuid::from_u128(n))
    }
}

impl Default for UtteranceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle of the most recent answer request
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryStatus {
    /// Nothing submitted yet
    #[default]
    Idle,

    /// Request in flight for the current epoch
    Pending,

    /// Latest request produced `answer_text`
    Succeeded,

    /// Latest request failed; the previous answer stays visible
    Failed {
        error_kind: AnswerErrorKind,
        message: String,
    },
}

/// Whether a speech-capture session is open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceInputStatus {
    #[default]
    Inactive,
    Listening,
}

/// Whether an utterance is playing, and which one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VoiceOutputStatus {
    #[default]
    Silent,
    Speaking { utterance_id: UtteranceId },
}

/// Everything the presentation layer renders for one assistant view.
///
/// Only `transition` produces new values; observers get read-only clones.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionState {
    /// Editable query, set by typing or by a finished recognition
    pub query_text: String,
    /// Last successful answer (markup); empty until the first success
    pub answer_text: String,
    pub query_status: QueryStatus,
    pub voice_input: VoiceInputStatus,
    pub voice_output: VoiceOutputStatus,
    /// Bumped on every accepted submission; replies tagged with an older
    /// epoch are discarded
    pub request_epoch: u64,
}

impl SessionState {
    pub fn active_utterance_id(&self) -> Option<UtteranceId> {
        match self.voice_output {
            VoiceOutputStatus::Speaking { utterance_id } => Some(utterance_id),
            VoiceOutputStatus::Silent => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.query_status == QueryStatus::Pending
    }

    pub fn is_listening(&self) -> bool {
        self.voice_input == VoiceInputStatus::Listening
    }

    pub fn is_speaking(&self) -> bool {
        self.active_utterance_id().is_some()
    }
}
