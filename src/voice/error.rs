//! Voice channel error types

use thiserror::Error;

/// Failures of speech capture or playback.
///
/// None of these reach the caller: the runtime logs them and resolves the
/// channel back to `Inactive` / `Silent`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoiceError {
    #[error("Speech recognition failed: {0}")]
    RecognitionFailed(String),

    #[error("No speech detected")]
    NoSpeechDetected,

    #[error("Speech synthesis unavailable: {0}")]
    SynthesisUnavailable(String),

    #[error("Speech synthesis failed: {0}")]
    SynthesisFailed(String),
}
