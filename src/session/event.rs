//! Events that can occur in a session

use super::state::UtteranceId;
use crate::answer::AnswerError;
use crate::voice::VoiceError;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    QueryTextChanged {
        text: String,
    },
    SubmitRequested,
    VoiceInputRequested,
    SpeakRequested {
        /// Minted by the handle so the transition stays deterministic
        utterance_id: UtteranceId,
    },
    StopSpeakingRequested,

    // Answer service events
    AnswerResolved {
        /// Epoch the request was tagged with at submission
        epoch: u64,
        outcome: Result<String, AnswerError>,
    },

    // Voice events
    RecognitionFinished {
        outcome: Result<String, VoiceError>,
    },
    UtteranceFinished {
        utterance_id: UtteranceId,
        outcome: Result<(), VoiceError>,
    },
}
