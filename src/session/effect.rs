//! Effects produced by state transitions

use super::state::UtteranceId;

/// Effects to be executed after a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Ask the answer service; the reply comes back tagged with `epoch`
    RequestAnswer { epoch: u64, query: String },

    /// Open a speech-capture session
    StartListening,

    /// Speak `text`, tearing down whatever is playing first
    StartUtterance {
        utterance_id: UtteranceId,
        text: String,
    },

    /// Hard-cancel a playing utterance
    CancelUtterance { utterance_id: UtteranceId },

    /// Push the new state to observers
    PublishSnapshot,
}
