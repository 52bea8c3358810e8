//! Pure state transition function
//!
//! Given the same state and event, `transition` always yields the same new
//! state and effects. All I/O happens in the runtime that executes the
//! effects.

use super::state::{QueryStatus, SessionState, VoiceInputStatus, VoiceOutputStatus};
use super::{Effect, Event};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SessionState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SessionState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    /// The event was accepted but changes nothing
    pub fn unchanged(state: &SessionState) -> Self {
        Self::new(state.clone())
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }

    #[cfg(test)]
    pub fn is_noop(&self) -> bool {
        self.effects.is_empty()
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Unexpected event: {0}")]
    UnexpectedEvent(String),
}

/// Pure transition function
pub fn transition(
    state: &SessionState,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match event {
        // ============================================================
        // Query text
        // ============================================================
        Event::QueryTextChanged { text } => {
            if text == state.query_text {
                return Ok(TransitionResult::unchanged(state));
            }
            let mut next = state.clone();
            next.query_text = text;
            Ok(TransitionResult::new(next).with_effect(Effect::PublishSnapshot))
        }

        // ============================================================
        // Submission and answers
        // ============================================================

        // Empty query -> no epoch bump, no request
        Event::SubmitRequested if state.query_text.is_empty() => {
            Ok(TransitionResult::unchanged(state))
        }

        // Any status -> Pending under a fresh epoch; an older in-flight reply
        // becomes inert
        Event::SubmitRequested => {
            let epoch = state.request_epoch + 1;
            let mut next = state.clone();
            next.request_epoch = epoch;
            next.query_status = QueryStatus::Pending;
            Ok(TransitionResult::new(next).with_effects([
                Effect::RequestAnswer {
                    epoch,
                    query: state.query_text.clone(),
                },
                Effect::PublishSnapshot,
            ]))
        }

        // Superseded or duplicate reply -> discarded unconditionally
        Event::AnswerResolved { epoch, .. }
            if epoch != state.request_epoch || !state.is_pending() =>
        {
            Ok(TransitionResult::unchanged(state))
        }

        Event::AnswerResolved { outcome, .. } => {
            let mut next = state.clone();
            match outcome {
                Ok(answer) => {
                    next.answer_text = answer;
                    next.query_status = QueryStatus::Succeeded;
                }
                Err(e) => {
                    // answer_text is left as it was
                    next.query_status = QueryStatus::Failed {
                        error_kind: e.kind,
                        message: e.message,
                    };
                }
            }
            Ok(TransitionResult::new(next).with_effect(Effect::PublishSnapshot))
        }

        // ============================================================
        // Voice input
        // ============================================================

        // Capture device is single-slot: a second request is a no-op
        Event::VoiceInputRequested if state.is_listening() => {
            Ok(TransitionResult::unchanged(state))
        }

        Event::VoiceInputRequested => {
            let mut next = state.clone();
            next.voice_input = VoiceInputStatus::Listening;
            Ok(TransitionResult::new(next)
                .with_effect(Effect::StartListening)
                .with_effect(Effect::PublishSnapshot))
        }

        Event::RecognitionFinished { .. } if !state.is_listening() => Err(
            TransitionError::UnexpectedEvent("recognition result while not listening".to_string()),
        ),

        // Never submits: query_status is untouched
        Event::RecognitionFinished { outcome } => {
            let mut next = state.clone();
            next.voice_input = VoiceInputStatus::Inactive;
            if let Ok(text) = outcome {
                if !text.trim().is_empty() {
                    next.query_text = text;
                }
            }
            Ok(TransitionResult::new(next).with_effect(Effect::PublishSnapshot))
        }

        // ============================================================
        // Voice output
        // ============================================================
        Event::SpeakRequested { .. } if state.answer_text.is_empty() => {
            Ok(TransitionResult::unchanged(state))
        }

        Event::SpeakRequested { utterance_id } => {
            let mut next = state.clone();
            next.voice_output = VoiceOutputStatus::Speaking { utterance_id };
            let teardown = state
                .active_utterance_id()
                .map(|active| Effect::CancelUtterance {
                    utterance_id: active,
                });
            Ok(TransitionResult::new(next)
                .with_effects(teardown)
                .with_effect(Effect::StartUtterance {
                    utterance_id,
                    text: state.answer_text.clone(),
                })
                .with_effect(Effect::PublishSnapshot))
        }

        Event::StopSpeakingRequested => match state.active_utterance_id() {
            None => Ok(TransitionResult::unchanged(state)),
            Some(utterance_id) => {
                let mut next = state.clone();
                next.voice_output = VoiceOutputStatus::Silent;
                Ok(TransitionResult::new(next)
                    .with_effect(Effect::CancelUtterance { utterance_id })
                    .with_effect(Effect::PublishSnapshot))
            }
        },

        // Natural end (or failure) of the active utterance -> Silent.
        // Completions from torn-down utterances are ignored.
        Event::UtteranceFinished { utterance_id, .. } => {
            if state.active_utterance_id() != Some(utterance_id) {
                return Ok(TransitionResult::unchanged(state));
            }
            let mut next = state.clone();
            next.voice_output = VoiceOutputStatus::Silent;
            Ok(TransitionResult::new(next).with_effect(Effect::PublishSnapshot))
        }
    }
}
