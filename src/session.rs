//! Query/voice session state machine
//!
//! Elm-style: a pure `transition` maps (state, event) to a new state plus
//! effects, and the runtime performs the effects.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{QueryStatus, SessionState, UtteranceId, VoiceInputStatus, VoiceOutputStatus};
pub use transition::transition;
