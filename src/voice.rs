//! Speech capture and playback
//!
//! Each channel has a controller that owns the device slot and a trait for
//! the platform engine behind it.

mod command;
mod error;
mod input;
mod output;

pub use command::{CommandRecognizer, CommandSynthesizer, SpeechEngine};
pub use error::VoiceError;
pub use input::{SpeechRecognizer, UnavailableRecognizer, VoiceInputController};
pub use output::{
    SpeechSynthesizer, UnavailableSynthesizer, VoiceDescriptor, VoiceOutputController,
};
