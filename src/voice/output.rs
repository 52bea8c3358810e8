//! Text-to-speech playback

use super::VoiceError;
use crate::render;
use crate::session::{Event, UtteranceId};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, OnceCell};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A voice offered by the synthesizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoiceDescriptor {
    /// Engine-specific selector passed back to `speak`
    pub id: String,
    pub name: String,
    /// BCP-47-ish tag as reported by the engine (`en-US`, `en_GB`, `de`)
    pub locale: String,
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn voices(&self) -> Vec<VoiceDescriptor>;

    /// Play `text` until it ends or `cancel` fires. Returns once the audio
    /// stream has been released.
    async fn speak(
        &self,
        text: &str,
        voice: Option<&VoiceDescriptor>,
        cancel: CancellationToken,
    ) -> Result<(), VoiceError>;
}

#[async_trait]
impl<T: SpeechSynthesizer + ?Sized> SpeechSynthesizer for Arc<T> {
    async fn voices(&self) -> Vec<VoiceDescriptor> {
        (**self).voices().await
    }

    async fn speak(
        &self,
        text: &str,
        voice: Option<&VoiceDescriptor>,
        cancel: CancellationToken,
    ) -> Result<(), VoiceError> {
        (**self).speak(text, voice, cancel).await
    }
}

/// Synthesizer for hosts without a speech engine
#[derive(Debug, Default)]
pub struct UnavailableSynthesizer;

#[async_trait]
impl SpeechSynthesizer for UnavailableSynthesizer {
    async fn voices(&self) -> Vec<VoiceDescriptor> {
        Vec::new()
    }

    async fn speak(
        &self,
        _text: &str,
        _voice: Option<&VoiceDescriptor>,
        _cancel: CancellationToken,
    ) -> Result<(), VoiceError> {
        Err(VoiceError::SynthesisUnavailable(
            "no speech engine configured".to_string(),
        ))
    }
}

/// Pick the voice for `preferred_locale`: exact locale, then same language,
/// then whatever the engine lists first.
pub fn select_voice<'a>(
    voices: &'a [VoiceDescriptor],
    preferred_locale: &str,
) -> Option<&'a VoiceDescriptor> {
    let wanted = normalize_locale(preferred_locale);
    let language = primary_subtag(&wanted);

    voices
        .iter()
        .find(|v| normalize_locale(&v.locale) == wanted)
        .or_else(|| {
            voices
                .iter()
                .find(|v| primary_subtag(&normalize_locale(&v.locale)) == language)
        })
        .or_else(|| voices.first())
}

fn normalize_locale(locale: &str) -> String {
    locale.trim().replace('_', "-").to_ascii_lowercase()
}

fn primary_subtag(locale: &str) -> &str {
    locale.split('-').next().unwrap_or(locale)
}

struct ActiveUtterance {
    id: UtteranceId,
    cancel: CancellationToken,
}

/// Owns the speaker: at most one utterance plays at any instant.
pub struct VoiceOutputController<S: SpeechSynthesizer + ?Sized + 'static> {
    synthesizer: Arc<S>,
    preferred_locale: String,
    voices: Arc<OnceCell<Vec<VoiceDescriptor>>>,
    active: Option<ActiveUtterance>,
    playback: Option<JoinHandle<()>>,
}

impl<S: SpeechSynthesizer + ?Sized + 'static> VoiceOutputController<S> {
    pub fn new(synthesizer: Arc<S>, preferred_locale: impl Into<String>) -> Self {
        Self {
            synthesizer,
            preferred_locale: preferred_locale.into(),
            voices: Arc::new(OnceCell::new()),
            active: None,
            playback: None,
        }
    }

    pub fn active(&self) -> Option<UtteranceId> {
        self.active.as_ref().map(|a| a.id)
    }

    /// Start speaking `text` as `utterance_id`, reporting the end of playback
    /// to `done` as `Event::UtteranceFinished`.
    ///
    /// Any playing utterance is cancelled, and the new one does not reach the
    /// engine until the old stream has been released.
    pub fn speak(&mut self, utterance_id: UtteranceId, text: &str, done: mpsc::Sender<Event>) {
        self.stop();
        let previous = self.playback.take();

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let speech = render::speakable_text(text);
        let synthesizer = self.synthesizer.clone();
        let voices = self.voices.clone();
        let locale = self.preferred_locale.clone();

        self.playback = Some(tokio::spawn(async move {
            if let Some(previous) = previous {
                let _ = previous.await;
            }

            let outcome = if token.is_cancelled() || speech.is_empty() {
                Ok(())
            } else {
                let voices = voices.get_or_init(|| synthesizer.voices()).await;
                let voice = select_voice(voices, &locale);
                if let Some(voice) = voice {
                    tracing::debug!(%utterance_id, voice = %voice.name, locale = %voice.locale, "Selected voice");
                }
                synthesizer.speak(&speech, voice, token).await
            };

            let _ = done
                .send(Event::UtteranceFinished {
                    utterance_id,
                    outcome,
                })
                .await;
        }));

        self.active = Some(ActiveUtterance {
            id: utterance_id,
            cancel,
        });
    }

    /// Hard-cancel `utterance_id` if it is the one playing
    pub fn cancel(&mut self, utterance_id: UtteranceId) {
        if self.active() == Some(utterance_id) {
            self.stop();
        }
    }

    /// Cancel whatever is playing. Harmless when silent.
    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            tracing::debug!(utterance_id = %active.id, "Cancelling utterance");
            active.cancel.cancel();
        }
    }

    /// Forget `utterance_id` after it ended on its own
    pub fn finished(&mut self, utterance_id: UtteranceId) {
        if self.active() == Some(utterance_id) {
            self.active = None;
        }
    }
}
