//! Speech-to-text capture

use super::VoiceError;
use crate::session::Event;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Platform speech recognition: one locale-tagged capture per call
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Capture a single utterance and return its transcript.
    ///
    /// Once `cancel` fires the capture must release the device and return.
    async fn recognize(
        &self,
        language: &str,
        cancel: CancellationToken,
    ) -> Result<String, VoiceError>;
}

#[async_trait]
impl<T: SpeechRecognizer + ?Sized> SpeechRecognizer for Arc<T> {
    async fn recognize(
        &self,
        language: &str,
        cancel: CancellationToken,
    ) -> Result<String, VoiceError> {
        (**self).recognize(language, cancel).await
    }
}

/// Recognizer for hosts without a capture engine
#[derive(Debug, Default)]
pub struct UnavailableRecognizer;

#[async_trait]
impl SpeechRecognizer for UnavailableRecognizer {
    async fn recognize(
        &self,
        _language: &str,
        _cancel: CancellationToken,
    ) -> Result<String, VoiceError> {
        Err(VoiceError::RecognitionFailed(
            "speech recognition is not configured".to_string(),
        ))
    }
}

/// Owns the microphone: at most one capture session at a time
pub struct VoiceInputController<R: SpeechRecognizer + ?Sized + 'static> {
    recognizer: Arc<R>,
    language: String,
    capture: Option<CancellationToken>,
}

impl<R: SpeechRecognizer + ?Sized + 'static> VoiceInputController<R> {
    pub fn new(recognizer: Arc<R>, language: impl Into<String>) -> Self {
        Self {
            recognizer,
            language: language.into(),
            capture: None,
        }
    }

    #[cfg(test)]
    pub fn is_listening(&self) -> bool {
        self.capture.is_some()
    }

    /// Open a capture session whose single result is delivered to `done` as
    /// `Event::RecognitionFinished`.
    ///
    /// Returns `false` without touching the device if a session is open.
    pub fn start_listening(&mut self, done: mpsc::Sender<Event>) -> bool {
        if self.capture.is_some() {
            return false;
        }

        let recognizer = self.recognizer.clone();
        let language = self.language.clone();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        tokio::spawn(async move {
            let outcome = recognizer
                .recognize(&language, token.clone())
                .await
                .and_then(|text| {
                    let text = text.trim();
                    if text.is_empty() {
                        Err(VoiceError::NoSpeechDetected)
                    } else {
                        Ok(text.to_string())
                    }
                });
            if token.is_cancelled() {
                return;
            }
            let _ = done.send(Event::RecognitionFinished { outcome }).await;
        });
        self.capture = Some(cancel);
        true
    }

    /// Free the slot once the session's result has been consumed
    pub fn release(&mut self) {
        self.capture = None;
    }

    /// Drop an open session without delivering its result.
    ///
    /// The recognizer sees the cancellation and tears down its engine; the
    /// capture task is left to finish that on its own.
    pub fn abort(&mut self) {
        if let Some(cancel) = self.capture.take() {
            cancel.cancel();
        }
    }
}
