//! Session runtime executor

use crate::answer::{AnswerClient, AnswerError};
use crate::session::{transition, Effect, Event, SessionState};
use crate::voice::{
    SpeechRecognizer, SpeechSynthesizer, VoiceError, VoiceInputController, VoiceOutputController,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Owns one session's state and devices. Events are handled strictly in
/// arrival order; every slow operation runs in a spawned task that reports
/// back through `event_tx`.
///
/// The runtime keeps only a weak sender, so the loop ends on its own once
/// every `SessionHandle` is gone and in-flight work has reported back.
pub struct SessionRuntime<A, R, S>
where
    A: AnswerClient + ?Sized + 'static,
    R: SpeechRecognizer + ?Sized + 'static,
    S: SpeechSynthesizer + ?Sized + 'static,
{
    session_id: String,
    state: SessionState,
    answer_client: Arc<A>,
    answer_timeout: Duration,
    voice_input: VoiceInputController<R>,
    voice_output: VoiceOutputController<S>,
    event_rx: mpsc::Receiver<Event>,
    event_tx: mpsc::WeakSender<Event>,
    snapshot_tx: watch::Sender<SessionState>,
    shutdown: CancellationToken,
}

impl<A, R, S> SessionRuntime<A, R, S>
where
    A: AnswerClient + ?Sized + 'static,
    R: SpeechRecognizer + ?Sized + 'static,
    S: SpeechSynthesizer + ?Sized + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session_id: String,
        answer_client: Arc<A>,
        answer_timeout: Duration,
        voice_input: VoiceInputController<R>,
        voice_output: VoiceOutputController<S>,
        event_rx: mpsc::Receiver<Event>,
        event_tx: mpsc::WeakSender<Event>,
        snapshot_tx: watch::Sender<SessionState>,
        shutdown: CancellationToken,
    ) -> Self {
        let state = snapshot_tx.borrow().clone();
        Self {
            session_id,
            state,
            answer_client,
            answer_timeout,
            voice_input,
            voice_output,
            event_rx,
            event_tx,
            snapshot_tx,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        tracing::info!(session_id = %self.session_id, "Starting session runtime");

        loop {
            tokio::select! {
                biased;

                () = self.shutdown.cancelled() => break,

                event = self.event_rx.recv() => match event {
                    Some(event) => self.process_event(event),
                    None => {
                        tracing::debug!(session_id = %self.session_id, "All handles dropped");
                        break;
                    }
                },
            }
        }

        // Release both devices before the task ends
        self.voice_output.stop();
        self.voice_input.abort();

        tracing::info!(session_id = %self.session_id, "Session runtime stopped");
    }

    fn process_event(&mut self, event: Event) {
        match &event {
            Event::AnswerResolved { epoch, .. } if *epoch != self.state.request_epoch => {
                tracing::debug!(
                    session_id = %self.session_id,
                    epoch,
                    current_epoch = self.state.request_epoch,
                    "Discarding superseded answer"
                );
            }
            Event::AnswerResolved {
                outcome: Err(e), ..
            } => {
                tracing::warn!(session_id = %self.session_id, kind = ?e.kind, error = %e, "Answer request failed");
            }
            Event::RecognitionFinished { outcome } => {
                self.voice_input.release();
                if let Err(e) = outcome {
                    self.log_voice_error("recognition", e);
                }
            }
            Event::UtteranceFinished {
                utterance_id,
                outcome,
            } => {
                self.voice_output.finished(*utterance_id);
                if let Err(e) = outcome {
                    self.log_voice_error("synthesis", e);
                }
            }
            _ => {}
        }

        // Pure state transition
        let result = match transition(&self.state, event) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(session_id = %self.session_id, error = %e, "Rejected event");
                return;
            }
        };

        self.state = result.new_state;
        for effect in result.effects {
            self.execute_effect(effect);
        }
    }

    fn log_voice_error(&self, channel: &str, error: &VoiceError) {
        match error {
            VoiceError::NoSpeechDetected => {
                tracing::info!(session_id = %self.session_id, channel, "No speech detected");
            }
            _ => {
                tracing::warn!(session_id = %self.session_id, channel, error = %error, "Voice channel failed");
            }
        }
    }

    /// Sender for a spawned task's completion; `None` once no handle is left
    fn completion_sender(&self) -> Option<mpsc::Sender<Event>> {
        let sender = self.event_tx.upgrade();
        if sender.is_none() {
            tracing::debug!(session_id = %self.session_id, "No handles left, skipping effect");
        }
        sender
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::RequestAnswer { epoch, query } => {
                let Some(event_tx) = self.completion_sender() else {
                    return;
                };
                let client = self.answer_client.clone();
                let timeout = self.answer_timeout;
                let session_id = self.session_id.clone();

                tokio::spawn(async move {
                    tracing::info!(%session_id, epoch, query_chars = query.chars().count(), "Requesting answer");
                    let outcome = match tokio::time::timeout(timeout, client.ask(&query)).await {
                        Ok(outcome) => outcome,
                        Err(_) => Err(AnswerError::network(format!(
                            "Request timed out after {}s",
                            timeout.as_secs()
                        ))),
                    };
                    let _ = event_tx.send(Event::AnswerResolved { epoch, outcome }).await;
                });
            }

            Effect::StartListening => {
                let Some(done) = self.completion_sender() else {
                    return;
                };
                if !self.voice_input.start_listening(done) {
                    tracing::debug!(session_id = %self.session_id, "Capture already open");
                }
            }

            Effect::StartUtterance { utterance_id, text } => {
                let Some(done) = self.completion_sender() else {
                    return;
                };
                tracing::info!(session_id = %self.session_id, %utterance_id, "Speaking answer");
                self.voice_output.speak(utterance_id, &text, done);
            }

            Effect::CancelUtterance { utterance_id } => {
                self.voice_output.cancel(utterance_id);
            }

            Effect::PublishSnapshot => {
                self.snapshot_tx.send_replace(self.state.clone());
            }
        }
    }
}
