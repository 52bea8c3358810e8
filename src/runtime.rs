//! Runtime for executing assistant sessions
//!
//! Each session runs as one task that owns its state; callers talk to it
//! through a cloneable [`SessionHandle`] and observe it through a
//! `watch` channel of snapshots.

mod executor;


pub use executor::SessionRuntime;

use crate::answer::AnswerClient;
use crate::session::{Event, SessionState, UtteranceId};
use crate::voice::{
    SpeechRecognizer, SpeechSynthesizer, VoiceInputController, VoiceOutputController,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch, RwLock};
use tokio_util::sync::CancellationToken;

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Per-session knobs shared by every session a manager creates
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub answer_timeout: Duration,
    /// Locale for recognition and voice selection
    pub language: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            answer_timeout: Duration::from_secs(60),
            language: "en-US".to_string(),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Session {0} is closed")]
pub struct SessionClosed(pub String);

/// Handle to interact with a running session
#[derive(Clone)]
pub struct SessionHandle {
    id: String,
    event_tx: mpsc::Sender<Event>,
    snapshot_rx: watch::Receiver<SessionState>,
    shutdown: CancellationToken,
}

impl SessionHandle {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Latest published state
    pub fn snapshot(&self) -> SessionState {
        self.snapshot_rx.borrow().clone()
    }

    /// Receiver that sees every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.snapshot_rx.clone()
    }

    pub async fn query_text_changed(&self, text: impl Into<String>) -> Result<(), SessionClosed> {
        self.send(Event::QueryTextChanged { text: text.into() })
            .await
    }

    pub async fn submit(&self) -> Result<(), SessionClosed> {
        self.send(Event::SubmitRequested).await
    }

    pub async fn request_voice_input(&self) -> Result<(), SessionClosed> {
        self.send(Event::VoiceInputRequested).await
    }

    /// Ask for the current answer to be spoken. The returned id names the
    /// utterance if the request is accepted.
    pub async fn speak(&self) -> Result<UtteranceId, SessionClosed> {
        let utterance_id = UtteranceId::new();
        self.send(Event::SpeakRequested { utterance_id }).await?;
        Ok(utterance_id)
    }

    pub async fn stop_speaking(&self) -> Result<(), SessionClosed> {
        self.send(Event::StopSpeakingRequested).await
    }

    /// Stop the session task, cancelling playback and capture
    pub fn close(&self) {
        self.shutdown.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    async fn send(&self, event: Event) -> Result<(), SessionClosed> {
        if self.is_closed() {
            return Err(SessionClosed(self.id.clone()));
        }
        self.event_tx
            .send(event)
            .await
            .map_err(|_| SessionClosed(self.id.clone()))
    }
}

/// Start a session task and return its handle
pub fn spawn_session<A, R, S>(
    session_id: impl Into<String>,
    settings: &SessionSettings,
    answer_client: Arc<A>,
    recognizer: Arc<R>,
    synthesizer: Arc<S>,
) -> SessionHandle
where
    A: AnswerClient + ?Sized + 'static,
    R: SpeechRecognizer + ?Sized + 'static,
    S: SpeechSynthesizer + ?Sized + 'static,
{
    let id = session_id.into();
    let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (snapshot_tx, snapshot_rx) = watch::channel(SessionState::default());
    let shutdown = CancellationToken::new();

    let runtime = SessionRuntime::new(
        id.clone(),
        answer_client,
        settings.answer_timeout,
        VoiceInputController::new(recognizer, settings.language.clone()),
        VoiceOutputController::new(synthesizer, settings.language.clone()),
        event_rx,
        event_tx.downgrade(),
        snapshot_tx,
        shutdown.clone(),
    );
    tokio::spawn(runtime.run());

    SessionHandle {
        id,
        event_tx,
        snapshot_rx,
        shutdown,
    }
}

/// Manager for all live sessions.
///
/// The registry holds a handle per session, so a session lives until
/// `discard` or `shutdown_all` even if its client never comes back.
pub struct SessionManager {
    answer_client: Arc<dyn AnswerClient>,
    recognizer: Arc<dyn SpeechRecognizer>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    settings: SessionSettings,
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionManager {
    pub fn new(
        answer_client: Arc<dyn AnswerClient>,
        recognizer: Arc<dyn SpeechRecognizer>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            answer_client,
            recognizer,
            synthesizer,
            settings,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn create(&self) -> SessionHandle {
        let id = uuid::Uuid::new_v4().to_string();
        let handle = spawn_session(
            id.clone(),
            &self.settings,
            self.answer_client.clone(),
            self.recognizer.clone(),
            self.synthesizer.clone(),
        );
        self.sessions.write().await.insert(id.clone(), handle.clone());
        tracing::info!(session_id = %id, "Created session");
        handle
    }

    pub async fn get(&self, id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Close and forget a session. Returns `false` if it was unknown.
    pub async fn discard(&self, id: &str) -> bool {
        let Some(handle) = self.sessions.write().await.remove(id) else {
            return false;
        };
        handle.close();
        tracing::info!(session_id = %id, "Discarded session");
        true
    }

    pub async fn shutdown_all(&self) {
        let sessions: Vec<_> = self.sessions.write().await.drain().collect();
        for (_, handle) in &sessions {
            handle.close();
        }
        tracing::info!(count = sessions.len(), "Closed all sessions");
    }
}
