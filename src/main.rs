//! Stack Assist - spoken Q&A front end for a programming answer service
//!
//! Keeps one query/answer session per client, speaks answers aloud and
//! fills the query from the microphone.

mod answer;
mod api;
mod config;
mod render;
mod runtime;
mod session;
mod voice;

use answer::{AnswerClient, HttpAnswerClient, LoggingAnswerClient};
use api::{create_router, AppState};
use config::AssistantConfig;
use runtime::SessionManager;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use voice::{
    CommandRecognizer, CommandSynthesizer, SpeechRecognizer, SpeechSynthesizer,
    UnavailableRecognizer, UnavailableSynthesizer,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stack_assist=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = AssistantConfig::from_env()?;

    let http_client = HttpAnswerClient::new(&config.answer_url)?;
    tracing::info!(url = %http_client.url(), timeout_secs = config.answer_timeout.as_secs(), "Answer service configured");
    let answer_client: Arc<dyn AnswerClient> =
        Arc::new(LoggingAnswerClient::new(Arc::new(http_client)));

    let synthesizer: Arc<dyn SpeechSynthesizer> = match config.tts_engine.resolve() {
        Some(engine) => {
            tracing::info!(engine = engine.program(), "Speech synthesis enabled");
            Arc::new(CommandSynthesizer::new(engine))
        }
        None => {
            tracing::warn!("No speech engine available. Install espeak-ng or set ASSISTANT_TTS_ENGINE.");
            Arc::new(UnavailableSynthesizer)
        }
    };

    let recognizer: Arc<dyn SpeechRecognizer> = match config
        .stt_command
        .as_deref()
        .and_then(|line| CommandRecognizer::from_command_line(line, config.stt_timeout))
    {
        Some(recognizer) => {
            tracing::info!(program = recognizer.program(), language = %config.language, "Speech recognition enabled");
            Arc::new(recognizer)
        }
        None => {
            tracing::warn!("Speech recognition disabled. Set ASSISTANT_STT_COMMAND to enable it.");
            Arc::new(UnavailableRecognizer)
        }
    };

    let sessions = Arc::new(SessionManager::new(
        answer_client,
        recognizer,
        synthesizer,
        config.session_settings(),
    ));

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = create_router(AppState::new(sessions.clone()))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Stack Assist listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown requested");
        })
        .await?;

    sessions.shutdown_all().await;
    Ok(())
}
