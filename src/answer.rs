//! Answer service client
//!
//! One request/response exchange per call, no retries. Timeouts and
//! stale-response handling belong to the session runtime.

mod error;
mod http;

pub use error::{AnswerError, AnswerErrorKind};
pub use http::HttpAnswerClient;

use async_trait::async_trait;
use std::sync::Arc;

/// Client for the remote answer endpoint
#[async_trait]
pub trait AnswerClient: Send + Sync {
    /// Ask a single question and return the answer markup
    async fn ask(&self, query: &str) -> Result<String, AnswerError>;
}

#[async_trait]
impl<T: AnswerClient + ?Sized> AnswerClient for Arc<T> {
    async fn ask(&self, query: &str) -> Result<String, AnswerError> {
        (**self).ask(query).await
    }
}

/// Logging wrapper for answer clients
pub struct LoggingAnswerClient {
    inner: Arc<dyn AnswerClient>,
}

impl LoggingAnswerClient {
    pub fn new(inner: Arc<dyn AnswerClient>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl AnswerClient for LoggingAnswerClient {
    async fn ask(&self, query: &str) -> Result<String, AnswerError> {
        let start = std::time::Instant::now();
        let result = self.inner.ask(query).await;
        let duration = start.elapsed();

        match &result {
            Ok(answer) => {
                tracing::info!(
                    duration_ms = %duration.as_millis(),
                    query_chars = query.chars().count(),
                    answer_chars = answer.chars().count(),
                    "Answer request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    duration_ms = %duration.as_millis(),
                    kind = ?e.kind,
                    error = %e.message,
                    "Answer request failed"
                );
            }
        }

        result
    }
}
