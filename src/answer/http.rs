//! HTTP answer client
//!
//! Posts `{"query": ...}` to the configured endpoint and expects
//! `{"answer": ...}` back.

use super::{AnswerClient, AnswerError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Serialize)]
struct AskRequest<'a> {
    query: &'a str,
}

/// Answer client backed by `reqwest`
pub struct HttpAnswerClient {
    client: Client,
    url: String,
}

impl HttpAnswerClient {
    pub fn new(url: impl Into<String>) -> Result<Self, AnswerError> {
        // No client timeout: the session runtime owns the timeout policy
        let client = Client::builder()
            .build()
            .map_err(|e| AnswerError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl AnswerClient for HttpAnswerClient {
    async fn ask(&self, query: &str) -> Result<String, AnswerError> {
        let response = self
            .client
            .post(&self.url)
            .json(&AskRequest { query })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnswerError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    AnswerError::network(format!("Connection failed: {e}"))
                } else {
                    AnswerError::network(format!("Request failed: {e}"))
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AnswerError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let message = match error_detail(&body) {
                Some(detail) => format!("Answer service returned {status}: {detail}"),
                None => format!("Answer service returned {status}"),
            };
            return Err(AnswerError::network(message));
        }

        extract_answer(&body)
    }
}

/// Pull the `detail` field out of an error body, if the server sent one
fn error_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::String(detail) => Some(detail.clone()),
        other => Some(other.to_string()),
    }
}

fn extract_answer(body: &str) -> Result<String, AnswerError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| AnswerError::malformed(format!("Response is not JSON: {e}")))?;

    match value.get("answer") {
        Some(Value::String(answer)) => Ok(answer.clone()),
        Some(other) => Err(AnswerError::malformed(format!(
            "`answer` is not a string: {other}"
        ))),
        None => Err(AnswerError::malformed("Response has no `answer` field")),
    }
}
