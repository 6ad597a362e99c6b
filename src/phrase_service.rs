//! Phrase-extraction service client
//!
//! Defines the client trait and contract types for the remote phrase
//! extraction collaborator. Two implementations:
//! - `HttpPhraseClient`: POSTs JSON to a configured endpoint (production)
//! - `MockClient`: returns preconfigured bodies (testing)
//!
//! The service is free-form on the way back: bodies may be strict JSON or
//! JSON wrapped in commentary. `parse_response` normalizes them into a
//! `ParseResult` and never fails.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Request body sent to the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhraseRequest {
    pub text: String,
    pub max_phrases: usize,
}

/// One phrase nominated by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServicePhrase {
    pub phrase: String,
    /// Connotation score; absent, null or non-numeric means "score locally"
    #[serde(default, deserialize_with = "lenient_score")]
    pub score: Option<f64>,
}

/// Accept any JSON value for a score, keeping only numbers.
fn lenient_score<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value.as_f64())
}

#[derive(Debug, Deserialize)]
struct PhraseEnvelope {
    phrases: Vec<ServicePhrase>,
}

/// Outcome of interpreting a service body.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseResult {
    Ok(Vec<ServicePhrase>),
    /// Body could not be interpreted; carries the raw text for logging
    Malformed(String),
}

/// Errors from phrase-service transport.
#[derive(Debug, thiserror::Error)]
pub enum PhraseServiceError {
    #[error("phrase service not available: {0}")]
    Unavailable(String),
    #[error("phrase service returned status {0}")]
    Status(u16),
    #[error("transport error: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for PhraseServiceError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::Status(status.as_u16()),
            None => Self::Transport(err.to_string()),
        }
    }
}

/// Client trait for the phrase-extraction collaborator.
///
/// Returns the raw response body; interpretation belongs to
/// `parse_response` so every transport gets the same tolerance.
#[async_trait]
pub trait PhraseServiceClient: Send + Sync {
    async fn extract(&self, request: &PhraseRequest) -> Result<String, PhraseServiceError>;
}

/// Interpret a service body.
///
/// Tries, in order:
/// 1. Strict parse of the whole body (`{"phrases": [..]}` or a bare array)
/// 2. Strict parse of the first balanced `[...]` substring
///
/// Anything else is `Malformed`.
pub fn parse_response(raw: &str) -> ParseResult {
    let trimmed = raw.trim();

    if let Some(phrases) = parse_strict(trimmed) {
        return ParseResult::Ok(phrases);
    }

    if let Some(slice) = first_balanced_array(trimmed) {
        if let Ok(phrases) = serde_json::from_str::<Vec<ServicePhrase>>(slice) {
            return ParseResult::Ok(phrases);
        }
    }

    ParseResult::Malformed(raw.to_string())
}

fn parse_strict(text: &str) -> Option<Vec<ServicePhrase>> {
    if let Ok(envelope) = serde_json::from_str::<PhraseEnvelope>(text) {
        return Some(envelope.phrases);
    }
    serde_json::from_str::<Vec<ServicePhrase>>(text).ok()
}

/// Locate the first `[` and its matching `]`, skipping brackets inside
/// JSON string literals.
fn first_balanced_array(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

/// HTTP transport: `POST {endpoint}` with a JSON `PhraseRequest`.
pub struct HttpPhraseClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpPhraseClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, PhraseServiceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PhraseServiceError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl PhraseServiceClient for HttpPhraseClient {
    async fn extract(&self, request: &PhraseRequest) -> Result<String, PhraseServiceError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }
}

/// Mock client for testing — returns a preconfigured body or failure.
pub struct MockClient {
    outcome: Result<String, String>,
    delay: Duration,
    requests: std::sync::Mutex<Vec<PhraseRequest>>,
}

impl MockClient {
    /// Respond with `body` verbatim.
    pub fn with_body(body: impl Into<String>) -> Self {
        Self {
            outcome: Ok(body.into()),
            delay: Duration::ZERO,
            requests: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Respond with a transport failure.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            outcome: Err(message.into()),
            delay: Duration::ZERO,
            requests: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Wait `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<PhraseRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PhraseServiceClient for MockClient {
    async fn extract(&self, request: &PhraseRequest) -> Result<String, PhraseServiceError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.outcome
            .clone()
            .map_err(PhraseServiceError::Transport)
    }
}
