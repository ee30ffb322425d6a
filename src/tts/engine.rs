//! Core `TtsEngine` trait and `ApiSynthesizer` implementation.
//!
//! `ApiSynthesizer` calls any OpenAI-compatible `/v1/audio/speech` endpoint
//! — OpenAI itself, or a local edge-tts proxy that accepts Azure neural
//! voice names such as `ko-KR-SunHiNeural`.
//! All connection details come from [`TtsConfig`]; nothing is hardcoded.

use async_trait::async_trait;
use thiserror::Error;

use crate::config::TtsConfig;

// ---------------------------------------------------------------------------
// TtsError
// ---------------------------------------------------------------------------

/// Errors that can occur while synthesising a single word.
#[derive(Debug, Clone, Error)]
pub enum TtsError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("TTS request timed out")]
    Timeout,

    /// The service answered with a non-success status.
    #[error("TTS service error ({status}): {body}")]
    Status { status: u16, body: String },

    /// The service answered successfully but sent no audio.
    #[error("TTS service returned no audio")]
    EmptyAudio,
}

impl From<reqwest::Error> for TtsError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TtsError::Timeout
        } else {
            TtsError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// TtsEngine trait
// ---------------------------------------------------------------------------

/// Async trait for text-to-speech backends.
///
/// Implementors must be `Send + Sync` so they can be shared behind an
/// `Arc<dyn TtsEngine>` and polled concurrently within a batch.
#[async_trait]
pub trait TtsEngine: Send + Sync {
    /// Synthesise `text` with `voice` and return the encoded audio (MP3).
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, TtsError>;
}

// ---------------------------------------------------------------------------
// ApiSynthesizer
// ---------------------------------------------------------------------------

/// Calls an OpenAI-compatible `/v1/audio/speech` endpoint.
pub struct ApiSynthesizer {
    client: reqwest::Client,
    config: TtsConfig,
}

impl ApiSynthesizer {
    /// Build an `ApiSynthesizer` from application config.
    ///
    /// The HTTP client carries the per-request timeout from
    /// `config.timeout_secs`. A default client is used if the builder fails.
    pub fn from_config(config: &TtsConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/audio/speech",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl TtsEngine for ApiSynthesizer {
    /// The `Authorization: Bearer …` header is attached only when
    /// `config.api_key` is a non-empty string.
    async fn synthesize(&self, text: &str, voice: &str) -> Result<Vec<u8>, TtsError> {
        let body = serde_json::json!({
            "model":           self.config.model,
            "input":           text,
            "voice":           voice,
            "response_format": "mp3",
        });

        let mut req = self.client.post(self.endpoint()).json(&body);

        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TtsError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let audio = response.bytes().await?.to_vec();
        if audio.is_empty() {
            return Err(TtsError::EmptyAudio);
        }

        log::debug!("synthesised {} bytes (voice={voice})", audio.len());
        Ok(audio)
    }
}

// ---------------------------------------------------------------------------
// MockTtsEngine  (test-only)
// ---------------------------------------------------------------------------

/// A test double that returns fake audio without touching the network and
/// records every word it was asked to synthesise.
#[cfg(test)]
pub struct MockTtsEngine {
    fail_on: std::collections::HashSet<String>,
    calls: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockTtsEngine {
    /// Create a mock that succeeds for every word.
    pub fn ok() -> Self {
        Self::failing_on(&[])
    }

    /// Create a mock that fails with a service error for the given words.
    pub fn failing_on(words: &[&str]) -> Self {
        Self {
            fail_on: words.iter().map(|w| w.to_string()).collect(),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Words requested so far, in request order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl TtsEngine for MockTtsEngine {
    async fn synthesize(&self, text: &str, _voice: &str) -> Result<Vec<u8>, TtsError> {
        self.calls.lock().unwrap().push(text.to_string());
        if self.fail_on.contains(text) {
            return Err(TtsError::Status {
                status: 503,
                body: "service unavailable".into(),
            });
        }
        Ok(format!("ID3{text}").into_bytes())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
