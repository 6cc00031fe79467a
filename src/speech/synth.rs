//! Text-to-speech service clients.
//!
//! [`Synthesizer`] turns reply text (or a stored chat message) into encoded
//! audio.  Two HTTP implementations are provided; pick one with
//! [`synthesizer_from_config`].

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{ServiceProvider, TtsConfig};
use crate::stt::http::client_with_timeout;

/// Content type assumed when a service omits one.
const DEFAULT_MIME: &str = "audio/mpeg";

// ---------------------------------------------------------------------------
// SpeechAudio
// ---------------------------------------------------------------------------

/// Encoded audio ready for playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechAudio {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

// ---------------------------------------------------------------------------
// TtsError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Error)]
pub enum TtsError {
    #[error("synthesis request failed: {0}")]
    Request(String),

    #[error("synthesis request timed out")]
    Timeout,

    #[error("synthesis service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("synthesis service returned no audio")]
    EmptyAudio,

    #[error("{0} is not supported by this provider")]
    Unsupported(&'static str),
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
// Synthesizer trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize `text`.
    async fn synthesize(&self, text: &str) -> Result<SpeechAudio, TtsError>;

    /// Fetch the stored audio of a chat message.
    async fn message_audio(&self, _message_id: &str) -> Result<SpeechAudio, TtsError> {
        Err(TtsError::Unsupported("per-message audio"))
    }
}

/// Build the synthesizer selected by `config.provider`.
pub fn synthesizer_from_config(config: &TtsConfig) -> Arc<dyn Synthesizer> {
    match config.provider {
        ServiceProvider::Backend => Arc::new(BackendSynthesizer::from_config(config)),
        ServiceProvider::OpenAiCompatible => Arc::new(OpenAiSynthesizer::from_config(config)),
    }
}

async fn read_audio(response: reqwest::Response) -> Result<SpeechAudio, TtsError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(TtsError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let mime_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(DEFAULT_MIME)
        .to_string();

    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        return Err(TtsError::EmptyAudio);
    }

    Ok(SpeechAudio {
        bytes: bytes.to_vec(),
        mime_type,
    })
}

// ---------------------------------------------------------------------------
// BackendSynthesizer
// ---------------------------------------------------------------------------

/// Uses the chat assistant's backend:
///
/// - `POST {base}/api/voice/synthesize` with `{ "text": ... }`
/// - `GET  {base}/api/voice/message/{id}/audio`
pub struct BackendSynthesizer {
    client: reqwest::Client,
    base_url: String,
}

impl BackendSynthesizer {
    pub fn from_config(config: &TtsConfig) -> Self {
        Self {
            client: client_with_timeout(config.timeout_secs),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn synthesize_url(&self) -> String {
        format!("{}/api/voice/synthesize", self.base_url)
    }

    fn message_url(&self, message_id: &str) -> String {
        format!("{}/api/voice/message/{message_id}/audio", self.base_url)
    }
}

#[async_trait]
impl Synthesizer for BackendSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<SpeechAudio, TtsError> {
        let body = serde_json::json!({ "text": text });
        let response = self
            .client
            .post(self.synthesize_url())
            .json(&body)
            .send()
            .await?;
        read_audio(response).await
    }

    async fn message_audio(&self, message_id: &str) -> Result<SpeechAudio, TtsError> {
        let response = self.client.get(self.message_url(message_id)).send().await?;
        read_audio(response).await
    }
}

// ---------------------------------------------------------------------------
// OpenAiSynthesizer
// ---------------------------------------------------------------------------

/// Calls an OpenAI-compatible `/v1/audio/speech` endpoint.
pub struct OpenAiSynthesizer {
    client: reqwest::Client,
    config: TtsConfig,
}

impl OpenAiSynthesizer {
    pub fn from_config(config: &TtsConfig) -> Self {
        Self {
            client: client_with_timeout(config.timeout_secs),
            config: config.clone(),
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/v1/audio/speech",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl Synthesizer for OpenAiSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<SpeechAudio, TtsError> {
        let body = serde_json::json!({
            "model": self.config.model,
            "voice": self.config.voice,
            "input": text,
        });

        let mut req = self.client.post(self.url()).json(&body);

        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        read_audio(req.send().await?).await
    }
}

// ---------------------------------------------------------------------------
// MockSynthesizer  (test-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
pub use mock::MockSynthesizer;


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
