//! HTTP transcription clients.
//!
//! | Type                 | Endpoint                              | Auth           |
//! |----------------------|---------------------------------------|----------------|
//! | [`BackendTranscriber`] | `POST {base}/api/voice/transcribe`   | none           |
//! | [`OpenAiTranscriber`]  | `POST {base}/v1/audio/transcriptions` | bearer api key |
//!
//! Both upload the utterance as multipart field `file`, optionally with a
//! `model` hint, and read `{ "text": "..." }` back.  All connection details
//! come from [`SttConfig`].

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::audio::AudioBlob;
use crate::config::SttConfig;

use super::engine::{SttError, Transcriber};

/// Model used for OpenAI-compatible providers when none is configured.
const DEFAULT_OPENAI_MODEL: &str = "whisper-1";

/// Build a client with a per-request timeout.
///
/// Falls back to a default client if the builder fails.
pub(crate) fn client_with_timeout(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: Option<String>,
}

fn audio_part(blob: &AudioBlob) -> Result<Part, SttError> {
    Ok(Part::bytes(blob.bytes.clone())
        .file_name(blob.format.file_name())
        .mime_str(blob.format.mime_type())?)
}

async fn read_text(response: reqwest::Response) -> Result<String, SttError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SttError::Status {
            status: status.as_u16(),
            body,
        });
    }

    let parsed: TranscriptionResponse = response
        .json()
        .await
        .map_err(|e| SttError::Parse(e.to_string()))?;

    Ok(parsed.text.unwrap_or_default().trim().to_string())
}

// ---------------------------------------------------------------------------
// BackendTranscriber
// ---------------------------------------------------------------------------

/// Uploads to the chat assistant's backend, which forwards to whichever
/// provider it is configured with.
pub struct BackendTranscriber {
    client: reqwest::Client,
    config: SttConfig,
}

impl BackendTranscriber {
    pub fn from_config(config: &SttConfig) -> Self {
        Self {
            client: client_with_timeout(config.timeout_secs),
            config: config.clone(),
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/api/voice/transcribe",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl Transcriber for BackendTranscriber {
    async fn transcribe(&self, blob: &AudioBlob) -> Result<String, SttError> {
        let mut form = Form::new().part("file", audio_part(blob)?);
        if let Some(model) = self.config.model.as_deref().filter(|m| !m.is_empty()) {
            form = form.text("model", model.to_string());
        }

        log::debug!(
            "stt: uploading {} bytes to {}",
            blob.bytes.len(),
            self.url()
        );
        let response = self.client.post(self.url()).multipart(form).send().await?;
        read_text(response).await
    }
}

// ---------------------------------------------------------------------------
// OpenAiTranscriber
// ---------------------------------------------------------------------------

/// Calls an OpenAI-compatible `/v1/audio/transcriptions` endpoint
/// (OpenAI, Groq, LocalAI …).
///
/// The `Authorization: Bearer …` header is attached only when
/// `config.api_key` is a non-empty string.
pub struct OpenAiTranscriber {
    client: reqwest::Client,
    config: SttConfig,
}

impl OpenAiTranscriber {
    pub fn from_config(config: &SttConfig) -> Self {
        Self {
            client: client_with_timeout(config.timeout_secs),
            config: config.clone(),
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/v1/audio/transcriptions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn model(&self) -> &str {
        self.config
            .model
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_OPENAI_MODEL)
    }
}

#[async_trait]
impl Transcriber for OpenAiTranscriber {
    async fn transcribe(&self, blob: &AudioBlob) -> Result<String, SttError> {
        let form = Form::new()
            .part("file", audio_part(blob)?)
            .text("model", self.model().to_string());

        let mut req = self.client.post(self.url()).multipart(form);

        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;
        read_text(response).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceProvider;

    fn make_config(base_url: &str, model: Option<&str>) -> SttConfig {
        SttConfig {
            provider: ServiceProvider::OpenAiCompatible,
            base_url: base_url.into(),
            api_key: Some("sk-test".into()),
            model: model.map(str::to_string),
            timeout_secs: 5,
        }
    }

    #[test]
    fn backend_url_strips_trailing_slash() {
        let stt = BackendTranscriber::from_config(&make_config("http://localhost:8000/", None));
        assert_eq!(stt.url(), "http://localhost:8000/api/voice/transcribe");
    }

    #[test]
    fn openai_url_and_default_model() {
        let stt = OpenAiTranscriber::from_config(&make_config("https://api.openai.com", None));
        assert_eq!(stt.url(), "https://api.openai.com/v1/audio/transcriptions");
        assert_eq!(stt.model(), "whisper-1");
    }

    #[test]
    fn openai_configured_model_wins() {
        let stt = OpenAiTranscriber::from_config(&make_config(
            "https://api.groq.com/openai",
            Some("whisper-large-v3-turbo"),
        ));
        assert_eq!(stt.model(), "whisper-large-v3-turbo");
    }

    #[test]
    fn response_text_is_optional() {
        let parsed: TranscriptionResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.text.is_none());

        let parsed: TranscriptionResponse =
            serde_json::from_str(r#"{"text":" zenia hi "}"#).unwrap();
        assert_eq!(parsed.text.as_deref(), Some(" zenia hi "));
    }

    /// Nothing listens on port 9 (discard); the call must fail, not panic.
    #[tokio::test]
    async fn unreachable_service_is_request_error() {
        let stt = BackendTranscriber::from_config(&make_config("http://127.0.0.1:9", None));
        let mut recorder = crate::audio::VadRecorder::new();
        recorder.start().unwrap();
        let blob = recorder.stop().unwrap();

        let err = stt.transcribe(&blob).await.unwrap_err();
        assert!(matches!(err, SttError::Request(_) | SttError::Timeout));
    }
}
