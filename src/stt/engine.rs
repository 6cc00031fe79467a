//! Core transcription trait and error type.
//!
//! # Overview
//!
//! [`Transcriber`] is the interface the hands-free orchestrator and the
//! dictation path use.  It is object-safe and `Send + Sync` so it can be held
//! behind an `Arc<dyn Transcriber>` and called from spawned tasks.
//!
//! Production implementations live in [`crate::stt::http`]; pick one with
//! [`transcriber_from_config`].
//!
//! [`MockTranscriber`] (available under `#[cfg(test)]`) returns pre-configured
//! responses and can hold its reply until the test releases it.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::audio::AudioBlob;
use crate::config::{ServiceProvider, SttConfig};

use super::http::{BackendTranscriber, OpenAiTranscriber};

// ---------------------------------------------------------------------------
// SttError
// ---------------------------------------------------------------------------

/// All errors that can arise while transcribing an utterance.
#[derive(Debug, Clone, Error)]
pub enum SttError {
    /// HTTP transport or connection error.
    #[error("transcription request failed: {0}")]
    Request(String),

    /// The service did not answer within the configured timeout.
    #[error("transcription request timed out")]
    Timeout,

    /// The service answered with a non-success status.
    #[error("transcription service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body was not the expected JSON.
    #[error("failed to parse transcription response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for SttError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SttError::Timeout
        } else {
            SttError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Transcriber trait
// ---------------------------------------------------------------------------

/// Turns a finalised utterance into text.
///
/// An empty string means the service heard nothing usable; it is not an
/// error.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, blob: &AudioBlob) -> Result<String, SttError>;
}

// Compile-time assertion: Arc<dyn Transcriber> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Arc<dyn Transcriber>) {}
};

/// Build the transcriber selected by `config.provider`.
pub fn transcriber_from_config(config: &SttConfig) -> Arc<dyn Transcriber> {
    match config.provider {
        ServiceProvider::Backend => Arc::new(BackendTranscriber::from_config(config)),
        ServiceProvider::OpenAiCompatible => Arc::new(OpenAiTranscriber::from_config(config)),
    }
}

// ---------------------------------------------------------------------------
// MockTranscriber  (test-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
pub use mock::MockTranscriber;


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::VadRecorder;

    fn empty_blob() -> AudioBlob {
        let mut recorder = VadRecorder::new();
        recorder.start().unwrap();
        recorder.stop().unwrap()
    }

    #[tokio::test]
    async fn mock_ok_returns_configured_text() {
        let stt = MockTranscriber::ok("zenia what time is it");
        let text = stt.transcribe(&empty_blob()).await.unwrap();
        assert_eq!(text, "zenia what time is it");
        assert_eq!(stt.calls(), 1);
        assert_eq!(stt.blobs().len(), 1);
    }

    #[tokio::test]
    async fn mock_err_returns_configured_error() {
        let stt = MockTranscriber::err(SttError::Timeout);
        let err = stt.transcribe(&empty_blob()).await.unwrap_err();
        assert!(matches!(err, SttError::Timeout));
    }

    #[tokio::test]
    async fn gated_mock_waits_for_permit() {
        let (stt, gate) = MockTranscriber::ok("late").gated();
        let stt = Arc::new(stt);

        let task = {
            let stt = Arc::clone(&stt);
            tokio::spawn(async move { stt.transcribe(&empty_blob()).await })
        };
        tokio::task::yield_now().await;
        assert!(!task.is_finished());

        gate.add_permits(1);
        assert_eq!(task.await.unwrap().unwrap(), "late");
    }

    #[test]
    fn factory_builds_both_providers() {
        let mut config = SttConfig::default();
        let _backend = transcriber_from_config(&config);
        config.provider = ServiceProvider::OpenAiCompatible;
        let _openai = transcriber_from_config(&config);
    }

    #[test]
    fn stt_error_display_includes_status() {
        let e = SttError::Status {
            status: 502,
            body: "bad gateway".into(),
        };
        assert!(e.to_string().contains("502"));
        assert!(e.to_string().contains("bad gateway"));
    }
}
