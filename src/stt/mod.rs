//! STT (speech-to-text) service clients.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │               Transcriber (trait)                    │
//! │                                                      │
//! │   ┌────────────────────┐   ┌────────────────────┐    │
//! │   │ BackendTranscriber │   │ OpenAiTranscriber  │    │
//! │   │ /api/voice/...     │   │ /v1/audio/...      │    │
//! │   └─────────┬──────────┘   └─────────┬──────────┘    │
//! │             └───────────┬────────────┘               │
//! │                         ▼                            │
//! │            multipart `file` (+ `model`)              │
//! │                  → { "text": ... }                   │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use handsfree_voice::audio::VadRecorder;
//! use handsfree_voice::config::SttConfig;
//! use handsfree_voice::stt::transcriber_from_config;
//!
//! # async fn example() {
//! let stt = transcriber_from_config(&SttConfig::default());
//!
//! let mut recorder = VadRecorder::new();
//! recorder.start().unwrap();
//! let blob = recorder.stop().unwrap();
//! let text = stt.transcribe(&blob).await.unwrap();
//! println!("{text}");
//! # }
//! ```

pub mod engine;
pub mod http;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use engine::{transcriber_from_config, SttError, Transcriber};
pub use http::{BackendTranscriber, OpenAiTranscriber};

// test-only re-export so the orchestrator tests can import MockTranscriber
// without reaching into `stt::engine`.
#[cfg(test)]
pub use engine::MockTranscriber;
