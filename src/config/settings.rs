//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across tasks.
//! Every section is `#[serde(default)]`, so a partial `settings.toml` only
//! overrides the keys it names.

use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::AppPaths;

// ---------------------------------------------------------------------------
// ServiceProvider
// ---------------------------------------------------------------------------

/// Selects which remote service implements transcription or synthesis.
///
/// | Variant          | Transcription                     | Synthesis                    |
/// |------------------|-----------------------------------|------------------------------|
/// | Backend          | `POST /api/voice/transcribe`      | `POST /api/voice/synthesize` |
/// | OpenAiCompatible | `POST /v1/audio/transcriptions`   | `POST /v1/audio/speech`      |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceProvider {
    /// The chat assistant's own backend, which proxies to its configured
    /// provider.
    Backend,
    /// Any OpenAI-compatible REST API (OpenAI, Groq, LocalAI …).
    OpenAiCompatible,
}

impl Default for ServiceProvider {
    fn default() -> Self {
        Self::Backend
    }
}

// ---------------------------------------------------------------------------
// VadConfig
// ---------------------------------------------------------------------------

/// Timing and threshold settings for hands-free voice activity detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VadConfig {
    /// Sampling tick of the orchestrator loop in milliseconds.
    pub tick_ms: u64,
    /// Volume (0.0 – 1.0) above which a sample counts as speech.
    pub silence_threshold: f32,
    /// Continuous silence in milliseconds that ends an utterance.
    pub silence_duration_ms: u64,
    /// Milliseconds after a processing cycle during which listening cannot
    /// restart.
    pub cooldown_ms: u64,
    /// Hard cap on a single utterance in milliseconds.
    pub max_recording_ms: u64,
    /// Milliseconds to wait in `Processing` for a reply to start speaking.
    pub reply_timeout_ms: u64,
    /// FFT size of the frequency analyser; yields `fft_size / 2` bins.
    pub fft_size: usize,
}

impl VadConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn silence_duration(&self) -> Duration {
        Duration::from_millis(self.silence_duration_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn max_recording(&self) -> Duration {
        Duration::from_millis(self.max_recording_ms)
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }

    /// Reject settings the orchestrator loop or the analyser cannot run with.
    pub fn validate(&self) -> Result<(), VadConfigError> {
        if self.tick_ms == 0 {
            return Err(VadConfigError::ZeroTick);
        }
        if self.fft_size < 32 || !self.fft_size.is_power_of_two() {
            return Err(VadConfigError::FftSize(self.fft_size));
        }
        if !(0.0..=1.0).contains(&self.silence_threshold) {
            return Err(VadConfigError::Threshold(self.silence_threshold));
        }
        Ok(())
    }
}

/// A [`VadConfig`] value outside its usable range.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VadConfigError {
    #[error("vad.tick_ms must be greater than zero")]
    ZeroTick,

    #[error("vad.fft_size must be a power of two >= 32, got {0}")]
    FftSize(usize),

    #[error("vad.silence_threshold must be within 0.0..=1.0, got {0}")]
    Threshold(f32),
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            tick_ms: 100,
            silence_threshold: 0.05,
            silence_duration_ms: 3_000,
            cooldown_ms: 2_000,
            max_recording_ms: 10_000,
            reply_timeout_ms: 10_000,
            fft_size: 256,
        }
    }
}

// ---------------------------------------------------------------------------
// WakeConfig
// ---------------------------------------------------------------------------

/// Accepted wake tokens and command gating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WakeConfig {
    /// Wake tokens, including common misrecognitions of the assistant name.
    /// Matched case-insensitively as an utterance prefix.
    pub wake_words: Vec<String>,
    /// A command remainder must be longer than this many characters.
    pub min_command_chars: usize,
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            wake_words: ["hey zenia", "zenia", "xenia", "zena", "zenya", "zenith"]
                .iter()
                .map(|w| w.to_string())
                .collect(),
            min_command_chars: 2,
        }
    }
}

// ---------------------------------------------------------------------------
// AudioConfig
// ---------------------------------------------------------------------------

/// Settings for microphone capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Input device name; `None` means the system default.
    pub input_device: Option<String>,
    /// Seconds of not-yet-consumed audio kept by the capture session.
    pub pending_buffer_secs: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            input_device: None,
            pending_buffer_secs: 60,
        }
    }
}

// ---------------------------------------------------------------------------
// SttConfig
// ---------------------------------------------------------------------------

/// Settings for the remote transcription service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SttConfig {
    /// Which service handles transcription.
    pub provider: ServiceProvider,
    /// Base URL of the service.
    ///
    /// - Backend default: `http://localhost:8000`
    /// - OpenAI: `https://api.openai.com`
    pub base_url: String,
    /// API key; `None` for the backend, which holds its own credentials.
    pub api_key: Option<String>,
    /// Model hint sent with each request (e.g. `"whisper-large-v3-turbo"`).
    pub model: Option<String>,
    /// Maximum seconds to wait for a transcription response.
    pub timeout_secs: u64,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            provider: ServiceProvider::default(),
            base_url: "http://localhost:8000".into(),
            api_key: None,
            model: None,
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// TtsConfig
// ---------------------------------------------------------------------------

/// Settings for the remote speech synthesis service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// Which service handles synthesis.
    pub provider: ServiceProvider,
    /// Base URL of the service.
    pub base_url: String,
    /// API key; `None` for the backend.
    pub api_key: Option<String>,
    /// Synthesis model (OpenAI-compatible providers only).
    pub model: String,
    /// Voice name (OpenAI-compatible providers only).
    pub voice: String,
    /// Maximum seconds to wait for synthesized audio.
    pub timeout_secs: u64,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            provider: ServiceProvider::default(),
            base_url: "http://localhost:8000".into(),
            api_key: None,
            model: "tts-1".into(),
            voice: "alloy".into(),
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use handsfree_voice::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Voice activity detection timing.
    pub vad: VadConfig,
    /// Wake-word gate settings.
    pub wake: WakeConfig,
    /// Microphone capture settings.
    pub audio: AudioConfig,
    /// Transcription service settings.
    pub stt: SttConfig,
    /// Synthesis service settings.
    pub tts: TtsConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// so callers never need to special-case a missing file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.vad.validate()?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");
        assert_eq!(original, loaded);
    }

    /// `load_from` on a non-existent path must return `Default` without error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.vad.tick(), Duration::from_millis(100));
        assert!((cfg.vad.silence_threshold - 0.05).abs() < f32::EPSILON);
        assert_eq!(cfg.vad.silence_duration(), Duration::from_secs(3));
        assert_eq!(cfg.vad.cooldown(), Duration::from_secs(2));
        assert_eq!(cfg.vad.max_recording(), Duration::from_secs(10));
        assert_eq!(cfg.vad.reply_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.vad.fft_size, 256);

        assert_eq!(cfg.wake.wake_words.len(), 6);
        assert!(cfg.wake.wake_words.iter().any(|w| w == "zenia"));
        assert_eq!(cfg.wake.min_command_chars, 2);

        assert_eq!(cfg.stt.provider, ServiceProvider::Backend);
        assert!(cfg.stt.api_key.is_none());
        assert_eq!(cfg.tts.model, "tts-1");
        assert_eq!(cfg.tts.voice, "alloy");
        assert!(cfg.audio.input_device.is_none());
    }

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.vad.silence_duration_ms = 1_500;
        cfg.wake.wake_words = vec!["computer".into()];
        cfg.stt.provider = ServiceProvider::OpenAiCompatible;
        cfg.stt.base_url = "https://api.groq.com/openai".into();
        cfg.stt.api_key = Some("gsk-test".into());
        cfg.stt.model = Some("whisper-large-v3-turbo".into());
        cfg.tts.voice = "nova".into();
        cfg.audio.input_device = Some("USB Microphone".into());

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.vad.silence_duration_ms, 1_500);
        assert_eq!(loaded.wake.wake_words, vec!["computer".to_string()]);
        assert_eq!(loaded.stt.provider, ServiceProvider::OpenAiCompatible);
        assert_eq!(loaded.stt.api_key.as_deref(), Some("gsk-test"));
        assert_eq!(loaded.stt.model.as_deref(), Some("whisper-large-v3-turbo"));
        assert_eq!(loaded.tts.voice, "nova");
        assert_eq!(loaded.audio.input_device.as_deref(), Some("USB Microphone"));
    }

    /// A file naming only a few keys keeps the defaults for the rest.
    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[vad]\ncooldown_ms = 500\n").expect("write");

        let loaded = AppConfig::load_from(&path).expect("load");
        assert_eq!(loaded.vad.cooldown_ms, 500);
        assert_eq!(loaded.vad.tick_ms, 100);
        assert_eq!(loaded.wake, WakeConfig::default());
    }

    #[test]
    fn vad_validation_rejects_unusable_values() {
        assert_eq!(VadConfig::default().validate(), Ok(()));

        let zero_tick = VadConfig { tick_ms: 0, ..VadConfig::default() };
        assert_eq!(zero_tick.validate(), Err(VadConfigError::ZeroTick));

        for fft_size in [0, 16, 100, 300] {
            let cfg = VadConfig { fft_size, ..VadConfig::default() };
            assert_eq!(cfg.validate(), Err(VadConfigError::FftSize(fft_size)), "{fft_size}");
        }

        let loud = VadConfig { silence_threshold: 1.5, ..VadConfig::default() };
        assert!(matches!(loud.validate(), Err(VadConfigError::Threshold(_))));
    }

    #[test]
    fn load_rejects_zero_tick() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("zero_tick.toml");
        std::fs::write(&path, "[vad]\ntick_ms = 0\n").expect("write");

        let err = AppConfig::load_from(&path).expect_err("zero tick must not load");
        assert!(err.to_string().contains("tick_ms"), "{err}");
    }
}
