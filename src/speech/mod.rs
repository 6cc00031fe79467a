//! Speech output: synthesis clients, audio playback and the coordinator
//! that serialises them.
//!
//! ```text
//! SpeechCoordinator::speak(text)
//!        │
//!        ├─ Synthesizer::synthesize   (BackendSynthesizer | OpenAiSynthesizer)
//!        └─ AudioPlayer::play         (RodioPlayer)
//!
//! is_speaking / SpeechEvent ──▶ hands-free orchestrator
//! ```

pub mod coordinator;
pub mod player;
pub mod synth;

pub use coordinator::{SpeechCoordinator, SpeechError, SpeechEvent};
pub use player::{AudioPlayer, PlaybackError, RodioPlayer};
pub use synth::{
    synthesizer_from_config, BackendSynthesizer, OpenAiSynthesizer, SpeechAudio, Synthesizer,
    TtsError,
};

#[cfg(test)]
pub use player::MockPlayer;
#[cfg(test)]
pub use synth::MockSynthesizer;
