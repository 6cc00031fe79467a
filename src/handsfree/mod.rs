//! Hands-free conversation mode.
//!
//! # Architecture
//!
//! ```text
//! HandsFreeMode::toggle(true)
//!   └─▶ AudioDevice::acquire ──▶ Runner task (one owner of all loop state)
//!          every tick:  frequency_data → compute_volume → VAD decisions
//!                       take_audio → VadRecorder
//!          on finalize: spawn Transcriber::transcribe ──▶ (generation, result)
//!          on result:   WakeGate::evaluate → CommandDetected | WakeAcknowledged
//!                                            | UtteranceIgnored
//!          speech events from SpeechCoordinator ──▶ Speaking / Idle
//!
//! observers: watch (state, volume, bins, transcript, enabled)
//!            mpsc  (HandsFreeEvent)
//! ```

pub mod controller;
mod runner;
pub mod state;

pub use controller::{HandsFreeError, HandsFreeMode};
pub use state::{HandsFreeEvent, VadState};
