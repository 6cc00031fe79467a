//! Audio side of hands-free mode: microphone sessions, analysis, recording.
//!
//! # Pipeline
//!
//! ```text
//! Microphone → cpal callback → downmix_to_mono ─┬─▶ analyser window → FrequencyAnalyzer
//!                                               │        → byte bins → compute_volume
//!                                               └─▶ pending audio → take_audio()
//!                                                        → VadRecorder → AudioBlob (16 kHz WAV)
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use handsfree_voice::audio::{compute_volume, AudioDevice, MicrophoneDevice, VadRecorder};
//!
//! let device = MicrophoneDevice::new(None, 256, 60);
//! let mut session = device.acquire().unwrap();
//! let mut recorder = VadRecorder::new();
//!
//! recorder.start().unwrap();
//! std::thread::sleep(std::time::Duration::from_millis(500));
//! println!("volume = {:.3}", compute_volume(&session.frequency_data()));
//! if let Some(chunk) = session.take_audio() {
//!     recorder.push(chunk);
//! }
//! let blob = recorder.stop().unwrap();
//! println!("captured {:?} of audio", blob.duration);
//! session.release();
//! ```

pub mod buffer;
pub mod capture;
pub mod recorder;
pub mod resample;
pub mod session;
pub mod spectrum;
pub mod volume;

pub use buffer::RingBuffer;
pub use capture::{AudioCapture, AudioChunk, CaptureError, StreamHandle};
pub use recorder::{
    AudioBlob, ContainerFormat, RecorderError, RecorderState, VadRecorder, UPLOAD_SAMPLE_RATE,
};
pub use resample::{downmix_to_mono, resample};
pub use session::{AudioDevice, AudioSession, MicrophoneDevice};
pub use spectrum::FrequencyAnalyzer;
pub use volume::compute_volume;
