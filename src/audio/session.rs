//! Acquiring and releasing the microphone for hands-free mode.
//!
//! ```text
//! AudioDevice::acquire() ──▶ Box<dyn AudioSession>
//!                               ├─ frequency_data()  latest byte spectrum
//!                               ├─ take_audio()      mono PCM since last call
//!                               └─ release()         stop hardware access
//! ```
//!
//! [`MicrophoneDevice`] is the `cpal` implementation.  Because
//! `cpal::Stream` cannot leave the thread that built it, each session owns a
//! small capture thread that holds the stream until the session is released.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use super::buffer::RingBuffer;
use super::capture::{AudioCapture, AudioChunk, CaptureError};
use super::spectrum::FrequencyAnalyzer;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Something that can hand out exclusive microphone sessions.
pub trait AudioDevice: Send + Sync {
    /// Open the microphone.
    ///
    /// May block briefly while the platform opens the stream.  Fails when
    /// no device exists or access is denied.
    fn acquire(&self) -> Result<Box<dyn AudioSession>, CaptureError>;
}

/// A live microphone stream plus its frequency analyser.
pub trait AudioSession: Send {
    /// Most recent byte spectrum.  Never blocks; empty once released.
    fn frequency_data(&mut self) -> Vec<u8>;

    /// Mono audio captured since the previous call, or `None` when nothing
    /// arrived (or the session is released).
    fn take_audio(&mut self) -> Option<AudioChunk>;

    /// Stop all hardware access.  Calling it again is a no-op.
    fn release(&mut self);

    /// `true` between acquire and release.
    fn is_active(&self) -> bool;
}

// ---------------------------------------------------------------------------
// CaptureBuffers
// ---------------------------------------------------------------------------

/// Audio shared between the cpal callback and the session.
struct CaptureBuffers {
    sample_rate: u32,
    /// Audio not yet taken by the orchestrator.
    pending: RingBuffer<f32>,
    /// Newest samples for the analyser.
    window: RingBuffer<f32>,
}

impl CaptureBuffers {
    fn new(sample_rate: u32, pending_secs: u32, window_len: usize) -> Self {
        let pending_len = (sample_rate as usize * pending_secs.max(1) as usize).max(1);
        Self {
            sample_rate,
            pending: RingBuffer::new(pending_len),
            window: RingBuffer::new(window_len),
        }
    }

    fn feed(&mut self, chunk: AudioChunk) {
        let mono = chunk.into_mono();
        self.pending.push_slice(&mono.samples);
        self.window.push_slice(&mono.samples);
    }

    fn take(&mut self) -> Option<AudioChunk> {
        if self.pending.is_empty() {
            return None;
        }
        Some(AudioChunk {
            samples: self.pending.drain(),
            sample_rate: self.sample_rate,
            channels: 1,
        })
    }
}

// ---------------------------------------------------------------------------
// MicrophoneDevice
// ---------------------------------------------------------------------------

/// `cpal`-backed [`AudioDevice`].
///
/// # Example
///
/// ```rust,no_run
/// use handsfree_voice::audio::{AudioDevice, MicrophoneDevice};
///
/// let device = MicrophoneDevice::new(None, 256, 60);
/// let mut session = device.acquire().expect("microphone");
/// let bins = session.frequency_data();
/// assert_eq!(bins.len(), 128);
/// session.release();
/// ```
#[derive(Debug, Clone)]
pub struct MicrophoneDevice {
    device_name: Option<String>,
    fft_size: usize,
    pending_secs: u32,
}

impl MicrophoneDevice {
    /// * `device_name`  — input device, `None` for the system default.
    /// * `fft_size`     — analyser frame length (power of two).
    /// * `pending_secs` — unconsumed audio kept before the oldest is dropped.
    pub fn new(device_name: Option<String>, fft_size: usize, pending_secs: u32) -> Self {
        Self {
            device_name,
            fft_size,
            pending_secs,
        }
    }

    pub fn from_config(config: &crate::config::AppConfig) -> Self {
        Self::new(
            config.audio.input_device.clone(),
            config.vad.fft_size,
            config.audio.pending_buffer_secs,
        )
    }
}

impl AudioDevice for MicrophoneDevice {
    fn acquire(&self) -> Result<Box<dyn AudioSession>, CaptureError> {
        if !FrequencyAnalyzer::supports(self.fft_size) {
            return Err(CaptureError::InvalidFftSize(self.fft_size));
        }

        let (ready_tx, ready_rx) = mpsc::channel();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let device_name = self.device_name.clone();
        let fft_size = self.fft_size;
        let pending_secs = self.pending_secs;

        let thread = std::thread::Builder::new()
            .name("mic-capture".into())
            .spawn(move || {
                let opened = AudioCapture::new(device_name.as_deref()).and_then(|capture| {
                    let buffers = Arc::new(Mutex::new(CaptureBuffers::new(
                        capture.sample_rate(),
                        pending_secs,
                        fft_size,
                    )));
                    let sink = Arc::clone(&buffers);
                    let handle = capture.start(move |chunk| {
                        if let Ok(mut b) = sink.lock() {
                            b.feed(chunk);
                        }
                    })?;
                    Ok((handle, buffers))
                });

                match opened {
                    Ok((handle, buffers)) => {
                        if ready_tx.send(Ok(buffers)).is_err() {
                            return;
                        }
                        // Blocks until the session drops its sender.
                        let _ = stop_rx.recv();
                        drop(handle);
                        log::debug!("audio: capture thread stopped");
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                    }
                }
            })
            .map_err(|e| {
                log::error!("audio: could not spawn capture thread: {e}");
                CaptureError::ThreadExited
            })?;

        let buffers = ready_rx.recv().map_err(|_| CaptureError::ThreadExited)??;
        log::info!("audio: microphone acquired");

        Ok(Box::new(MicrophoneSession {
            buffers,
            analyzer: FrequencyAnalyzer::new(fft_size),
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        }))
    }
}

// ---------------------------------------------------------------------------
// MicrophoneSession
// ---------------------------------------------------------------------------

struct MicrophoneSession {
    buffers: Arc<Mutex<CaptureBuffers>>,
    analyzer: FrequencyAnalyzer,
    stop_tx: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl AudioSession for MicrophoneSession {
    fn frequency_data(&mut self) -> Vec<u8> {
        if !self.is_active() {
            return Vec::new();
        }
        let window = match self.buffers.lock() {
            Ok(b) => b.window.latest(self.analyzer.fft_size()),
            Err(_) => return Vec::new(),
        };
        self.analyzer.byte_frequency_data(&window)
    }

    fn take_audio(&mut self) -> Option<AudioChunk> {
        if !self.is_active() {
            return None;
        }
        self.buffers.lock().ok()?.take()
    }

    fn release(&mut self) {
        // Dropping the sender wakes the capture thread.
        if self.stop_tx.take().is_none() {
            return;
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::warn!("audio: capture thread panicked");
            }
        }
        if let Ok(mut b) = self.buffers.lock() {
            b.pending.clear();
            b.window.clear();
        }
        self.analyzer.reset();
        log::info!("audio: microphone released");
    }

    fn is_active(&self) -> bool {
        self.stop_tx.is_some()
    }
}

impl Drop for MicrophoneSession {
    fn drop(&mut self) {
        self.release();
    }
}

// ---------------------------------------------------------------------------
// Scripted device (test-only)
// ---------------------------------------------------------------------------


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn buffers_downmix_and_drain() {
        let mut buffers = CaptureBuffers::new(48_000, 1, 4);
        buffers.feed(AudioChunk {
            samples: vec![0.2, 0.4, 0.6, 0.8],
            sample_rate: 48_000,
            channels: 2,
        });

        let chunk = buffers.take().expect("audio");
        assert_eq!(chunk.channels, 1);
        assert_eq!(chunk.sample_rate, 48_000);
        assert_eq!(chunk.samples.len(), 2);
        assert!(buffers.take().is_none());
    }

    #[test]
    fn window_survives_take() {
        let mut buffers = CaptureBuffers::new(16_000, 1, 3);
        buffers.feed(AudioChunk {
            samples: vec![1.0, 2.0, 3.0, 4.0],
            sample_rate: 16_000,
            channels: 1,
        });
        let _ = buffers.take();
        assert_eq!(buffers.window.latest(3), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn scripted_session_follows_script() {
        let (device, handle) = ScriptedDevice::new();
        handle.push_levels(&[0.1]);
        handle.set_level(0.0);

        let mut session = device.acquire().unwrap();
        assert_eq!(session.frequency_data(), vec![26; 128]);
        assert_eq!(session.take_audio().unwrap().samples[0], 0.01);
        assert!(session.take_audio().is_none());
        assert_eq!(session.frequency_data(), vec![0; 128]);

        session.release();
        session.release();
        assert!(!session.is_active());
        assert!(session.frequency_data().is_empty());
        assert_eq!(handle.releases(), 1);
    }

    #[test]
    fn bad_analyser_size_fails_before_opening_the_stream() {
        let device = MicrophoneDevice::new(None, 100, 1);
        assert!(matches!(device.acquire(), Err(CaptureError::InvalidFftSize(100))));
    }

    #[test]
    fn unavailable_device_fails() {
        let (device, handle) = ScriptedDevice::unavailable();
        assert!(device.acquire().is_err());
        assert_eq!(handle.acquisitions(), 0);
    }
}
