//! Microphone capture via `cpal`.
//!
//! [`AudioCapture`] wraps the cpal host/device/stream lifecycle.  Call
//! [`AudioCapture::start`] with a sink closure to begin streaming
//! [`AudioChunk`]s.  The returned [`StreamHandle`] is a RAII guard; dropping
//! it stops the underlying cpal stream.

use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::Sample;
use thiserror::Error;

use super::resample::downmix_to_mono;

// ---------------------------------------------------------------------------
// AudioChunk
// ---------------------------------------------------------------------------

/// A single buffer of audio as delivered by the cpal callback.
///
/// Samples are interleaved `f32` in the range `[-1.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioChunk {
    /// Interleaved PCM samples in `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
    /// Sample rate of this chunk in Hz (e.g. 44100, 48000, 16000).
    pub sample_rate: u32,
    /// Number of interleaved channels (1 = mono, 2 = stereo, …).
    pub channels: u16,
}

impl AudioChunk {
    /// Downmix to a single channel.
    pub fn into_mono(self) -> Self {
        if self.channels == 1 {
            return self;
        }
        Self {
            samples: downmix_to_mono(&self.samples, self.channels),
            sample_rate: self.sample_rate,
            channels: 1,
        }
    }

    /// Playback length of the chunk.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 || self.channels == 0 {
            return Duration::ZERO;
        }
        let frames = (self.samples.len() / self.channels as usize) as u64;
        Duration::from_nanos(frames * 1_000_000_000 / u64::from(self.sample_rate))
    }
}

// ---------------------------------------------------------------------------
// StreamHandle
// ---------------------------------------------------------------------------

/// RAII guard that keeps the cpal stream alive.
///
/// `cpal::Stream` is not `Send` on every platform, so the handle must stay
/// on the thread that built it.
pub struct StreamHandle {
    _stream: cpal::Stream,
}

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Reasons a microphone could not be acquired or kept running.
///
/// Every variant means the same thing to the hands-free controller: the
/// device is unavailable.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("input device {0:?} not found")]
    DeviceNotFound(String),

    #[error("failed to enumerate input devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("unsupported input sample format: {0:?}")]
    UnsupportedFormat(cpal::SampleFormat),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("analyser size must be a power of two >= 32, got {0}")]
    InvalidFftSize(usize),

    #[error("capture thread exited before the stream started")]
    ThreadExited,
}

// ---------------------------------------------------------------------------
// AudioCapture
// ---------------------------------------------------------------------------

/// Microphone capture device wrapper built on top of `cpal`.
///
/// # Example
///
/// ```rust,no_run
/// use handsfree_voice::audio::AudioCapture;
///
/// let capture = AudioCapture::new(None).unwrap();
/// let _handle = capture
///     .start(|chunk| println!("{} samples @ {}Hz", chunk.samples.len(), chunk.sample_rate))
///     .unwrap();
/// // `_handle` keeps the stream alive; drop it to stop recording.
/// ```
pub struct AudioCapture {
    device: cpal::Device,
    config: cpal::StreamConfig,
    sample_format: cpal::SampleFormat,
    /// Native sample rate reported by the device (Hz).
    sample_rate: u32,
    /// Number of interleaved channels reported by the device.
    channels: u16,
}

impl AudioCapture {
    /// Open the input device named `device_name`, or the system default
    /// input when `None`.
    ///
    /// The device's preferred stream configuration is used as-is.
    pub fn new(device_name: Option<&str>) -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = match device_name {
            None => host.default_input_device().ok_or(CaptureError::NoDevice)?,
            Some(name) => host
                .input_devices()?
                .find(|d| d.name().is_ok_and(|n| n == name))
                .ok_or_else(|| CaptureError::DeviceNotFound(name.to_string()))?,
        };

        let supported = device.default_input_config()?;

        let channels = supported.channels();
        let sample_rate = supported.sample_rate().0;
        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();

        Ok(Self {
            device,
            config,
            sample_format,
            sample_rate,
            channels,
        })
    }

    /// Start recording and hand every hardware buffer to `sink`.
    ///
    /// The sink runs on cpal's audio thread and must not block.
    pub fn start<F>(&self, sink: F) -> Result<StreamHandle, CaptureError>
    where
        F: FnMut(AudioChunk) + Send + 'static,
    {
        let stream = match self.sample_format {
            cpal::SampleFormat::F32 => self.build::<f32, F>(sink)?,
            cpal::SampleFormat::I16 => self.build::<i16, F>(sink)?,
            cpal::SampleFormat::U16 => self.build::<u16, F>(sink)?,
            other => return Err(CaptureError::UnsupportedFormat(other)),
        };

        stream.play()?;
        Ok(StreamHandle { _stream: stream })
    }

    fn build<T, F>(&self, mut sink: F) -> Result<cpal::Stream, CaptureError>
    where
        T: cpal::SizedSample,
        f32: cpal::FromSample<T>,
        F: FnMut(AudioChunk) + Send + 'static,
    {
        let sample_rate = self.sample_rate;
        let channels = self.channels;

        let stream = self.device.build_input_stream(
            &self.config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                sink(AudioChunk {
                    samples: data.iter().map(|&s| f32::from_sample(s)).collect(),
                    sample_rate,
                    channels,
                });
            },
            |err: cpal::StreamError| {
                log::error!("cpal stream error: {err}");
            },
            None,
        )?;
        Ok(stream)
    }

    /// Native sample rate of the capture stream in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of interleaved channels in each [`AudioChunk`].
    pub fn channels(&self) -> u16 {
        self.channels
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// `AudioChunk` must be `Send` so it can cross thread boundaries.
    #[test]
    fn audio_chunk_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<AudioChunk>();
    }

    #[test]
    fn into_mono_averages_frames() {
        let chunk = AudioChunk {
            samples: vec![1.0, 0.0, 0.5, 0.5],
            sample_rate: 48_000,
            channels: 2,
        };
        let mono = chunk.into_mono();
        assert_eq!(mono.channels, 1);
        assert_eq!(mono.samples, vec![0.5, 0.5]);
        assert_eq!(mono.sample_rate, 48_000);
    }

    #[test]
    fn duration_counts_frames() {
        let chunk = AudioChunk {
            samples: vec![0.0; 9_600],
            sample_rate: 48_000,
            channels: 2,
        };
        assert_eq!(chunk.duration(), Duration::from_millis(100));
    }

    #[test]
    fn duration_of_degenerate_chunk_is_zero() {
        let chunk = AudioChunk {
            samples: vec![0.0; 10],
            sample_rate: 0,
            channels: 1,
        };
        assert_eq!(chunk.duration(), Duration::ZERO);
    }
}
