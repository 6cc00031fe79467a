//! Utterance recorder driven by the hands-free orchestrator.
//!
//! # State machine
//!
//! ```text
//! NotRecording ──start()──▶ Recording ──stop()──▶ Finalizing ──▶ NotRecording
//!                               │                     (concat → 16 kHz → WAV)
//!                               └──discard()──▶ NotRecording
//! ```
//!
//! While `Recording`, every chunk handed to [`VadRecorder::push`] is kept.
//! [`VadRecorder::stop`] turns the chunks into a single [`AudioBlob`]
//! ready for upload.

use std::io::Cursor;
use std::time::Duration;

use thiserror::Error;

use super::capture::AudioChunk;
use super::resample::resample;

/// Sample rate of the uploaded audio.
pub const UPLOAD_SAMPLE_RATE: u32 = 16_000;

// ---------------------------------------------------------------------------
// AudioBlob
// ---------------------------------------------------------------------------

/// Container format of an [`AudioBlob`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    /// RIFF WAVE, 16-bit signed PCM, mono.
    Wav,
}

impl ContainerFormat {
    /// MIME type sent alongside the upload.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ContainerFormat::Wav => "audio/wav",
        }
    }

    /// File name used for the multipart upload field.
    pub fn file_name(&self) -> &'static str {
        match self {
            ContainerFormat::Wav => "recording.wav",
        }
    }
}

/// One finalised utterance.
#[derive(Debug, Clone)]
pub struct AudioBlob {
    /// Encoded container bytes.
    pub bytes: Vec<u8>,
    pub format: ContainerFormat,
    pub sample_rate: u32,
    /// Length of the encoded audio.
    pub duration: Duration,
}

// ---------------------------------------------------------------------------
// RecorderError
// ---------------------------------------------------------------------------

/// Misuse of the recorder API or an encoding failure.
#[derive(Debug, Error)]
pub enum RecorderError {
    #[error("a recording is already in progress")]
    AlreadyRecording,

    #[error("no recording is in progress")]
    NotRecording,

    #[error("failed to encode recording: {0}")]
    Encode(#[from] hound::Error),
}

// ---------------------------------------------------------------------------
// VadRecorder
// ---------------------------------------------------------------------------

/// Recorder lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecorderState {
    #[default]
    NotRecording,
    Recording,
    Finalizing,
}

/// Buffers audio chunks between [`start`](Self::start) and
/// [`stop`](Self::stop).
///
/// # Example
///
/// ```rust
/// use handsfree_voice::audio::{AudioChunk, VadRecorder};
///
/// let mut recorder = VadRecorder::new();
/// recorder.start().unwrap();
/// recorder.push(AudioChunk { samples: vec![0.0; 1_600], sample_rate: 16_000, channels: 1 });
/// let blob = recorder.stop().unwrap();
/// assert_eq!(blob.format.mime_type(), "audio/wav");
/// assert_eq!(blob.duration.as_millis(), 100);
/// ```
#[derive(Debug, Default)]
pub struct VadRecorder {
    state: RecorderState,
    chunks: Vec<AudioChunk>,
}

impl VadRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == RecorderState::Recording
    }

    /// Begin a new recording with an empty buffer.
    pub fn start(&mut self) -> Result<(), RecorderError> {
        if self.is_recording() {
            return Err(RecorderError::AlreadyRecording);
        }
        self.chunks.clear();
        self.state = RecorderState::Recording;
        Ok(())
    }

    /// Append a captured chunk.  Ignored unless recording.
    pub fn push(&mut self, chunk: AudioChunk) {
        if self.is_recording() && !chunk.samples.is_empty() {
            self.chunks.push(chunk);
        }
    }

    /// Number of chunks buffered so far.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Audio captured so far.
    pub fn buffered_duration(&self) -> Duration {
        self.chunks.iter().map(AudioChunk::duration).sum()
    }

    /// Finish the recording and encode it.
    ///
    /// The recorder is back in `NotRecording` afterwards, whether or not
    /// encoding succeeded.
    pub fn stop(&mut self) -> Result<AudioBlob, RecorderError> {
        if !self.is_recording() {
            return Err(RecorderError::NotRecording);
        }
        self.state = RecorderState::Finalizing;

        let chunks = std::mem::take(&mut self.chunks);
        let result = encode_wav(chunks);

        self.state = RecorderState::NotRecording;
        result
    }

    /// Drop an in-progress recording without encoding it.
    pub fn discard(&mut self) {
        if self.is_recording() {
            log::debug!("recorder: discarding {} chunk(s)", self.chunks.len());
        }
        self.chunks.clear();
        self.state = RecorderState::NotRecording;
    }
}

fn encode_wav(chunks: Vec<AudioChunk>) -> Result<AudioBlob, RecorderError> {
    let samples = to_upload_rate(chunks);

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: UPLOAD_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
    for &sample in &samples {
        writer.write_sample((sample.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16)?;
    }
    writer.finalize()?;

    let duration = Duration::from_nanos(
        samples.len() as u64 * 1_000_000_000 / u64::from(UPLOAD_SAMPLE_RATE),
    );

    Ok(AudioBlob {
        bytes: cursor.into_inner(),
        format: ContainerFormat::Wav,
        sample_rate: UPLOAD_SAMPLE_RATE,
        duration,
    })
}

/// Downmix `chunks` and convert them to the upload rate.  Consecutive chunks
/// at the same rate are joined first and resampled as one signal.
fn to_upload_rate(chunks: Vec<AudioChunk>) -> Vec<f32> {
    let mut out = Vec::new();
    let mut run: Vec<f32> = Vec::new();
    let mut run_rate = None;

    for chunk in chunks {
        let mono = chunk.into_mono();
        match run_rate {
            Some(rate) if rate != mono.sample_rate => {
                out.extend(resample(&run, rate, UPLOAD_SAMPLE_RATE));
                run.clear();
            }
            _ => {}
        }
        run_rate = Some(mono.sample_rate);
        run.extend_from_slice(&mono.samples);
    }
    if let Some(rate) = run_rate {
        out.extend(resample(&run, rate, UPLOAD_SAMPLE_RATE));
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(value: f32, len: usize, sample_rate: u32, channels: u16) -> AudioChunk {
        AudioChunk {
            samples: vec![value; len],
            sample_rate,
            channels,
        }
    }

    fn decode(blob: &AudioBlob) -> (hound::WavSpec, Vec<i16>) {
        let reader = hound::WavReader::new(Cursor::new(blob.bytes.clone())).expect("valid wav");
        let spec = reader.spec();
        let samples = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .expect("samples");
        (spec, samples)
    }

    #[test]
    fn starts_not_recording() {
        let recorder = VadRecorder::new();
        assert_eq!(recorder.state(), RecorderState::NotRecording);
        assert!(!recorder.is_recording());
    }

    #[test]
    fn start_twice_is_already_recording() {
        let mut recorder = VadRecorder::new();
        recorder.start().unwrap();
        assert!(matches!(
            recorder.start(),
            Err(RecorderError::AlreadyRecording)
        ));
        assert!(recorder.is_recording());
    }

    #[test]
    fn stop_without_start_is_not_recording() {
        let mut recorder = VadRecorder::new();
        assert!(matches!(recorder.stop(), Err(RecorderError::NotRecording)));
    }

    #[test]
    fn push_outside_recording_is_ignored() {
        let mut recorder = VadRecorder::new();
        recorder.push(chunk(0.5, 160, 16_000, 1));
        assert_eq!(recorder.chunk_count(), 0);

        recorder.start().unwrap();
        recorder.push(chunk(0.5, 160, 16_000, 1));
        assert_eq!(recorder.chunk_count(), 1);
    }

    #[test]
    fn stop_concatenates_chunks_into_wav() {
        let mut recorder = VadRecorder::new();
        recorder.start().unwrap();
        recorder.push(chunk(0.5, 800, 16_000, 1));
        recorder.push(chunk(-0.25, 800, 16_000, 1));

        let blob = recorder.stop().unwrap();
        assert_eq!(recorder.state(), RecorderState::NotRecording);
        assert_eq!(blob.format, ContainerFormat::Wav);
        assert_eq!(blob.duration, Duration::from_millis(100));

        let (spec, samples) = decode(&blob);
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 16_000);
        assert_eq!(samples.len(), 1_600);
        assert_eq!(samples[0], 16_384);
        assert_eq!(samples[1_599], -8_192);
    }

    #[test]
    fn stereo_48k_is_converted_to_16k_mono() {
        let mut recorder = VadRecorder::new();
        recorder.start().unwrap();
        // 100 ms of 48 kHz stereo
        recorder.push(chunk(0.1, 9_600, 48_000, 2));
        assert_eq!(recorder.buffered_duration(), Duration::from_millis(100));

        let blob = recorder.stop().unwrap();
        let (_, samples) = decode(&blob);
        assert_eq!(samples.len(), 1_600);
    }

    #[test]
    fn small_chunks_resample_without_drift() {
        let mut recorder = VadRecorder::new();
        recorder.start().unwrap();
        // 10 000 samples at 44.1 kHz, delivered in 100 pieces
        for _ in 0..100 {
            recorder.push(chunk(0.25, 100, 44_100, 1));
        }

        let (_, samples) = decode(&recorder.stop().unwrap());
        assert_eq!(samples.len(), 3_629);
        assert!(samples.iter().all(|&s| s == 8_192));
    }

    #[test]
    fn rate_change_mid_recording_keeps_both_parts() {
        let mut recorder = VadRecorder::new();
        recorder.start().unwrap();
        recorder.push(chunk(0.5, 4_800, 48_000, 1));
        recorder.push(chunk(0.5, 4_800, 48_000, 1));
        recorder.push(chunk(-0.5, 1_600, 16_000, 1));

        let (_, samples) = decode(&recorder.stop().unwrap());
        assert_eq!(samples.len(), 4_800);
        assert_eq!(samples[3_199], 16_384);
        assert_eq!(samples[3_200], -16_384);
    }

    #[test]
    fn start_clears_previous_buffer() {
        let mut recorder = VadRecorder::new();
        recorder.start().unwrap();
        recorder.push(chunk(0.5, 160, 16_000, 1));
        recorder.discard();
        assert_eq!(recorder.state(), RecorderState::NotRecording);

        recorder.start().unwrap();
        assert_eq!(recorder.chunk_count(), 0);
        let blob = recorder.stop().unwrap();
        assert_eq!(decode(&blob).1.len(), 0);
    }

    #[test]
    fn clipping_is_clamped() {
        let mut recorder = VadRecorder::new();
        recorder.start().unwrap();
        recorder.push(chunk(4.0, 10, 16_000, 1));
        let (_, samples) = decode(&recorder.stop().unwrap());
        assert!(samples.iter().all(|&s| s == i16::MAX));
    }
}
