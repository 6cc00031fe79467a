//! Push-to-talk dictation.
//!
//! The manual counterpart of hands-free mode: the caller decides when an
//! utterance starts and ends, and the transcript is returned as-is with no
//! wake-word gating.
//!
//! ```text
//! Dictation::start(device) ── acquire session, recorder.start()
//!     capture()            ── move pending audio into the recorder
//! finish(transcriber)      ── recorder.stop() → release → transcribe
//! cancel()                 ── discard → release
//! ```

use thiserror::Error;

use crate::audio::{AudioDevice, AudioSession, CaptureError, RecorderError, VadRecorder};
use crate::stt::{SttError, Transcriber};

#[derive(Debug, Error)]
pub enum DictationError {
    #[error(transparent)]
    Device(#[from] CaptureError),

    #[error(transparent)]
    Recorder(#[from] RecorderError),

    #[error(transparent)]
    Transcription(#[from] SttError),
}

/// One manual recording, from button press to transcript.
///
/// Dropping an unfinished dictation releases the microphone and discards
/// the audio.
///
/// # Example
///
/// ```rust,no_run
/// use handsfree_voice::audio::MicrophoneDevice;
/// use handsfree_voice::config::SttConfig;
/// use handsfree_voice::dictation::Dictation;
/// use handsfree_voice::stt::transcriber_from_config;
///
/// # async fn example() -> Result<(), handsfree_voice::dictation::DictationError> {
/// let device = MicrophoneDevice::new(None, 256, 60);
/// let stt = transcriber_from_config(&SttConfig::default());
///
/// let dictation = Dictation::start(&device)?;
/// tokio::time::sleep(std::time::Duration::from_secs(3)).await;
/// let text = dictation.finish(stt.as_ref()).await?;
/// println!("{text}");
/// # Ok(())
/// # }
/// ```
pub struct Dictation {
    session: Box<dyn AudioSession>,
    recorder: VadRecorder,
}

impl Dictation {
    /// Open the microphone and start recording.
    pub fn start(device: &dyn AudioDevice) -> Result<Self, DictationError> {
        let session = device.acquire()?;
        let mut recorder = VadRecorder::new();
        recorder.start()?;
        log::info!("dictation: recording");
        Ok(Self { session, recorder })
    }

    /// Move audio captured so far into the recording.
    ///
    /// Calling it periodically keeps the session's pending buffer from
    /// overwriting old audio during long dictations.
    pub fn capture(&mut self) {
        while let Some(chunk) = self.session.take_audio() {
            self.recorder.push(chunk);
        }
    }

    /// Audio recorded so far.
    pub fn duration(&mut self) -> std::time::Duration {
        self.capture();
        self.recorder.buffered_duration()
    }

    /// Stop recording, release the microphone and transcribe.
    pub async fn finish(mut self, transcriber: &dyn Transcriber) -> Result<String, DictationError> {
        self.capture();
        let blob = self.recorder.stop()?;
        self.session.release();
        log::info!("dictation: transcribing {:?}", blob.duration);

        let text = transcriber.transcribe(&blob).await?;
        Ok(text.trim().to_string())
    }

    /// Throw the recording away and release the microphone.
    pub fn cancel(mut self) {
        self.recorder.discard();
        self.session.release();
        log::info!("dictation: cancelled");
    }
}

impl Drop for Dictation {
    fn drop(&mut self) {
        self.recorder.discard();
        self.session.release();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::session::testing::{recorded_ticks, ScriptedDevice};
    use crate::stt::MockTranscriber;

    #[tokio::test]
    async fn finish_returns_trimmed_transcript() {
        let (device, script) = ScriptedDevice::new();
        let stt = MockTranscriber::ok("  take a note  ");

        let mut dictation = Dictation::start(&device).unwrap();
        for _ in 0..3 {
            // Each analyser read advances the scripted device by one chunk.
            dictation.session.frequency_data();
            dictation.capture();
        }

        let text = dictation.finish(&stt).await.unwrap();
        assert_eq!(text, "take a note");
        assert_eq!(script.releases(), 1);
        assert_eq!(recorded_ticks(&stt.blobs()[0]), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn transcription_errors_propagate() {
        let (device, script) = ScriptedDevice::new();
        let stt = MockTranscriber::err(SttError::Timeout);

        let dictation = Dictation::start(&device).unwrap();
        let err = dictation.finish(&stt).await.unwrap_err();
        assert!(matches!(err, DictationError::Transcription(SttError::Timeout)));
        assert_eq!(script.releases(), 1);
    }

    #[test]
    fn cancel_releases_without_transcribing() {
        let (device, script) = ScriptedDevice::new();
        let dictation = Dictation::start(&device).unwrap();
        dictation.cancel();
        assert_eq!(script.releases(), 1);
    }

    #[test]
    fn drop_releases_the_microphone() {
        let (device, script) = ScriptedDevice::new();
        drop(Dictation::start(&device).unwrap());
        assert_eq!(script.releases(), 1);
    }

    #[test]
    fn unavailable_device_is_reported() {
        let (device, _script) = ScriptedDevice::unavailable();
        assert!(matches!(
            Dictation::start(&device),
            Err(DictationError::Device(CaptureError::NoDevice))
        ));
    }
}
