//! Audio output for synthesized speech.
//!
//! [`RodioPlayer`] keeps the `rodio` output stream on a dedicated thread
//! (the stream handle cannot move between threads on every platform) and
//! drives it through a command channel:
//!
//! ```text
//! play(audio) ──Play{audio, done}──▶ playback thread: new Sink, append Decoder
//!                                        └─ sink empty ─▶ done.send(Ok)
//! stop()      ──Stop──────────────▶ sink.stop() ─▶ done.send(Ok)
//! ```

use std::io::Cursor;
use std::sync::mpsc;
use std::time::Duration;

use async_trait::async_trait;
use rodio::{Decoder, OutputStream, Sink, Source};
use thiserror::Error;
use tokio::sync::oneshot;

use super::synth::SpeechAudio;

/// How often the playback thread checks whether the sink drained.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

// ---------------------------------------------------------------------------
// PlaybackError
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Error)]
pub enum PlaybackError {
    #[error("no audio output available: {0}")]
    Output(String),

    #[error("could not decode {mime_type} audio: {message}")]
    Decode { mime_type: String, message: String },

    #[error("playback thread is not running")]
    ThreadExited,
}

// ---------------------------------------------------------------------------
// AudioPlayer trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait AudioPlayer: Send + Sync {
    /// Play `audio` to the end.  Resolves early with `Ok` when
    /// [`stop`](Self::stop) interrupts it.
    async fn play(&self, audio: SpeechAudio) -> Result<(), PlaybackError>;

    /// Silence the output immediately.
    fn stop(&self);
}

// ---------------------------------------------------------------------------
// RodioPlayer
// ---------------------------------------------------------------------------

enum PlayerCommand {
    Play {
        audio: SpeechAudio,
        done: oneshot::Sender<Result<(), PlaybackError>>,
    },
    Stop,
}

/// Default-output-device player backed by `rodio`.
///
/// The playback thread exits when the player is dropped.
pub struct RodioPlayer {
    commands: mpsc::Sender<PlayerCommand>,
}

impl RodioPlayer {
    /// Open the default output device.
    pub fn new() -> Result<Self, PlaybackError> {
        let (commands, command_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        std::thread::Builder::new()
            .name("speech-playback".into())
            .spawn(move || {
                let (_stream, handle) = match OutputStream::try_default() {
                    Ok(pair) => pair,
                    Err(e) => {
                        let _ = ready_tx.send(Err(PlaybackError::Output(e.to_string())));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                run_playback(&handle, command_rx);
                log::debug!("speech: playback thread stopped");
            })
            .map_err(|e| PlaybackError::Output(e.to_string()))?;

        ready_rx.recv().map_err(|_| PlaybackError::ThreadExited)??;
        log::info!("speech: audio output ready");
        Ok(Self { commands })
    }
}

fn run_playback(handle: &rodio::OutputStreamHandle, commands: mpsc::Receiver<PlayerCommand>) {
    let mut current: Option<(Sink, oneshot::Sender<Result<(), PlaybackError>>)> = None;

    loop {
        match commands.recv_timeout(POLL_INTERVAL) {
            Ok(PlayerCommand::Play { audio, done }) => {
                if let Some((sink, previous)) = current.take() {
                    sink.stop();
                    let _ = previous.send(Ok(()));
                }
                match start_sink(handle, audio) {
                    Ok(sink) => current = Some((sink, done)),
                    Err(e) => {
                        let _ = done.send(Err(e));
                    }
                }
            }
            Ok(PlayerCommand::Stop) => {
                if let Some((sink, done)) = current.take() {
                    sink.stop();
                    let _ = done.send(Ok(()));
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }

        if let Some((sink, done)) = current.take() {
            if sink.empty() {
                let _ = done.send(Ok(()));
            } else {
                current = Some((sink, done));
            }
        }
    }
}

fn start_sink(handle: &rodio::OutputStreamHandle, audio: SpeechAudio) -> Result<Sink, PlaybackError> {
    let sink = Sink::try_new(handle).map_err(|e| PlaybackError::Output(e.to_string()))?;
    let source = Decoder::new(Cursor::new(audio.bytes)).map_err(|e| PlaybackError::Decode {
        mime_type: audio.mime_type.clone(),
        message: e.to_string(),
    })?;
    sink.append(source.convert_samples::<f32>());
    Ok(sink)
}

#[async_trait]
impl AudioPlayer for RodioPlayer {
    async fn play(&self, audio: SpeechAudio) -> Result<(), PlaybackError> {
        let (done, finished) = oneshot::channel();
        self.commands
            .send(PlayerCommand::Play { audio, done })
            .map_err(|_| PlaybackError::ThreadExited)?;
        finished.await.map_err(|_| PlaybackError::ThreadExited)?
    }

    fn stop(&self) {
        let _ = self.commands.send(PlayerCommand::Stop);
    }
}

// ---------------------------------------------------------------------------
// MockPlayer  (test-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
pub use mock::MockPlayer;

#[cfg(test)]
mod mock {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::{AudioPlayer, PlaybackError};
    use crate::speech::synth::SpeechAudio;

    /// "Plays" for a fixed span of (virtual) time.
    pub struct MockPlayer {
        duration: Duration,
        fail: bool,
        plays: AtomicUsize,
        stops: AtomicUsize,
    }

    impl MockPlayer {
        pub fn new(duration: Duration) -> Self {
            Self {
                duration,
                fail: false,
                plays: AtomicUsize::new(0),
                stops: AtomicUsize::new(0),
            }
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(Duration::ZERO)
            }
        }

        pub fn plays(&self) -> usize {
            self.plays.load(Ordering::SeqCst)
        }

        pub fn stops(&self) -> usize {
            self.stops.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AudioPlayer for MockPlayer {
        async fn play(&self, _audio: SpeechAudio) -> Result<(), PlaybackError> {
            self.plays.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(PlaybackError::Output("no device".into()));
            }
            tokio::time::sleep(self.duration).await;
            Ok(())
        }

        fn stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_is_object_safe() {
        let player: Box<dyn AudioPlayer> = Box::new(MockPlayer::new(Duration::ZERO));
        player.stop();
    }

    #[test]
    fn decode_error_names_mime_type() {
        let e = PlaybackError::Decode {
            mime_type: "audio/mpeg".into(),
            message: "unrecognized format".into(),
        };
        assert!(e.to_string().contains("audio/mpeg"));
    }

    #[tokio::test(start_paused = true)]
    async fn mock_player_takes_its_duration() {
        let player = MockPlayer::new(Duration::from_secs(2));
        let started = tokio::time::Instant::now();
        player
            .play(SpeechAudio {
                bytes: vec![],
                mime_type: "audio/mpeg".into(),
            })
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_secs(2));
        assert_eq!(player.plays(), 1);
    }
}
