//! Single owner of the "is speaking" flag.
//!
//! Every speech request (hands-free replies, manual read-aloud, stored
//! message audio) goes through one [`SpeechCoordinator`], so at most one
//! utterance plays at a time.
//!
//! ```text
//! speak(text) ─┬─ abort current playback, player.stop()   (flag stays true)
//!              ├─ generation += 1, speaking = true, emit Started
//!              └─ spawn: synthesize → play
//!                    └─ still current? speaking = false, emit Finished | Failed
//! stop()      ─── abort, player.stop(), generation += 1,
//!                 speaking = false, emit Stopped
//! ```

use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use super::player::{AudioPlayer, PlaybackError};
use super::synth::{Synthesizer, TtsError};

const EVENT_CAPACITY: usize = 32;

// ---------------------------------------------------------------------------
// SpeechEvent / SpeechError
// ---------------------------------------------------------------------------

/// Lifecycle notifications, in the order they happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    /// A request began; "is speaking" is now true.
    Started { generation: u64 },
    /// Playback ran to the end.
    Finished { generation: u64 },
    /// Synthesis or playback failed.
    Failed { generation: u64, message: String },
    /// [`SpeechCoordinator::stop`] was called.
    Stopped,
}

#[derive(Debug, Error)]
pub enum SpeechError {
    #[error(transparent)]
    Synthesis(#[from] TtsError),

    #[error(transparent)]
    Playback(#[from] PlaybackError),
}

enum SpeechSource {
    Text(String),
    Message(String),
}

// ---------------------------------------------------------------------------
// SpeechCoordinator
// ---------------------------------------------------------------------------

struct Playback {
    generation: u64,
    task: Option<JoinHandle<()>>,
}

struct Inner {
    synthesizer: Arc<dyn Synthesizer>,
    player: Arc<dyn AudioPlayer>,
    speaking: watch::Sender<bool>,
    events: broadcast::Sender<SpeechEvent>,
    playback: Mutex<Playback>,
}

impl Inner {
    fn playback(&self) -> MutexGuard<'_, Playback> {
        self.playback.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn render(&self, source: SpeechSource) -> Result<(), SpeechError> {
        let audio = match source {
            SpeechSource::Text(text) => self.synthesizer.synthesize(&text).await?,
            SpeechSource::Message(id) => self.synthesizer.message_audio(&id).await?,
        };
        self.player.play(audio).await?;
        Ok(())
    }

    fn finish(&self, generation: u64, result: Result<(), SpeechError>) {
        let mut playback = self.playback();
        if playback.generation != generation {
            log::debug!("speech: dropping completion of superseded request {generation}");
            return;
        }
        playback.task = None;
        self.speaking.send_replace(false);

        let event = match result {
            Ok(()) => SpeechEvent::Finished { generation },
            Err(e) => {
                log::warn!("speech: request {generation} failed: {e}");
                SpeechEvent::Failed {
                    generation,
                    message: e.to_string(),
                }
            }
        };
        let _ = self.events.send(event);
    }
}

/// Cheap-to-clone handle; all clones share one speaker.
///
/// `speak`, `play_message_audio` and `stop` must be called from within a
/// tokio runtime.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use handsfree_voice::config::TtsConfig;
/// use handsfree_voice::speech::{synthesizer_from_config, RodioPlayer, SpeechCoordinator};
///
/// # async fn example() {
/// let speech = SpeechCoordinator::new(
///     synthesizer_from_config(&TtsConfig::default()),
///     Arc::new(RodioPlayer::new().unwrap()),
/// );
/// speech.speak("The report is ready.");
/// assert!(speech.is_speaking());
/// # }
/// ```
#[derive(Clone)]
pub struct SpeechCoordinator {
    inner: Arc<Inner>,
}

impl SpeechCoordinator {
    pub fn new(synthesizer: Arc<dyn Synthesizer>, player: Arc<dyn AudioPlayer>) -> Self {
        let (speaking, _) = watch::channel(false);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                synthesizer,
                player,
                speaking,
                events,
                playback: Mutex::new(Playback {
                    generation: 0,
                    task: None,
                }),
            }),
        }
    }

    /// Speak `text`, replacing whatever is currently playing.
    ///
    /// Blank text is ignored.
    pub fn speak(&self, text: impl Into<String>) {
        let text = text.into();
        if text.trim().is_empty() {
            log::debug!("speech: ignoring blank text");
            return;
        }
        self.start(SpeechSource::Text(text));
    }

    /// Play the stored audio of chat message `message_id`.
    pub fn play_message_audio(&self, message_id: impl Into<String>) {
        self.start(SpeechSource::Message(message_id.into()));
    }

    fn start(&self, source: SpeechSource) {
        let mut playback = self.inner.playback();
        if let Some(task) = playback.task.take() {
            task.abort();
            self.inner.player.stop();
            log::debug!("speech: interrupted request {}", playback.generation);
        }

        playback.generation += 1;
        let generation = playback.generation;
        self.inner.speaking.send_replace(true);
        let _ = self.inner.events.send(SpeechEvent::Started { generation });

        let inner = Arc::clone(&self.inner);
        playback.task = Some(tokio::spawn(async move {
            let result = inner.render(source).await;
            inner.finish(generation, result);
        }));
    }

    /// Cut playback immediately and clear "is speaking".
    pub fn stop(&self) {
        let mut playback = self.inner.playback();
        if let Some(task) = playback.task.take() {
            task.abort();
        }
        self.inner.player.stop();
        playback.generation += 1;
        self.inner.speaking.send_replace(false);
        let _ = self.inner.events.send(SpeechEvent::Stopped);
        log::debug!("speech: stopped");
    }

    pub fn is_speaking(&self) -> bool {
        *self.inner.speaking.borrow()
    }

    /// Watch the "is speaking" flag.
    pub fn subscribe_speaking(&self) -> watch::Receiver<bool> {
        self.inner.speaking.subscribe()
    }

    /// Receive lifecycle events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SpeechEvent> {
        self.inner.events.subscribe()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
