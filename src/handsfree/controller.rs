//! Public handle for switching hands-free mode on and off.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::audio::{AudioDevice, CaptureError};
use crate::config::{AppConfig, VadConfig, VadConfigError};
use crate::speech::SpeechCoordinator;
use crate::stt::Transcriber;
use crate::wake::WakeGate;

use super::runner::Runner;
use super::state::{HandsFreeEvent, Projections, VadState};

// ---------------------------------------------------------------------------
// HandsFreeError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum HandsFreeError {
    /// The microphone could not be opened; hands-free mode stays off.
    #[error("microphone unavailable: {0}")]
    DeviceUnavailable(#[source] CaptureError),

    /// The VAD settings cannot drive the loop; hands-free mode stays off.
    #[error("invalid hands-free settings: {0}")]
    InvalidConfig(#[from] VadConfigError),
}

// ---------------------------------------------------------------------------
// HandsFreeMode
// ---------------------------------------------------------------------------

struct Running {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Continuous listening with voice activity detection and wake-word gating.
///
/// While enabled, a background task samples the microphone every tick,
/// records utterances, transcribes them and reports wake-prefixed commands
/// as [`HandsFreeEvent::CommandDetected`].  Replies are spoken through the
/// shared [`SpeechCoordinator`]; the microphone is ignored while it speaks.
///
/// Dropping the handle stops the loop and releases the microphone.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use handsfree_voice::audio::MicrophoneDevice;
/// use handsfree_voice::config::AppConfig;
/// use handsfree_voice::handsfree::{HandsFreeEvent, HandsFreeMode};
/// use handsfree_voice::speech::{synthesizer_from_config, RodioPlayer, SpeechCoordinator};
/// use handsfree_voice::stt::transcriber_from_config;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = AppConfig::default();
/// let speech = SpeechCoordinator::new(
///     synthesizer_from_config(&config.tts),
///     Arc::new(RodioPlayer::new()?),
/// );
/// let (mut mode, mut events) = HandsFreeMode::new(
///     &config,
///     Arc::new(MicrophoneDevice::from_config(&config)),
///     transcriber_from_config(&config.stt),
///     speech.clone(),
/// );
///
/// mode.toggle(true).await?;
/// while let Some(event) = events.recv().await {
///     if let HandsFreeEvent::CommandDetected(command) = event {
///         speech.speak(format!("You said {command}"));
///     }
/// }
/// # Ok(())
/// # }
/// ```
pub struct HandsFreeMode {
    vad: VadConfig,
    gate: WakeGate,
    device: Arc<dyn AudioDevice>,
    transcriber: Arc<dyn Transcriber>,
    speech: SpeechCoordinator,
    projections: Arc<Projections>,
    events: mpsc::UnboundedSender<HandsFreeEvent>,
    running: Option<Running>,
}

impl HandsFreeMode {
    /// Create a disabled hands-free controller and the receiver for its
    /// notifications.
    pub fn new(
        config: &AppConfig,
        device: Arc<dyn AudioDevice>,
        transcriber: Arc<dyn Transcriber>,
        speech: SpeechCoordinator,
    ) -> (Self, mpsc::UnboundedReceiver<HandsFreeEvent>) {
        let (events, event_rx) = mpsc::unbounded_channel();
        let mode = Self {
            vad: config.vad.clone(),
            gate: WakeGate::from_config(&config.wake),
            device,
            transcriber,
            speech,
            projections: Arc::new(Projections::new()),
            events,
            running: None,
        };
        (mode, event_rx)
    }

    /// Switch hands-free mode on or off.  Switching to the current value is
    /// a no-op.
    ///
    /// Enabling checks the VAD settings and acquires the microphone.  If
    /// either fails the toggle stays off and the error is returned.
    pub async fn toggle(&mut self, enable: bool) -> Result<(), HandsFreeError> {
        match (enable, self.running.is_some()) {
            (true, false) => self.activate().await,
            (false, true) => {
                self.deactivate().await;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    async fn activate(&mut self) -> Result<(), HandsFreeError> {
        if let Err(e) = self.vad.validate() {
            log::error!("handsfree: refusing to start: {e}");
            return Err(e.into());
        }
        self.projections.enabled.send_replace(true);

        let device = Arc::clone(&self.device);
        let acquired = tokio::task::spawn_blocking(move || device.acquire())
            .await
            .unwrap_or_else(|e| {
                log::error!("handsfree: acquire task failed: {e}");
                Err(CaptureError::ThreadExited)
            });

        let session = match acquired {
            Ok(session) => session,
            Err(e) => {
                log::error!("handsfree: could not open the microphone: {e}");
                self.projections.enabled.send_replace(false);
                return Err(HandsFreeError::DeviceUnavailable(e));
            }
        };

        let (runner, completion_rx) = Runner::new(
            self.vad.clone(),
            self.gate.clone(),
            session,
            Arc::clone(&self.transcriber),
            self.speech.clone(),
            Arc::clone(&self.projections),
            self.events.clone(),
        );
        let (shutdown, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(runner.run(Instant::now(), completion_rx, shutdown_rx));

        self.running = Some(Running { shutdown, task });
        log::info!("handsfree: enabled");
        Ok(())
    }

    async fn deactivate(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        let _ = running.shutdown.send(());
        if let Err(e) = running.task.await {
            log::error!("handsfree: loop ended abnormally: {e}");
            self.projections.state.send_replace(VadState::Idle);
            self.projections.clear_levels();
        }
        self.projections.enabled.send_replace(false);
        log::info!("handsfree: disabled");
    }

    pub fn is_enabled(&self) -> bool {
        *self.projections.enabled.borrow()
    }

    pub fn subscribe_enabled(&self) -> watch::Receiver<bool> {
        self.projections.enabled.subscribe()
    }

    pub fn state(&self) -> VadState {
        *self.projections.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<VadState> {
        self.projections.state.subscribe()
    }

    /// Volume of the latest sample, `0.0` when disabled.
    pub fn volume(&self) -> f32 {
        *self.projections.volume.borrow()
    }

    pub fn subscribe_volume(&self) -> watch::Receiver<f32> {
        self.projections.volume.subscribe()
    }

    /// Byte spectrum of the latest sample, empty when disabled.
    pub fn frequency_data(&self) -> Vec<u8> {
        self.projections.frequency.borrow().clone()
    }

    pub fn subscribe_frequency_data(&self) -> watch::Receiver<Vec<u8>> {
        self.projections.frequency.subscribe()
    }

    /// Most recent transcript, wake word included.
    pub fn last_transcript(&self) -> Option<String> {
        self.projections.transcript.borrow().clone()
    }

    pub fn subscribe_transcript(&self) -> watch::Receiver<Option<String>> {
        self.projections.transcript.subscribe()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
