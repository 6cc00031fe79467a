//! The hands-free actor loop.
//!
//! One task owns every piece of mutable state: the microphone session, the
//! recorder, the silence timer and the current [`VadState`].  Everything that
//! can change that state arrives through a single `select!`:
//!
//! ```text
//! shutdown ─────────────┐
//! transcription results ┤
//! speech events ────────┼──▶ Runner ──▶ watch projections + HandsFreeEvent
//! safety deadline ──────┤
//! tick (100 ms) ────────┘
//! ```
//!
//! Transcription runs in a spawned task and reports back tagged with a
//! generation number; a result whose generation is no longer current is
//! dropped.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::audio::{compute_volume, AudioSession, VadRecorder};
use crate::config::VadConfig;
use crate::speech::{SpeechCoordinator, SpeechEvent};
use crate::stt::{SttError, Transcriber};
use crate::wake::{GateOutcome, WakeGate};

use super::state::{HandsFreeEvent, Projections, VadState};

/// A finished transcription and the generation it was started under.
pub(crate) type Completion = (u64, Result<String, SttError>);

pub(crate) struct Runner {
    config: VadConfig,
    gate: WakeGate,
    session: Box<dyn AudioSession>,
    transcriber: Arc<dyn Transcriber>,
    speech: SpeechCoordinator,
    projections: Arc<Projections>,
    events: mpsc::UnboundedSender<HandsFreeEvent>,
    completions: mpsc::UnboundedSender<Completion>,

    recorder: VadRecorder,
    state: VadState,
    /// Start of the current run of quiet samples.
    silence_since: Option<Instant>,
    recording_started: Option<Instant>,
    /// When the loop last came back to `Idle` from `Processing` or
    /// `Speaking`.
    cooled_at: Option<Instant>,
    /// Safety deadline while waiting in `Processing`.
    deadline: Option<Instant>,
    generation: u64,
}

impl Runner {
    pub(crate) fn new(
        config: VadConfig,
        gate: WakeGate,
        session: Box<dyn AudioSession>,
        transcriber: Arc<dyn Transcriber>,
        speech: SpeechCoordinator,
        projections: Arc<Projections>,
        events: mpsc::UnboundedSender<HandsFreeEvent>,
    ) -> (Self, mpsc::UnboundedReceiver<Completion>) {
        let (completions, completion_rx) = mpsc::unbounded_channel();
        let runner = Self {
            config,
            gate,
            session,
            transcriber,
            speech,
            projections,
            events,
            completions,
            recorder: VadRecorder::new(),
            state: VadState::Idle,
            silence_since: None,
            recording_started: None,
            cooled_at: None,
            deadline: None,
            generation: 0,
        };
        (runner, completion_rx)
    }

    // -----------------------------------------------------------------------
    // Main loop
    // -----------------------------------------------------------------------

    /// Run until `shutdown` fires or its sender is dropped.  The first tick
    /// happens one interval after `started`.
    pub(crate) async fn run(
        mut self,
        started: Instant,
        mut completion_rx: mpsc::UnboundedReceiver<Completion>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        let tick = self.config.tick();
        let mut ticker = time::interval_at(started + tick, tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut speech_events = self.speech.subscribe();

        if self.speech.is_speaking() {
            self.on_speaking_started();
        }

        loop {
            let deadline = self.deadline;
            tokio::select! {
                biased;

                _ = &mut shutdown => break,

                Some((generation, result)) = completion_rx.recv() => {
                    self.on_transcription(generation, result);
                }

                event = speech_events.recv() => self.on_speech_event(event),

                _ = time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.on_safety_timeout();
                }

                now = ticker.tick() => self.on_tick(now),
            }
        }

        self.shut_down();
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    fn on_tick(&mut self, now: Instant) {
        let bins = self.session.frequency_data();
        let volume = compute_volume(&bins);
        self.projections.volume.send_replace(volume);
        self.projections.frequency.send_replace(bins);
        let chunk = self.session.take_audio();

        if self.speech.is_speaking()
            || matches!(self.state, VadState::Processing | VadState::Speaking)
        {
            return;
        }

        if let Some(cooled_at) = self.cooled_at {
            if now.duration_since(cooled_at) < self.config.cooldown() {
                return;
            }
        }

        if volume > self.config.silence_threshold {
            self.silence_since = None;
            if !self.recorder.is_recording() {
                self.start_recording(now);
            }
        } else if self.recorder.is_recording() {
            match self.silence_since {
                None => self.silence_since = Some(now - self.config.tick()),
                Some(since) if now.duration_since(since) >= self.config.silence_duration() => {
                    log::debug!("handsfree: silence for {:?}", now.duration_since(since));
                    self.finalize(now);
                }
                Some(_) => {}
            }
        }

        if let Some(started) = self.recording_started {
            if self.recorder.is_recording()
                && now.duration_since(started) >= self.config.max_recording()
            {
                log::info!("handsfree: recording hit the {:?} cap", self.config.max_recording());
                self.finalize(now);
            }
        }

        if let Some(chunk) = chunk {
            self.recorder.push(chunk);
        }
    }

    fn start_recording(&mut self, now: Instant) {
        if let Err(e) = self.recorder.start() {
            log::warn!("handsfree: could not start recording: {e}");
            return;
        }
        self.recording_started = Some(now);
        self.set_state(VadState::Listening);
    }

    /// Stop the recorder and hand the utterance to the transcriber.
    fn finalize(&mut self, now: Instant) {
        self.silence_since = None;
        self.recording_started = None;

        let blob = match self.recorder.stop() {
            Ok(blob) => blob,
            Err(e) => {
                log::warn!("handsfree: could not finalize recording: {e}");
                self.return_to_idle(now);
                return;
            }
        };

        self.set_state(VadState::Processing);
        self.deadline = Some(now + self.config.reply_timeout());
        self.generation += 1;
        let generation = self.generation;
        log::debug!(
            "handsfree: transcribing utterance {generation} ({:?})",
            blob.duration
        );

        let transcriber = Arc::clone(&self.transcriber);
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let result = transcriber.transcribe(&blob).await;
            let _ = completions.send((generation, result));
        });
    }

    // -----------------------------------------------------------------------
    // Transcription
    // -----------------------------------------------------------------------

    fn on_transcription(&mut self, generation: u64, result: Result<String, SttError>) {
        if generation != self.generation || self.state != VadState::Processing {
            log::debug!("handsfree: dropping stale transcription {generation}");
            return;
        }
        let now = Instant::now();

        let text = match result {
            Ok(text) => text,
            Err(e) => {
                log::warn!("handsfree: transcription failed: {e}");
                self.emit(HandsFreeEvent::TranscriptionFailed {
                    message: e.to_string(),
                });
                self.return_to_idle(now);
                return;
            }
        };

        log::info!("handsfree: heard {text:?}");
        self.projections.transcript.send_replace(Some(text.clone()));

        match self.gate.evaluate(&text) {
            GateOutcome::Command(command) => {
                log::info!("handsfree: command {:?}", command.as_str());
                self.deadline = Some(now + self.config.reply_timeout());
                self.emit(HandsFreeEvent::CommandDetected(command));
            }
            GateOutcome::WakeOnly => {
                log::info!("handsfree: wake word without a command");
                self.emit(HandsFreeEvent::WakeAcknowledged);
                self.return_to_idle(now);
            }
            GateOutcome::NoMatch => {
                log::debug!("handsfree: ignoring {text:?}, no wake word");
                self.emit(HandsFreeEvent::UtteranceIgnored { transcript: text });
                self.return_to_idle(now);
            }
        }
    }

    fn on_safety_timeout(&mut self) {
        self.deadline = None;
        if self.state == VadState::Processing {
            log::warn!(
                "handsfree: no reply within {:?}, back to idle",
                self.config.reply_timeout()
            );
            self.return_to_idle(Instant::now());
        }
    }

    // -----------------------------------------------------------------------
    // Speech
    // -----------------------------------------------------------------------

    fn on_speech_event(&mut self, event: Result<SpeechEvent, broadcast::error::RecvError>) {
        match event {
            Ok(SpeechEvent::Started { .. }) => self.on_speaking_started(),
            Ok(SpeechEvent::Finished { .. } | SpeechEvent::Failed { .. }) => self.on_speaking_ended(),
            Ok(SpeechEvent::Stopped) => self.on_speech_stopped(),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                log::warn!("handsfree: missed {skipped} speech event(s), resyncing");
                if self.speech.is_speaking() {
                    self.on_speaking_started();
                } else {
                    self.on_speaking_ended();
                }
            }
            // The runner holds a coordinator, so the channel never closes.
            Err(broadcast::error::RecvError::Closed) => {}
        }
    }

    fn on_speaking_started(&mut self) {
        if self.recorder.is_recording() {
            log::debug!("handsfree: speech started, dropping the current recording");
            self.recorder.discard();
        }
        self.silence_since = None;
        self.recording_started = None;
        self.deadline = None;
        self.set_state(VadState::Speaking);
    }

    fn on_speaking_ended(&mut self) {
        if self.state == VadState::Speaking && !self.speech.is_speaking() {
            self.return_to_idle(Instant::now());
        }
    }

    /// An explicit stop also abandons a command still waiting for its reply.
    /// A recording in progress is the user talking and is left alone.
    fn on_speech_stopped(&mut self) {
        if matches!(self.state, VadState::Processing | VadState::Speaking) {
            log::debug!("handsfree: speech stopped in {}, back to idle", self.state.label());
            self.return_to_idle(Instant::now());
        }
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Back to `Idle` and start the cooldown window.  Any in-flight
    /// transcription becomes stale.
    fn return_to_idle(&mut self, now: Instant) {
        self.generation += 1;
        self.deadline = None;
        self.cooled_at = Some(now);
        self.set_state(VadState::Idle);
    }

    fn set_state(&mut self, to: VadState) {
        let from = self.state;
        if from == to {
            return;
        }
        log::info!("handsfree: {from} -> {to}");
        self.state = to;
        self.projections.state.send_replace(to);
        self.emit(HandsFreeEvent::StateChanged { from, to });
    }

    fn emit(&self, event: HandsFreeEvent) {
        let _ = self.events.send(event);
    }

    fn shut_down(&mut self) {
        self.recorder.discard();
        self.session.release();
        self.generation += 1;
        self.deadline = None;
        self.set_state(VadState::Idle);
        self.projections.clear_levels();
        self.emit(HandsFreeEvent::Deactivated);
        log::info!("handsfree: stopped");
    }
}
