//! Hands-free state machine, notifications and observer projections.
//!
//! ```text
//! Idle ──volume > threshold──▶ Listening
//! Listening ──sustained silence | max duration──▶ Processing
//! Processing ──wake + command──▶ (command dispatched) ──reply starts──▶ Speaking
//! Processing ──no match | wake only | failure | safety timeout──▶ Idle
//! Speaking ──playback finished | failed | stopped──▶ Idle
//! any ──deactivated──▶ Idle
//! ```

use std::fmt;

use tokio::sync::watch;

use crate::wake::Command;

// ---------------------------------------------------------------------------
// VadState
// ---------------------------------------------------------------------------

/// Phase of the hands-free conversation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VadState {
    /// Waiting for the volume to rise above the threshold.
    #[default]
    Idle,

    /// An utterance is being recorded.
    Listening,

    /// The utterance is being transcribed, or a command is waiting for its
    /// reply.
    Processing,

    /// Speech output is playing; the microphone is ignored.
    Speaking,
}

impl VadState {
    /// Short name for logs.
    ///
    /// ```
    /// use handsfree_voice::handsfree::VadState;
    ///
    /// assert_eq!(VadState::default().label(), "Idle");
    /// assert_eq!(VadState::Processing.label(), "Processing");
    /// ```
    pub fn label(&self) -> &'static str {
        match self {
            VadState::Idle => "Idle",
            VadState::Listening => "Listening",
            VadState::Processing => "Processing",
            VadState::Speaking => "Speaking",
        }
    }

    /// Text for a status indicator next to the visualiser.
    pub fn status_label(&self) -> &'static str {
        match self {
            VadState::Idle => "Waiting...",
            VadState::Listening => "Listening...",
            VadState::Processing => "Thinking...",
            VadState::Speaking => "Speaking...",
        }
    }
}

impl fmt::Display for VadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// HandsFreeEvent
// ---------------------------------------------------------------------------

/// Notifications delivered to the application.
#[derive(Debug, Clone, PartialEq)]
pub enum HandsFreeEvent {
    StateChanged { from: VadState, to: VadState },

    /// A wake-prefixed command was heard.  Emitted once per utterance.
    CommandDetected(Command),

    /// The wake word was heard with nothing after it.
    WakeAcknowledged,

    /// The utterance did not start with a wake word.
    UtteranceIgnored { transcript: String },

    /// Transcription failed; the loop is back to idle.
    TranscriptionFailed { message: String },

    /// Hands-free mode was switched off and the microphone released.
    Deactivated,
}

// ---------------------------------------------------------------------------
// Projections
// ---------------------------------------------------------------------------

/// Latest values observers can read or watch.  Written only by the
/// controller and its runner.
pub(crate) struct Projections {
    pub(crate) state: watch::Sender<VadState>,
    pub(crate) volume: watch::Sender<f32>,
    pub(crate) frequency: watch::Sender<Vec<u8>>,
    pub(crate) transcript: watch::Sender<Option<String>>,
    pub(crate) enabled: watch::Sender<bool>,
}

impl Projections {
    pub(crate) fn new() -> Self {
        Self {
            state: watch::channel(VadState::Idle).0,
            volume: watch::channel(0.0).0,
            frequency: watch::channel(Vec::new()).0,
            transcript: watch::channel(None).0,
            enabled: watch::channel(false).0,
        }
    }

    /// Clear the visualisation after the microphone is released.
    pub(crate) fn clear_levels(&self) {
        self.volume.send_replace(0.0);
        self.frequency.send_replace(Vec::new());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
