//! Wake-word gating of transcribed utterances.

pub mod gate;

pub use gate::{Command, GateOutcome, WakeGate};
