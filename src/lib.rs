//! Hands-free voice conversation core.
//!
//! Listens to the microphone, cuts utterances out of the stream with a
//! volume-based voice activity detector, transcribes them, keeps only those
//! addressed to the assistant by a wake word, and speaks replies without
//! hearing itself.
//!
//! | Module        | Role                                                  |
//! |---------------|-------------------------------------------------------|
//! | [`audio`]     | microphone sessions, spectrum, volume, WAV recorder   |
//! | [`handsfree`] | the `Idle/Listening/Processing/Speaking` loop         |
//! | [`wake`]      | wake-word gate                                        |
//! | [`stt`]       | transcription service clients                         |
//! | [`speech`]    | synthesis clients, playback, speech coordinator       |
//! | [`dictation`] | push-to-talk recording                                |
//! | [`config`]    | `settings.toml` persistence                           |

pub mod audio;
pub mod config;
pub mod dictation;
pub mod handsfree;
pub mod speech;
pub mod stt;
pub mod wake;
