//! Synthesized audio playback.
//!
//! Inline audio payloads are decoded into [`AudioFrame`]s and handed to an
//! [`AudioSink`]. The provided sink, [`PlaybackQueue`], plays frames strictly
//! one after another through an [`AudioOutput`] device and reports the
//! assistant's speaking state and output level.
//!
//! # Audio Format
//!
//! PCM 16-bit signed little-endian, mono, 24kHz; normalized to f32 in [-1.0, 1.0].

mod frame;
mod output;
mod queue;

use thiserror::Error;

pub use frame::{AudioFrame, LEVEL_GAIN, decode_base64};
pub use output::{AudioOutput, PacedOutput, WavRecorderOutput};
pub use queue::{AudioSink, PlaybackQueue};

/// Errors raised while decoding or playing a frame.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The payload could not be decoded
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// The output device failed
    #[error("Audio device error: {0}")]
    Device(String),
}
