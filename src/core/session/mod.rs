//! Live API streaming session.
//!
//! This module maintains the persistent socket to the generative Live API and
//! multiplexes three concerns over it: outbound media chunks, inbound
//! synthesized audio, and per-turn transcription of that audio.
//!
//! # Protocol
//!
//! - Endpoint: `wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1alpha.GenerativeService.BidiGenerateContent?key=<key>`
//! - Frames: JSON, one `setup` frame first on every socket
//! - Audio out: PCM 16-bit signed little-endian at 24kHz, base64 encoded
//!
//! # Supported Voices
//!
//! Puck, Charon, Kore, Fenrir, Aoede (default)
//!
//! See [`StreamingSession`] for the lifecycle and reconnect rules.

mod base;
mod client;
mod config;
mod events;
pub mod messages;
mod tools;
mod turn;

pub use base::{SessionError, SessionResult, SessionState};
pub use client::{SessionBuilder, StreamingSession};
pub use config::{
    DEFAULT_LIVE_MODEL, DEFAULT_RECONNECT_DELAY_MS, DEFAULT_SYSTEM_INSTRUCTION, LIVE_API_ENDPOINT,
    LIVE_API_PATH, LiveVoice, OUTPUT_SAMPLE_RATE, PCM_OUTPUT_MIME, build_live_url, is_output_pcm,
};
pub use events::{
    ChannelEvents, LevelCallback, NoopEvents, PlayingCallback, SessionCallbacks, SessionEvent,
    SessionEvents, SetupCompleteCallback, TextCallback,
};
pub use messages::{ClientMessage, MediaChunk, ServerMessage};
pub use tools::{ToolDispatch, ToolHandler, ToolRegistry};
pub use turn::{CompletedTurn, TurnAccumulator};
