//! Turn transcription.
//!
//! The session treats speech recognition as an opaque capability: a finished
//! turn's audio goes in, text comes out. [`TranscriptionProvider`] is that
//! seam; [`GeminiTranscriber`] implements it over the generateContent REST API.

mod gemini;
pub mod wav;

use async_trait::async_trait;
use thiserror::Error;

pub use gemini::GeminiTranscriber;
pub use wav::{WAV_MIME, wrap_pcm16};

/// Errors returned by transcription providers.
#[derive(Debug, Error)]
pub enum TranscriptionError {
    /// Provider configuration is invalid
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The request could not be sent or the response not read
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The provider rejected the credentials
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The provider returned an error
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// The provider answered with something we cannot use
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Nothing to transcribe
    #[error("No audio to transcribe")]
    EmptyAudio,
}

/// Converts an audio file to text.
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    /// Transcribe `audio`, a complete file of type `mime_type`.
    async fn transcribe(&self, audio: &[u8], mime_type: &str)
    -> Result<String, TranscriptionError>;
}
