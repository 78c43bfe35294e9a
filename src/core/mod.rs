pub mod playback;
pub mod session;
pub mod transcription;

// Re-export commonly used types for convenience
pub use playback::{
    AudioFrame, AudioOutput, AudioSink, PacedOutput, PlaybackQueue, WavRecorderOutput,
};
pub use session::{
    ChannelEvents, MediaChunk, SessionCallbacks, SessionError, SessionEvent, SessionEvents,
    SessionResult, SessionState, StreamingSession, ToolRegistry,
};
pub use transcription::{GeminiTranscriber, TranscriptionError, TranscriptionProvider};
