//! Base types for the live streaming session.
//!
//! Errors, connection state and the lifecycle vocabulary shared by the
//! session client, the dispatch logic and the tests.

use std::fmt;
use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while driving a live session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Connection to the service failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Not connected
    #[error("Not connected")]
    NotConnected,
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::SerializationError(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for SessionError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        SessionError::WebSocketError(err.to_string())
    }
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

// =============================================================================
// Connection State
// =============================================================================

/// Lifecycle state of a live session.
///
/// `Disconnected → Connecting → AwaitingSetupAck → Ready → Disconnected`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No socket is open
    #[default]
    Disconnected,
    /// The socket is being opened
    Connecting,
    /// Setup frame sent, waiting for the peer to acknowledge it
    AwaitingSetupAck,
    /// Handshake complete, media may flow
    Ready,
}

impl SessionState {
    /// Whether a socket is open or being opened.
    pub fn is_active(&self) -> bool {
        !matches!(self, SessionState::Disconnected)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Disconnected => write!(f, "Disconnected"),
            SessionState::Connecting => write!(f, "Connecting"),
            SessionState::AwaitingSetupAck => write!(f, "AwaitingSetupAck"),
            SessionState::Ready => write!(f, "Ready"),
        }
    }
}

/// How a socket ended, as seen by the reconnect policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CloseKind {
    /// Closed by `disconnect()`
    Intentional,
    /// Closed by the peer, a transport error, or a failed open
    Unclean,
}
