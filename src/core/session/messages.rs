//! Live API WebSocket message types.
//!
//! All frames are JSON. Outbound keys are snake_case, inbound keys camelCase.
//!
//! # Protocol Overview
//!
//! Client messages (sent to server):
//! - setup - model, generation config and system instruction; first frame on every socket
//! - realtime_input - streamed media chunks (audio, video frames)
//! - client_content - a complete text turn
//! - tool_response - results of tool invocations
//!
//! Server messages (received from server):
//! - setupComplete - acknowledges the setup frame
//! - toolCall - the model wants local functions invoked
//! - serverContent - model turn parts (inline audio, text), turn boundaries, interruptions
//! - goAway - the server will close the socket soon

use base64::prelude::*;
use serde::{Deserialize, Serialize};

use super::config::is_output_pcm;

// =============================================================================
// Client Messages
// =============================================================================

/// Frames sent by the client. Serialized externally tagged, e.g. `{"setup": {...}}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientMessage {
    Setup(SetupConfig),
    RealtimeInput(RealtimeInput),
    ClientContent(ClientContent),
    ToolResponse(ToolResponse),
}

impl ClientMessage {
    /// Wrap a single media chunk in a realtime input frame.
    pub fn media(chunk: MediaChunk) -> Self {
        ClientMessage::RealtimeInput(RealtimeInput {
            media_chunks: vec![chunk],
        })
    }

    /// A complete user text turn.
    pub fn user_text(text: &str) -> Self {
        ClientMessage::ClientContent(ClientContent {
            turns: vec![Turn {
                role: "user".to_string(),
                parts: vec![TextPart {
                    text: text.to_string(),
                }],
            }],
            turn_complete: true,
        })
    }

    /// Serialize to the JSON text sent on the wire.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Session setup sent once per socket, before any media.
#[derive(Debug, Clone, Serialize)]
pub struct SetupConfig {
    /// Target model identifier
    pub model: String,
    pub generation_config: GenerationConfig,
    pub system_instruction: SystemInstruction,
}

/// Generation parameters.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationConfig {
    /// Response modalities; always `["AUDIO"]` for live sessions
    pub response_modalities: Vec<String>,
    pub speech_config: SpeechConfig,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SpeechConfig {
    pub voice_config: VoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct VoiceConfig {
    pub prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrebuiltVoiceConfig {
    pub voice_name: String,
}

/// Opaque persona prompt.
#[derive(Debug, Clone, Serialize)]
pub struct SystemInstruction {
    pub parts: Vec<TextPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextPart {
    pub text: String,
}

/// Streamed media.
#[derive(Debug, Clone, Serialize)]
pub struct RealtimeInput {
    pub media_chunks: Vec<MediaChunk>,
}

/// One media chunk: mime type plus base64 payload.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MediaChunk {
    pub mime_type: String,
    /// Base64-encoded bytes
    pub data: String,
}

impl MediaChunk {
    /// Encode raw bytes of the given mime type.
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: BASE64_STANDARD.encode(bytes),
        }
    }

    /// 16-bit little-endian mono PCM at `sample_rate`.
    pub fn pcm16(bytes: &[u8], sample_rate: u32) -> Self {
        Self::from_bytes(format!("audio/pcm;rate={sample_rate}"), bytes)
    }

    /// A JPEG-encoded video frame.
    pub fn jpeg(bytes: &[u8]) -> Self {
        Self::from_bytes("image/jpeg", bytes)
    }
}

/// A complete client turn.
#[derive(Debug, Clone, Serialize)]
pub struct ClientContent {
    pub turns: Vec<Turn>,
    pub turn_complete: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    pub role: String,
    pub parts: Vec<TextPart>,
}

/// Tool invocation results.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResponse {
    pub function_responses: Vec<FunctionResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub response: serde_json::Value,
}

// =============================================================================
// Server Messages
// =============================================================================

/// A frame received from the server.
///
/// Fields are independent; a single frame may carry several of them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    /// Present (usually `{}` or `true`) on the handshake acknowledgement
    #[serde(default)]
    pub setup_complete: Option<serde_json::Value>,
    #[serde(default)]
    pub tool_call: Option<ToolCall>,
    #[serde(default)]
    pub server_content: Option<ServerContent>,
    #[serde(default)]
    pub go_away: Option<GoAway>,
}

impl ServerMessage {
    /// Parse a frame from raw bytes (text frames and binary-framed text alike).
    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Whether this frame acknowledges the setup frame.
    pub fn is_setup_complete(&self) -> bool {
        match &self.setup_complete {
            None | Some(serde_json::Value::Null) | Some(serde_json::Value::Bool(false)) => false,
            Some(_) => true,
        }
    }

    /// Raw base64 payloads of the 24 kHz PCM parts in the model turn, in order.
    pub fn audio_payloads(&self) -> impl Iterator<Item = &str> {
        self.parts()
            .filter_map(|part| part.inline_data.as_ref())
            .filter(|blob| is_output_pcm(&blob.mime_type))
            .map(|blob| blob.data.as_str())
    }

    /// Text parts in the model turn, in order.
    pub fn text_parts(&self) -> impl Iterator<Item = &str> {
        self.parts().filter_map(|part| part.text.as_deref())
    }

    /// Whether the model finished its turn.
    pub fn is_turn_complete(&self) -> bool {
        self.server_content
            .as_ref()
            .is_some_and(|content| content.turn_complete)
    }

    /// Whether the server interrupted the model's output (user barge-in).
    pub fn is_interrupted(&self) -> bool {
        self.server_content
            .as_ref()
            .is_some_and(|content| content.interrupted)
    }

    fn parts(&self) -> impl Iterator<Item = &Part> {
        self.server_content
            .as_ref()
            .and_then(|content| content.model_turn.as_ref())
            .into_iter()
            .flat_map(|turn| turn.parts.iter())
    }
}

/// Tool invocation request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    #[serde(default)]
    pub function_calls: Vec<FunctionCall>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FunctionCall {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub args: serde_json::Value,
}

/// Model output and turn boundaries.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerContent {
    #[serde(default)]
    pub model_turn: Option<ModelTurn>,
    #[serde(default)]
    pub turn_complete: bool,
    #[serde(default)]
    pub interrupted: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelTurn {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub inline_data: Option<InlineData>,
}

/// Inline binary payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    /// Base64-encoded bytes
    pub data: String,
}

/// Advance notice that the server will close the socket.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoAway {
    #[serde(default)]
    pub time_left: Option<String>,
}
