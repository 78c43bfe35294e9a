//! Live session client.
//!
//! [`StreamingSession`] owns one WebSocket to the Live API at a time. A spawned
//! connection task drives the socket: it writes frames queued through an mpsc
//! channel, dispatches inbound frames in arrival order, and reopens the socket
//! after an unexpected close once the handshake has succeeded.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use live_tutor::config::LiveConfig;
//! use live_tutor::core::session::{MediaChunk, SessionCallbacks, StreamingSession};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let events = SessionCallbacks::new()
//!     .on_setup_complete(|| println!("ready"))
//!     .on_transcription(|text| println!("assistant said: {text}"));
//!
//! let session = StreamingSession::builder(LiveConfig::from_env()?)
//!     .events(Arc::new(events))
//!     .build()?;
//!
//! session.connect().await?;
//! // ... wait for the setup-complete callback ...
//! session.send_media(MediaChunk::pcm16(&[0u8; 320], 16000)).await;
//! session.disconnect();
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use super::base::{CloseKind, SessionError, SessionResult, SessionState};
use super::config::{OUTPUT_SAMPLE_RATE, build_live_url};
use super::events::{NoopEvents, SessionEvents};
use super::messages::{
    ClientMessage, FunctionResponse, GenerationConfig, MediaChunk, PrebuiltVoiceConfig,
    ServerMessage, SetupConfig, SpeechConfig, SystemInstruction, TextPart, ToolCall,
    ToolResponse, VoiceConfig,
};
use super::tools::{ToolDispatch, ToolRegistry};
use super::turn::{CompletedTurn, TurnAccumulator};
use crate::config::LiveConfig;
use crate::core::playback::{AudioFrame, AudioOutput, AudioSink, PacedOutput, PlaybackQueue};
use crate::core::transcription::{
    GeminiTranscriber, TranscriptionProvider, WAV_MIME, wrap_pcm16,
};

/// Channel capacity for outbound WebSocket frames.
const WS_CHANNEL_CAPACITY: usize = 256;

/// How long to wait for the server to answer our close frame.
const CLOSE_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(2);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// =============================================================================
// Builder
// =============================================================================

/// Assembles a [`StreamingSession`] from its collaborators.
///
/// Everything except the configuration is optional:
/// - events default to [`NoopEvents`]
/// - the sink defaults to a [`PlaybackQueue`] over the given output
///   (or [`PacedOutput`])
/// - the transcriber defaults to [`GeminiTranscriber`] built from
///   `config.transcription`
/// - tools default to [`ToolRegistry::with_defaults`]
pub struct SessionBuilder {
    config: LiveConfig,
    events: Arc<dyn SessionEvents>,
    sink: Option<Arc<dyn AudioSink>>,
    output: Option<Arc<dyn AudioOutput>>,
    transcriber: Option<Arc<dyn TranscriptionProvider>>,
    tools: ToolRegistry,
}

impl SessionBuilder {
    pub fn events(mut self, events: Arc<dyn SessionEvents>) -> Self {
        self.events = events;
        self
    }

    /// Use a custom sink. Takes precedence over [`output`](Self::output).
    pub fn sink(mut self, sink: Arc<dyn AudioSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Device for the default [`PlaybackQueue`].
    pub fn output(mut self, output: Arc<dyn AudioOutput>) -> Self {
        self.output = Some(output);
        self
    }

    pub fn transcriber(mut self, transcriber: Arc<dyn TranscriptionProvider>) -> Self {
        self.transcriber = Some(transcriber);
        self
    }

    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    /// Validate the configuration and build the session.
    ///
    /// Must be called inside a tokio runtime when the default sink is used.
    pub fn build(self) -> SessionResult<StreamingSession> {
        self.config
            .validate()
            .map_err(SessionError::InvalidConfiguration)?;

        let sink = match self.sink {
            Some(sink) => sink,
            None => {
                let output = self.output.unwrap_or_else(|| Arc::new(PacedOutput));
                Arc::new(PlaybackQueue::new(output, self.events.clone())) as Arc<dyn AudioSink>
            }
        };

        let transcriber = match self.transcriber {
            Some(transcriber) => transcriber,
            None => Arc::new(
                GeminiTranscriber::new(self.config.transcription.clone())
                    .map_err(|e| SessionError::InvalidConfiguration(e.to_string()))?,
            ),
        };

        Ok(StreamingSession {
            inner: Arc::new(SessionInner {
                config: self.config,
                events: self.events,
                sink,
                transcriber,
                tools: self.tools,
                state: RwLock::new(SessionState::Disconnected),
                connected: AtomicBool::new(false),
                setup_complete: AtomicBool::new(false),
                ever_ready: AtomicBool::new(false),
                intentional_disconnect: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                reconnect_count: AtomicU32::new(0),
                session_id: RwLock::new(None),
                ws_sender: Mutex::new(None),
                connection_handle: Mutex::new(None),
                turn: Mutex::new(TurnAccumulator::new()),
            }),
        })
    }
}

// =============================================================================
// Streaming Session
// =============================================================================

/// Client side of a Live API session.
///
/// # Lifecycle
///
/// `connect()` opens the socket and sends the setup frame. Media is accepted
/// only after the server acknowledges setup (`on_setup_complete`); earlier
/// sends are dropped. After an unexpected close, if setup had completed since
/// the last `disconnect()`, one reconnect attempt runs after
/// `reconnect_delay_ms`; a failed attempt schedules the next one.
///
/// Dropping the session disconnects it.
pub struct StreamingSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: LiveConfig,
    events: Arc<dyn SessionEvents>,
    sink: Arc<dyn AudioSink>,
    transcriber: Arc<dyn TranscriptionProvider>,
    tools: ToolRegistry,

    state: RwLock<SessionState>,
    connected: AtomicBool,
    setup_complete: AtomicBool,
    /// Setup completed at least once since the last `disconnect()`
    ever_ready: AtomicBool,
    intentional_disconnect: AtomicBool,
    /// Bumped on every `connect()` and `disconnect()`; tasks holding an older
    /// value no longer own the session.
    generation: AtomicU64,
    reconnect_count: AtomicU32,
    session_id: RwLock<Option<String>>,

    ws_sender: Mutex<Option<mpsc::Sender<Message>>>,
    connection_handle: Mutex<Option<JoinHandle<()>>>,
    turn: Mutex<TurnAccumulator>,
}

impl StreamingSession {
    pub fn builder(config: LiveConfig) -> SessionBuilder {
        SessionBuilder {
            config,
            events: Arc::new(NoopEvents),
            sink: None,
            output: None,
            transcriber: None,
            tools: ToolRegistry::with_defaults(),
        }
    }

    /// Open the socket and send the setup frame.
    ///
    /// Returns once the setup frame is written; readiness is signalled later
    /// through `on_setup_complete`. A no-op while a socket is open or opening.
    pub async fn connect(&self) -> SessionResult<()> {
        let inner = &self.inner;

        {
            let mut state = inner.state.write();
            if state.is_active() {
                debug!("connect() called while {}, ignoring", *state);
                return Ok(());
            }
            *state = SessionState::Connecting;
        }

        inner.intentional_disconnect.store(false, Ordering::SeqCst);
        let generation = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let ws_stream = match inner.open_socket(generation).await {
            Ok(ws_stream) => ws_stream,
            Err(e) => {
                if inner.is_current(generation) {
                    *inner.state.write() = SessionState::Disconnected;
                }
                return Err(e);
            }
        };

        let Some(rx) = inner.install_sender(generation) else {
            info!("Disconnected while connecting, dropping new socket");
            return Ok(());
        };

        let handle = tokio::spawn(inner.clone().run_connection(ws_stream, rx, generation));
        *inner.connection_handle.lock() = Some(handle);

        Ok(())
    }

    /// Close the socket with a normal closure and reset the session.
    ///
    /// Idempotent. Cancels a pending reconnect, clears the turn accumulator and
    /// stops playback. Transcriptions already in flight still report.
    pub fn disconnect(&self) {
        let inner = &self.inner;

        inner.intentional_disconnect.store(true, Ordering::SeqCst);
        inner.ever_ready.store(false, Ordering::SeqCst);
        inner.generation.fetch_add(1, Ordering::SeqCst);

        let sender = inner.ws_sender.lock().take();
        let handle = inner.connection_handle.lock().take();

        let close = Message::Close(Some(CloseFrame {
            code: CloseCode::Normal,
            reason: "client disconnect".into(),
        }));
        let closing = sender.is_some_and(|tx| tx.try_send(close).is_ok());
        if !closing && let Some(handle) = handle {
            handle.abort();
        }

        let was_active = inner.state.read().is_active();
        inner.reset_after_close();

        if was_active {
            info!("Disconnected from Live API");
        }
    }

    /// Send one media chunk.
    ///
    /// Returns `false` without touching the transport unless the session is
    /// ready.
    pub async fn send_media(&self, chunk: MediaChunk) -> bool {
        if !self.is_ready() {
            debug!("Dropping media chunk, session not ready");
            return false;
        }
        self.inner.send_client_message(&ClientMessage::media(chunk)).await
    }

    /// Send a complete user text turn. Same readiness rule as
    /// [`send_media`](Self::send_media).
    pub async fn send_text(&self, text: &str) -> bool {
        if !self.is_ready() {
            debug!("Dropping text turn, session not ready");
            return false;
        }
        self.inner
            .send_client_message(&ClientMessage::user_text(text))
            .await
    }

    /// Interrupt the assistant: stop the current frame and drop queued audio.
    pub fn stop_playback(&self) {
        self.inner.sink.stop();
    }

    pub fn state(&self) -> SessionState {
        *self.inner.state.read()
    }

    /// Connected and handshake complete.
    pub fn is_ready(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
            && self.inner.setup_complete.load(Ordering::SeqCst)
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    /// Local identifier of the current socket, if one is open.
    pub fn session_id(&self) -> Option<String> {
        self.inner.session_id.read().clone()
    }

    /// Reconnect attempts made since the session was built.
    pub fn reconnect_count(&self) -> u32 {
        self.inner.reconnect_count.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &LiveConfig {
        &self.inner.config
    }
}

impl Drop for StreamingSession {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl std::fmt::Debug for StreamingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamingSession")
            .field("state", &self.state())
            .field("session_id", &self.session_id())
            .field("reconnect_count", &self.reconnect_count())
            .finish()
    }
}

// =============================================================================
// Connection Task
// =============================================================================

impl SessionInner {
    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn build_setup_config(&self) -> SetupConfig {
        SetupConfig {
            model: self.config.model.clone(),
            generation_config: GenerationConfig {
                response_modalities: vec!["AUDIO".to_string()],
                speech_config: SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: self.config.voice.as_str().to_string(),
                        },
                    },
                },
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_output_tokens,
            },
            system_instruction: SystemInstruction {
                parts: vec![TextPart {
                    text: self.config.system_instruction.clone(),
                }],
            },
        }
    }

    /// Open a socket and write the setup frame on it.
    async fn open_socket(&self, generation: u64) -> SessionResult<WsStream> {
        let url = build_live_url(&self.config.endpoint, &self.config.api_key)
            .map_err(|e| SessionError::InvalidConfiguration(format!("Invalid endpoint: {e}")))?;

        let (mut ws_stream, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| SessionError::ConnectionFailed(e.to_string()))?;

        let setup = ClientMessage::Setup(self.build_setup_config()).to_json()?;
        ws_stream.send(Message::Text(setup.into())).await?;

        if self.is_current(generation) {
            self.connected.store(true, Ordering::SeqCst);
            self.setup_complete.store(false, Ordering::SeqCst);
            *self.state.write() = SessionState::AwaitingSetupAck;
            *self.session_id.write() = Some(uuid::Uuid::new_v4().to_string());
            info!(
                "Connected to Live API (model: {}, voice: {}), awaiting setup acknowledgement",
                self.config.model, self.config.voice
            );
        }

        Ok(ws_stream)
    }

    /// Create the outbound channel for a new socket. `None` if the session
    /// moved on while the socket was opening.
    fn install_sender(&self, generation: u64) -> Option<mpsc::Receiver<Message>> {
        let (tx, rx) = mpsc::channel(WS_CHANNEL_CAPACITY);
        let mut sender = self.ws_sender.lock();
        if !self.is_current(generation) {
            return None;
        }
        *sender = Some(tx);
        Some(rx)
    }

    fn reset_after_close(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.setup_complete.store(false, Ordering::SeqCst);
        *self.state.write() = SessionState::Disconnected;
        *self.session_id.write() = None;
        *self.ws_sender.lock() = None;
        self.turn.lock().clear();
        self.sink.stop();
    }

    fn close_kind(&self) -> CloseKind {
        if self.intentional_disconnect.load(Ordering::SeqCst) {
            CloseKind::Intentional
        } else {
            CloseKind::Unclean
        }
    }

    /// Drive the socket until it closes, then apply the reconnect policy.
    async fn run_connection(
        self: Arc<Self>,
        ws_stream: WsStream,
        rx: mpsc::Receiver<Message>,
        generation: u64,
    ) {
        let mut socket = Some((ws_stream, rx));

        loop {
            let close = match socket.take() {
                Some((ws_stream, rx)) => self.drive(ws_stream, rx, generation).await,
                // A reconnect attempt failed to open
                None => CloseKind::Unclean,
            };

            if !self.is_current(generation) {
                debug!("Connection task superseded, exiting");
                return;
            }

            self.reset_after_close();

            if close == CloseKind::Intentional {
                info!("Intentional disconnect, not attempting reconnection");
                break;
            }

            if !self.ever_ready.load(Ordering::SeqCst) {
                warn!("Connection closed before setup completed, not reconnecting");
                break;
            }

            let delay = self.config.reconnect_delay();
            info!("Connection lost, reconnecting in {}ms", delay.as_millis());
            tokio::time::sleep(delay).await;

            if !self.is_current(generation) || self.intentional_disconnect.load(Ordering::SeqCst)
            {
                info!("Reconnect cancelled");
                return;
            }

            let attempt = self.reconnect_count.fetch_add(1, Ordering::SeqCst) + 1;
            *self.state.write() = SessionState::Connecting;

            match self.open_socket(generation).await {
                Ok(ws_stream) => match self.install_sender(generation) {
                    Some(rx) => {
                        info!("Reconnect attempt {} succeeded", attempt);
                        socket = Some((ws_stream, rx));
                    }
                    None => return,
                },
                Err(e) => error!("Reconnect attempt {} failed: {}", attempt, e),
            }
        }

        debug!("Live connection task ended");
    }

    /// Pump one socket: outbound frames from `rx`, inbound frames to dispatch.
    ///
    /// Once the session has moved past `generation` or a close frame has been
    /// written, inbound data frames are discarded while waiting for the close.
    async fn drive(
        &self,
        ws_stream: WsStream,
        mut rx: mpsc::Receiver<Message>,
        generation: u64,
    ) -> CloseKind {
        let (mut ws_sink, mut ws_stream) = ws_stream.split();
        let mut close_deadline: Option<Instant> = None;

        loop {
            tokio::select! {
                outgoing = rx.recv(), if close_deadline.is_none() => match outgoing {
                    Some(message) => {
                        let is_close = matches!(message, Message::Close(_));
                        if let Err(e) = ws_sink.send(message).await {
                            error!("Failed to send WebSocket message: {}", e);
                            return self.close_kind();
                        }
                        if is_close {
                            close_deadline = Some(Instant::now() + CLOSE_HANDSHAKE_TIMEOUT);
                        }
                    }
                    None => return self.close_kind(),
                },

                incoming = ws_stream.next() => match incoming {
                    Some(Ok(Message::Text(_) | Message::Binary(_)))
                        if close_deadline.is_some() || !self.is_current(generation) =>
                    {
                        debug!("Discarding frame received after disconnect");
                    }
                    Some(Ok(Message::Text(text))) => self.handle_frame(text.as_bytes()),
                    Some(Ok(Message::Binary(data))) => self.handle_frame(&data),
                    Some(Ok(Message::Ping(_))) if close_deadline.is_some() => {}
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                            error!("Failed to send pong: {}", e);
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        info!("WebSocket closed by server: {:?}", frame);
                        return self.close_kind();
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        if close_deadline.is_none() {
                            error!("WebSocket error: {}", e);
                        }
                        return self.close_kind();
                    }
                    None => return self.close_kind(),
                },

                _ = tokio::time::sleep_until(close_deadline.unwrap_or_else(Instant::now)),
                    if close_deadline.is_some() =>
                {
                    debug!("Server did not answer close frame in time");
                    return self.close_kind();
                }
            }
        }
    }

    // =========================================================================
    // Inbound Dispatch
    // =========================================================================

    fn handle_frame(&self, bytes: &[u8]) {
        match ServerMessage::from_slice(bytes) {
            Ok(message) => self.dispatch(message),
            Err(e) => warn!(
                "Failed to parse server message: {} - {}",
                e,
                String::from_utf8_lossy(bytes)
            ),
        }
    }

    fn dispatch(&self, message: ServerMessage) {
        if message.is_setup_complete() {
            self.handle_setup_complete();
        }

        if let Some(tool_call) = &message.tool_call {
            self.handle_tool_call(tool_call);
        }

        if message.is_interrupted() {
            info!("Model output interrupted, stopping playback");
            self.sink.stop();
        }

        for text in message.text_parts() {
            self.events.on_text(text);
        }

        for payload in message.audio_payloads() {
            self.turn.lock().push(payload);
            match AudioFrame::from_base64(payload) {
                Ok(frame) => self.sink.enqueue(frame),
                Err(e) => warn!("Dropping undecodable audio part: {}", e),
            }
        }

        if message.is_turn_complete() {
            // Capture before the async step so the next turn starts clean.
            let turn = self.turn.lock().take();
            if turn.payload_count() == 0 {
                debug!("Turn complete with no audio");
            } else {
                self.transcribe_turn(turn);
            }
        }

        if let Some(go_away) = &message.go_away {
            info!(
                "Server will close the connection soon (time left: {})",
                go_away.time_left.as_deref().unwrap_or("unknown")
            );
        }
    }

    fn handle_setup_complete(&self) {
        if self.setup_complete.swap(true, Ordering::SeqCst) {
            debug!("Duplicate setupComplete ignored");
            return;
        }

        self.ever_ready.store(true, Ordering::SeqCst);
        *self.state.write() = SessionState::Ready;
        info!("Live session setup complete");
        self.events.on_setup_complete();
    }

    fn handle_tool_call(&self, tool_call: &ToolCall) {
        let function_responses: Vec<FunctionResponse> = tool_call
            .function_calls
            .iter()
            .filter_map(|call| match self.tools.dispatch(&call.name, &call.args) {
                ToolDispatch::Handled(response) => Some(FunctionResponse {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    response,
                }),
                ToolDispatch::Unknown => None,
            })
            .collect();

        if function_responses.is_empty() || !self.setup_complete.load(Ordering::SeqCst) {
            return;
        }

        let message = ClientMessage::ToolResponse(ToolResponse { function_responses });
        // The connection task is the channel's consumer, so never wait here.
        match message.to_json() {
            Ok(json) => {
                let sent = self
                    .ws_sender
                    .lock()
                    .as_ref()
                    .is_some_and(|tx| tx.try_send(Message::Text(json.into())).is_ok());
                if !sent {
                    warn!("Failed to queue tool response");
                }
            }
            Err(e) => error!("Failed to serialize tool response: {}", e),
        }
    }

    fn transcribe_turn(&self, turn: CompletedTurn) {
        let transcriber = self.transcriber.clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            let payloads = turn.payload_count();
            let pcm = turn.into_pcm();
            if pcm.is_empty() {
                warn!("Turn of {} payload(s) decoded to no audio", payloads);
                return;
            }

            let wav = wrap_pcm16(&pcm, OUTPUT_SAMPLE_RATE, 1);
            debug!(
                "Transcribing turn: {} payload(s), {} bytes of PCM",
                payloads,
                pcm.len()
            );

            match transcriber.transcribe(&wav, WAV_MIME).await {
                Ok(text) if text.is_empty() => debug!("Transcription returned no text"),
                Ok(text) => events.on_transcription(&text),
                Err(e) => warn!("Transcription failed: {}", e),
            }
        });
    }

    // =========================================================================
    // Outbound
    // =========================================================================

    async fn send_client_message(&self, message: &ClientMessage) -> bool {
        let json = match message.to_json() {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to serialize client message: {}", e);
                return false;
            }
        };

        let Some(sender) = self.ws_sender.lock().clone() else {
            return false;
        };

        sender.send(Message::Text(json.into())).await.is_ok()
    }
}
