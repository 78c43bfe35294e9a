//! In-process mock of the Live API WebSocket endpoint.
//!
//! Every accepted socket is handed to the test as a [`MockConnection`], so the
//! test scripts the server side frame by frame: read the setup frame, send the
//! acknowledgement, push model output, drop the socket.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{WebSocketStream, accept_hdr_async};

/// How long helpers wait for a frame before giving up.
pub const FRAME_TIMEOUT: Duration = Duration::from_secs(3);

/// Mock server bound to an ephemeral local port.
pub struct MockLiveServer {
    /// `ws://127.0.0.1:<port>`, usable as the session endpoint
    pub endpoint: String,
    /// TCP connections accepted so far, including rejected ones
    pub accepted: Arc<AtomicUsize>,
    /// Number of upcoming connections to drop before the handshake
    pub reject_next: Arc<AtomicUsize>,
    connections: mpsc::UnboundedReceiver<MockConnection>,
}

impl MockLiveServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let accepted = Arc::new(AtomicUsize::new(0));
        let reject_next = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::unbounded_channel();

        let accepted_clone = accepted.clone();
        let reject_clone = reject_next.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                accepted_clone.fetch_add(1, Ordering::SeqCst);

                let rejected = reject_clone
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok();
                if rejected {
                    drop(stream);
                    continue;
                }

                let tx = tx.clone();
                tokio::spawn(async move {
                    if let Some(connection) = MockConnection::accept(stream).await {
                        let _ = tx.send(connection);
                    }
                });
            }
        });

        Self {
            endpoint: format!("ws://{addr}"),
            accepted,
            reject_next,
            connections: rx,
        }
    }

    /// Wait for the next completed WebSocket handshake.
    pub async fn next_connection(&mut self) -> MockConnection {
        tokio::time::timeout(FRAME_TIMEOUT, self.connections.recv())
            .await
            .expect("timed out waiting for a connection")
            .expect("accept loop ended")
    }

    /// `true` if no handshake completes within `within`.
    pub async fn no_connection_within(&mut self, within: Duration) -> bool {
        tokio::time::timeout(within, self.connections.recv())
            .await
            .is_err()
    }
}

/// Server side of one accepted socket.
pub struct MockConnection {
    /// Request path and query of the upgrade request
    pub path: String,
    ws: WebSocketStream<TcpStream>,
}

impl MockConnection {
    async fn accept(stream: TcpStream) -> Option<Self> {
        let mut path = String::new();
        let ws = accept_hdr_async(
            stream,
            |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                path = req.uri().to_string();
                Ok(resp)
            },
        )
        .await
        .ok()?;
        Some(Self { path, ws })
    }

    /// Next JSON frame from the client, `None` on close.
    pub async fn recv_json(&mut self) -> Option<Value> {
        loop {
            let message = tokio::time::timeout(FRAME_TIMEOUT, self.ws.next())
                .await
                .expect("timed out waiting for a client frame")?;
            match message.ok()? {
                Message::Text(text) => return serde_json::from_str(text.as_str()).ok(),
                Message::Binary(data) => return serde_json::from_slice(&data).ok(),
                Message::Close(_) => return None,
                _ => continue,
            }
        }
    }

    /// Read the setup frame and acknowledge it.
    pub async fn complete_setup(&mut self) -> Value {
        let setup = self.recv_json().await.expect("expected a setup frame");
        assert!(setup.get("setup").is_some(), "first frame was {setup}");
        self.send_json(json!({ "setupComplete": {} })).await;
        setup
    }

    pub async fn send_json(&mut self, value: Value) {
        self.ws
            .send(Message::Text(value.to_string().into()))
            .await
            .unwrap();
    }

    /// Same as [`send_json`](Self::send_json) but as a binary frame.
    pub async fn send_json_binary(&mut self, value: Value) {
        self.ws
            .send(Message::Binary(value.to_string().into_bytes().into()))
            .await
            .unwrap();
    }

    pub async fn send_ping(&mut self, payload: &[u8]) {
        self.ws
            .send(Message::Ping(payload.to_vec().into()))
            .await
            .unwrap();
    }

    /// Read until the client's next pong and return its payload.
    pub async fn recv_pong(&mut self) -> Vec<u8> {
        loop {
            let message = tokio::time::timeout(FRAME_TIMEOUT, self.ws.next())
                .await
                .expect("timed out waiting for pong")
                .expect("socket closed before pong");
            if let Ok(Message::Pong(data)) = message {
                return data.to_vec();
            }
        }
    }

    /// `true` if the client sends nothing within `within`.
    pub async fn silent_for(&mut self, within: Duration) -> bool {
        tokio::time::timeout(within, self.ws.next()).await.is_err()
    }

    /// Read until the client's close frame and return it.
    pub async fn recv_close(&mut self) -> Option<CloseFrame> {
        loop {
            let message = tokio::time::timeout(FRAME_TIMEOUT, self.ws.next())
                .await
                .expect("timed out waiting for close")?;
            if let Ok(Message::Close(frame)) = message {
                return frame;
            }
        }
    }

    /// Drop the TCP connection without a closing handshake.
    pub fn drop_abruptly(self) {
        drop(self.ws);
    }
}

/// An inline audio frame as the service sends it.
pub fn audio_part(data: &str) -> Value {
    json!({
        "serverContent": {
            "modelTurn": {
                "parts": [{ "inlineData": { "mimeType": "audio/pcm;rate=24000", "data": data } }]
            }
        }
    })
}

pub fn turn_complete() -> Value {
    json!({ "serverContent": { "turnComplete": true } })
}
