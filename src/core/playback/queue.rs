//! Serial playback queue.
//!
//! [`PlaybackQueue`] is the crate's [`AudioSink`]. A single background task
//! owns the FIFO and the one in-flight `play` future, so frames can never
//! overlap and events are emitted in the order they happen.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::future::BoxFuture;
use tokio::sync::mpsc;

use super::PlaybackError;
use super::frame::AudioFrame;
use super::output::AudioOutput;
use crate::core::session::SessionEvents;

/// Accepts decoded frames for gapless, serial playback.
pub trait AudioSink: Send + Sync {
    /// Append a frame; playback starts as soon as nothing else is playing.
    fn enqueue(&self, frame: AudioFrame);

    /// Halt the current frame and discard everything pending.
    fn stop(&self);
}

enum Command {
    Enqueue(AudioFrame),
    Stop,
}

type PlayFuture = BoxFuture<'static, Result<(), PlaybackError>>;

/// FIFO of frames played one at a time through an [`AudioOutput`].
///
/// Reports through the session events:
/// - `on_level_changed` before each frame starts (and 0 when playback ends)
/// - `on_playing_changed(true)` on the first frame of a burst
/// - `on_playing_changed(false)` once the queue has fully drained or was stopped
///
/// Must be created inside a tokio runtime. The background task ends when the
/// last handle is dropped.
#[derive(Clone)]
pub struct PlaybackQueue {
    commands: mpsc::UnboundedSender<Command>,
    playing: Arc<AtomicBool>,
}

impl PlaybackQueue {
    pub fn new(output: Arc<dyn AudioOutput>, events: Arc<dyn SessionEvents>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let playing = Arc::new(AtomicBool::new(false));

        let worker = QueueWorker {
            output,
            events,
            pending: VecDeque::new(),
            current: None,
            playing: playing.clone(),
        };
        tokio::spawn(worker.run(rx));

        Self {
            commands: tx,
            playing,
        }
    }

    /// Whether a burst is currently being played.
    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::warn!("Playback worker has stopped, dropping command");
        }
    }
}

impl AudioSink for PlaybackQueue {
    fn enqueue(&self, frame: AudioFrame) {
        self.send(Command::Enqueue(frame));
    }

    fn stop(&self) {
        self.send(Command::Stop);
    }
}

impl std::fmt::Debug for PlaybackQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackQueue")
            .field("playing", &self.is_playing())
            .finish()
    }
}

struct QueueWorker {
    output: Arc<dyn AudioOutput>,
    events: Arc<dyn SessionEvents>,
    pending: VecDeque<AudioFrame>,
    /// The single in-flight frame. Dropping it stops the frame.
    current: Option<PlayFuture>,
    playing: Arc<AtomicBool>,
}

impl QueueWorker {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Enqueue(frame)) => {
                        self.pending.push_back(frame);
                        self.advance();
                    }
                    Some(Command::Stop) => self.stop(),
                    None => break,
                },

                result = poll_current(&mut self.current), if self.current.is_some() => {
                    self.current = None;
                    if let Err(e) = result {
                        tracing::warn!("Audio frame playback failed, skipping: {}", e);
                    }
                    self.advance();
                }
            }
        }

        tracing::debug!("Playback worker ended");
    }

    /// Start the next frame if nothing is in flight; end the burst if the
    /// queue is empty.
    fn advance(&mut self) {
        if self.current.is_some() {
            return;
        }

        match self.pending.pop_front() {
            Some(frame) => {
                if !self.playing.swap(true, Ordering::SeqCst) {
                    self.events.on_playing_changed(true);
                }
                self.events.on_level_changed(frame.level());

                let output = self.output.clone();
                self.current = Some(Box::pin(async move { output.play(&frame).await }));
            }
            None => self.end_burst(),
        }
    }

    fn stop(&mut self) {
        let discarded = self.pending.len() + usize::from(self.current.is_some());
        self.current = None;
        self.pending.clear();
        if discarded > 0 {
            tracing::debug!("Playback stopped, discarded {} frame(s)", discarded);
        }
        self.end_burst();
    }

    fn end_burst(&mut self) {
        if self.playing.swap(false, Ordering::SeqCst) {
            self.events.on_level_changed(0);
            self.events.on_playing_changed(false);
        }
    }
}

async fn poll_current(current: &mut Option<PlayFuture>) -> Result<(), PlaybackError> {
    match current {
        Some(future) => future.await,
        None => std::future::pending().await,
    }
}
