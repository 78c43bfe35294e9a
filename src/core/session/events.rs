//! Session event surface.
//!
//! A session reports five kinds of events to its presentation layer. They are
//! delivered through the [`SessionEvents`] observer trait; every method has a
//! no-op default so an implementation only overrides what it cares about.
//!
//! Two implementations ship with the crate:
//!
//! - [`SessionCallbacks`] - five optional closures, set once at construction
//! - [`ChannelEvents`] - forwards each event as a [`SessionEvent`] on a tokio channel

use std::sync::Arc;
use tokio::sync::mpsc;

/// Observer for session events.
///
/// Methods are invoked from the session's internal tasks, never while an
/// internal lock is held and never re-entrantly from another event method of
/// the same session.
pub trait SessionEvents: Send + Sync {
    /// Incremental text produced by the model during a turn.
    fn on_text(&self, _text: &str) {}

    /// The service acknowledged the setup frame. Fired once per connection.
    fn on_setup_complete(&self) {}

    /// The assistant started (`true`) or stopped (`false`) speaking.
    fn on_playing_changed(&self, _playing: bool) {}

    /// Coarse output level in the range 0..=100, for visualization.
    fn on_level_changed(&self, _level: u8) {}

    /// Transcription of a completed assistant turn.
    fn on_transcription(&self, _text: &str) {}
}

/// Event sink that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEvents;

impl SessionEvents for NoopEvents {}

// =============================================================================
// Callback-based events
// =============================================================================

/// Callback type for text events (incremental text, transcriptions).
pub type TextCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Callback type for the setup-complete event.
pub type SetupCompleteCallback = Arc<dyn Fn() + Send + Sync>;

/// Callback type for playback-state changes.
pub type PlayingCallback = Arc<dyn Fn(bool) + Send + Sync>;

/// Callback type for audio level changes.
pub type LevelCallback = Arc<dyn Fn(u8) + Send + Sync>;

/// Five independently settable callbacks.
///
/// ```rust
/// use live_tutor::core::session::SessionCallbacks;
///
/// let callbacks = SessionCallbacks::new()
///     .on_text(|text| print!("{text}"))
///     .on_setup_complete(|| println!("ready"))
///     .on_transcription(|text| println!("transcript: {text}"));
/// ```
#[derive(Clone, Default)]
pub struct SessionCallbacks {
    text: Option<TextCallback>,
    setup_complete: Option<SetupCompleteCallback>,
    playing_changed: Option<PlayingCallback>,
    level_changed: Option<LevelCallback>,
    transcription: Option<TextCallback>,
}

impl SessionCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_text(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.text = Some(Arc::new(f));
        self
    }

    pub fn on_setup_complete(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.setup_complete = Some(Arc::new(f));
        self
    }

    pub fn on_playing_changed(mut self, f: impl Fn(bool) + Send + Sync + 'static) -> Self {
        self.playing_changed = Some(Arc::new(f));
        self
    }

    pub fn on_level_changed(mut self, f: impl Fn(u8) + Send + Sync + 'static) -> Self {
        self.level_changed = Some(Arc::new(f));
        self
    }

    pub fn on_transcription(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.transcription = Some(Arc::new(f));
        self
    }
}

impl std::fmt::Debug for SessionCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionCallbacks")
            .field("text", &self.text.is_some())
            .field("setup_complete", &self.setup_complete.is_some())
            .field("playing_changed", &self.playing_changed.is_some())
            .field("level_changed", &self.level_changed.is_some())
            .field("transcription", &self.transcription.is_some())
            .finish()
    }
}

impl SessionEvents for SessionCallbacks {
    fn on_text(&self, text: &str) {
        if let Some(cb) = &self.text {
            cb(text);
        }
    }

    fn on_setup_complete(&self) {
        if let Some(cb) = &self.setup_complete {
            cb();
        }
    }

    fn on_playing_changed(&self, playing: bool) {
        if let Some(cb) = &self.playing_changed {
            cb(playing);
        }
    }

    fn on_level_changed(&self, level: u8) {
        if let Some(cb) = &self.level_changed {
            cb(level);
        }
    }

    fn on_transcription(&self, text: &str) {
        if let Some(cb) = &self.transcription {
            cb(text);
        }
    }
}

// =============================================================================
// Channel-based events
// =============================================================================

/// A session event as a value.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Text(String),
    SetupComplete,
    PlayingChanged(bool),
    LevelChanged(u8),
    Transcription(String),
}

/// Forwards every event onto an unbounded tokio channel.
///
/// Sends never block the session; events are dropped once the receiver is gone.
#[derive(Debug, Clone)]
pub struct ChannelEvents {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl ChannelEvents {
    /// Create the sink together with its receiving end.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn emit(&self, event: SessionEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("Session event receiver dropped");
        }
    }
}

impl SessionEvents for ChannelEvents {
    fn on_text(&self, text: &str) {
        self.emit(SessionEvent::Text(text.to_string()));
    }

    fn on_setup_complete(&self) {
        self.emit(SessionEvent::SetupComplete);
    }

    fn on_playing_changed(&self, playing: bool) {
        self.emit(SessionEvent::PlayingChanged(playing));
    }

    fn on_level_changed(&self, level: u8) {
        self.emit(SessionEvent::LevelChanged(level));
    }

    fn on_transcription(&self, text: &str) {
        self.emit(SessionEvent::Transcription(text.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_unset_callbacks_are_noops() {
        let callbacks = SessionCallbacks::new();
        SessionEvents::on_text(&callbacks, "hello");
        SessionEvents::on_setup_complete(&callbacks);
        SessionEvents::on_playing_changed(&callbacks, true);
        SessionEvents::on_level_changed(&callbacks, 50);
        SessionEvents::on_transcription(&callbacks, "hello");
    }

    #[test]
    fn test_callbacks_receive_values() {
        let seen = Arc::new(Mutex::new(Vec::new()));

        let text_seen = seen.clone();
        let level_seen = seen.clone();
        let callbacks = SessionCallbacks::new()
            .on_text(move |t| text_seen.lock().push(format!("text:{t}")))
            .on_level_changed(move |l| level_seen.lock().push(format!("level:{l}")));

        SessionEvents::on_text(&callbacks, "hi");
        SessionEvents::on_level_changed(&callbacks, 42);
        SessionEvents::on_transcription(&callbacks, "ignored");

        assert_eq!(*seen.lock(), vec!["text:hi", "level:42"]);
    }

    #[test]
    fn test_callbacks_debug_shows_presence() {
        let callbacks = SessionCallbacks::new().on_setup_complete(|| {});
        let debug = format!("{callbacks:?}");
        assert!(debug.contains("setup_complete: true"));
        assert!(debug.contains("transcription: false"));
    }

    #[tokio::test]
    async fn test_channel_events_forward_in_order() {
        let (events, mut rx) = ChannelEvents::new();
        events.on_setup_complete();
        events.on_playing_changed(true);
        events.on_transcription("done");

        assert_eq!(rx.recv().await, Some(SessionEvent::SetupComplete));
        assert_eq!(rx.recv().await, Some(SessionEvent::PlayingChanged(true)));
        assert_eq!(
            rx.recv().await,
            Some(SessionEvent::Transcription("done".to_string()))
        );
    }

    #[test]
    fn test_channel_events_tolerate_dropped_receiver() {
        let (events, rx) = ChannelEvents::new();
        drop(rx);
        events.on_text("nobody listening");
    }
}
