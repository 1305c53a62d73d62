//! # Playback Session
//!
//! ## State Machine
//!
//! ```text
//! Idle → Bound → Preparing → Playing
//!                    ↓
//!                  Failed
//! (any) ──────────────────→ Released
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let (mut session, mut completions) = PlaybackSession::new(factory);
//!
//! session.play(Some(url), || println!("started"), |e| eprintln!("{e}"));
//!
//! // On the task that owns the session:
//! while let Some(completion) = completions.recv().await {
//!     session.handle_prepared(completion);
//! }
//! ```
//!
//! The prepare callback handed to the player only posts onto the completion
//! channel; all state changes happen in [`PlaybackSession::handle_prepared`]
//! on the owner's task.

use crate::error::{PlaybackError, Result};
use bridge_traits::{error::Result as BridgeResult, AudioAttributes, MediaPlayer, MediaPlayerFactory};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Identifies one acquired player within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl HandleId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "handle-{}", self.0)
    }
}

/// Lifecycle of a [`PlaybackHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandleState {
    Idle,
    Bound,
    Preparing,
    Playing,
    Failed,
    Released,
}

impl HandleState {
    /// Whether `next` is a legal successor of this state.
    pub fn can_transition_to(self, next: HandleState) -> bool {
        use HandleState::*;
        match (self, next) {
            (Released, _) => false,
            (_, Released) => true,
            (Idle, Bound) | (Bound, Preparing) => true,
            (Preparing, Playing) | (Preparing, Failed) => true,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, HandleState::Released)
    }
}

impl fmt::Display for HandleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HandleState::Idle => "idle",
            HandleState::Bound => "bound",
            HandleState::Preparing => "preparing",
            HandleState::Playing => "playing",
            HandleState::Failed => "failed",
            HandleState::Released => "released",
        };
        f.write_str(s)
    }
}

/// Outcome of one prepare call, tagged with the handle it belongs to.
#[derive(Debug)]
pub struct PrepareCompletion {
    pub handle: HandleId,
    pub result: BridgeResult<()>,
}

/// Receiving side of a session's completion channel.
pub type PrepareCompletions = mpsc::UnboundedReceiver<PrepareCompletion>;

/// One media player bound to one locator.
pub struct PlaybackHandle {
    id: HandleId,
    url: String,
    player: Box<dyn MediaPlayer>,
    state: HandleState,
}

impl PlaybackHandle {
    fn new(id: HandleId, url: &str, player: Box<dyn MediaPlayer>) -> Self {
        Self {
            id,
            url: url.to_string(),
            player,
            state: HandleState::Idle,
        }
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn state(&self) -> HandleState {
        self.state
    }

    fn transition(&mut self, next: HandleState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        debug!(handle = %self.id, from = %self.state, to = %next, "Handle state change");
        self.state = next;
    }

    /// Configure and bind the player, then start preparing. The handle is
    /// left in whatever state it reached when an error is returned.
    fn bind_and_prepare(
        &mut self,
        attributes: AudioAttributes,
        completions: mpsc::UnboundedSender<PrepareCompletion>,
    ) -> Result<()> {
        self.player
            .set_audio_attributes(attributes)
            .map_err(|e| PlaybackError::PlayerUnavailable(e.to_string()))?;

        self.player
            .set_data_source(&self.url)
            .map_err(|e| PlaybackError::InvalidSource(e.to_string()))?;
        self.transition(HandleState::Bound);

        let id = self.id;
        self.player
            .prepare_async(Box::new(move |result| {
                // Receiver gone means the session was dropped.
                let _ = completions.send(PrepareCompletion { handle: id, result });
            }))
            .map_err(PlaybackError::from_prepare)?;
        self.transition(HandleState::Preparing);

        Ok(())
    }

    /// Release the underlying player. Idempotent.
    pub fn release(&mut self) {
        if self.state.is_terminal() {
            return;
        }
        self.player.release();
        self.transition(HandleState::Released);
    }
}

impl Drop for PlaybackHandle {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for PlaybackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackHandle")
            .field("id", &self.id)
            .field("state", &self.state)
            .finish()
    }
}

type StartedCallback = Box<dyn FnOnce() + Send + 'static>;
type FailedCallback = Box<dyn FnOnce(PlaybackError) + Send + 'static>;

struct PendingCallbacks {
    on_started: StartedCallback,
    on_failed: FailedCallback,
}

/// Owns the single playback slot.
///
/// Not shared: the task that owns the session is the only one that mutates
/// the slot, and it feeds every [`PrepareCompletion`] back in through
/// [`handle_prepared`](Self::handle_prepared).
pub struct PlaybackSession {
    factory: Arc<dyn MediaPlayerFactory>,
    attributes: AudioAttributes,
    slot: Option<PlaybackHandle>,
    pending: Option<PendingCallbacks>,
    next_id: u64,
    completions: mpsc::UnboundedSender<PrepareCompletion>,
}

impl PlaybackSession {
    /// Create a session and the channel its prepare completions arrive on.
    pub fn new(factory: Arc<dyn MediaPlayerFactory>) -> (Self, PrepareCompletions) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Self {
            factory,
            attributes: AudioAttributes::music(),
            slot: None,
            pending: None,
            next_id: 1,
            completions: tx,
        };
        (session, rx)
    }

    /// Release any held player, then acquire a new one for `url` and start
    /// preparing it.
    ///
    /// `on_failed` fires synchronously when the locator is missing or
    /// rejected; otherwise exactly one of the callbacks fires later from
    /// [`handle_prepared`](Self::handle_prepared), unless this handle is
    /// superseded or shut down first, in which case neither fires.
    pub fn play<S, F>(&mut self, url: Option<&str>, on_started: S, on_failed: F)
    where
        S: FnOnce() + Send + 'static,
        F: FnOnce(PlaybackError) + Send + 'static,
    {
        self.teardown();

        match self.acquire(url) {
            Ok(handle) => {
                info!(handle = %handle.id(), "Preparing audio");
                self.slot = Some(handle);
                self.pending = Some(PendingCallbacks {
                    on_started: Box::new(on_started),
                    on_failed: Box::new(on_failed),
                });
            }
            Err(error) => {
                warn!(error = %error, "Audio playback failed");
                on_failed(error);
            }
        }
    }

    fn acquire(&mut self, url: Option<&str>) -> Result<PlaybackHandle> {
        let url = url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or(PlaybackError::MissingUrl)?;

        let id = HandleId(self.next_id);
        self.next_id += 1;

        let player = self
            .factory
            .create()
            .map_err(|e| PlaybackError::PlayerUnavailable(e.to_string()))?;

        // Dropping the handle on the error path releases the player.
        let mut handle = PlaybackHandle::new(id, url, player);
        handle.bind_and_prepare(self.attributes, self.completions.clone())?;
        Ok(handle)
    }

    /// Apply a prepare completion.
    ///
    /// Returns the resulting handle state, or `None` when the completion
    /// belongs to a handle that is no longer held.
    pub fn handle_prepared(&mut self, completion: PrepareCompletion) -> Option<HandleState> {
        let current = match self.slot.as_mut() {
            Some(handle)
                if handle.id == completion.handle && handle.state == HandleState::Preparing =>
            {
                handle
            }
            _ => {
                debug!(handle = %completion.handle, "Ignoring completion for stale handle");
                return None;
            }
        };

        let callbacks = self.pending.take();
        let started = completion
            .result
            .map_err(PlaybackError::from_prepare)
            .and_then(|()| current.player.start().map_err(PlaybackError::from_start));

        match started {
            Ok(()) => {
                current.transition(HandleState::Playing);
                info!(handle = %current.id, "Audio playback started");
                if let Some(callbacks) = callbacks {
                    (callbacks.on_started)();
                }
                Some(HandleState::Playing)
            }
            Err(error) => {
                current.transition(HandleState::Failed);
                warn!(handle = %current.id, error = %error, "Audio playback failed");
                if let Some(mut handle) = self.slot.take() {
                    handle.release();
                }
                if let Some(callbacks) = callbacks {
                    (callbacks.on_failed)(error);
                }
                Some(HandleState::Failed)
            }
        }
    }

    /// Release any held player. Idempotent.
    pub fn shutdown(&mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        self.pending = None;
        if let Some(mut handle) = self.slot.take() {
            handle.release();
            info!(handle = %handle.id(), "Released audio handle");
        }
    }

    /// State of the held handle, if any.
    pub fn state(&self) -> Option<HandleState> {
        self.slot.as_ref().map(PlaybackHandle::state)
    }

    /// Locator of the held handle, if any.
    pub fn current_url(&self) -> Option<&str> {
        self.slot.as_ref().map(PlaybackHandle::url)
    }

    /// Id of the held handle, if any.
    pub fn current_handle(&self) -> Option<HandleId> {
        self.slot.as_ref().map(PlaybackHandle::id)
    }
}

impl Drop for PlaybackSession {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl fmt::Debug for PlaybackSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackSession")
            .field("slot", &self.slot)
            .field("next_id", &self.next_id)
            .finish()
    }
}
