//! # Events
//!
//! Catalog refreshes and playback transitions are broadcast on an
//! [`EventBus`] so a host can observe the core without holding the service.
//! Every [`EventStream`] sees each event emitted after it subscribed; past
//! events are not replayed.
//!
//! ```rust
//! use core_runtime::events::{CatalogEvent, CoreEvent, EventBus};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(16);
//! let mut events = bus.subscribe();
//!
//! bus.emit(CoreEvent::Catalog(CatalogEvent::Updated {
//!     entries: vec!["greeting".to_string()],
//! }));
//!
//! let event = events.recv().await.unwrap();
//! assert_eq!(event.to_string(), "audio list updated (1 entries)");
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::warn;

/// Default capacity of the broadcast channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    Catalog(CatalogEvent),
    Playback(PlaybackEvent),
}

/// Changes to the remote audio list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CatalogEvent {
    /// A new catalog snapshot was published.
    Updated {
        /// Entry names in display order.
        entries: Vec<String>,
    },
    /// The remote listener was cancelled or denied.
    FetchDenied { reason: String },
}

/// Transitions of the single playback slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// A handle was bound and asynchronous preparation began.
    Preparing { url: String },
    Started { url: String },
    /// No handle is playing. `url` is `None` when the entry had no locator.
    Failed { url: Option<String>, message: String },
    /// The held handle was released.
    Released,
}

impl fmt::Display for CoreEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreEvent::Catalog(CatalogEvent::Updated { entries }) => {
                write!(f, "audio list updated ({} entries)", entries.len())
            }
            CoreEvent::Catalog(CatalogEvent::FetchDenied { reason }) => {
                write!(f, "audio list fetch denied: {}", reason)
            }
            CoreEvent::Playback(PlaybackEvent::Preparing { .. }) => f.write_str("preparing clip"),
            CoreEvent::Playback(PlaybackEvent::Started { .. }) => f.write_str("playback started"),
            CoreEvent::Playback(PlaybackEvent::Failed { message, .. }) => {
                write!(f, "playback failed: {}", message)
            }
            CoreEvent::Playback(PlaybackEvent::Released) => f.write_str("playback released"),
        }
    }
}

/// Broadcast channel shared by the sync and playback halves of the service.
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish to current subscribers. Returns how many received it; an
    /// event emitted with nobody listening is dropped.
    pub fn emit(&self, event: CoreEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> EventStream {
        EventStream {
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

/// One subscriber's view of the bus.
///
/// A subscriber that falls more than the bus capacity behind skips the
/// overwritten events and resumes at the oldest one still buffered.
#[derive(Debug)]
pub struct EventStream {
    receiver: broadcast::Receiver<CoreEvent>,
}

impl EventStream {
    /// Next event, or `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<CoreEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next buffered event without waiting.
    pub fn try_recv(&mut self) -> Option<CoreEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event subscriber lagged");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }
}
