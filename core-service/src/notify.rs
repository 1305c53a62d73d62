//! User-facing notifications.
//!
//! A [`Notifier`] is the host's short, transient message surface (a toast,
//! a status line, a desktop notification). The service raises one
//! [`Notification`] for each outcome a user should hear about.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

/// Outcome surfaced to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Notification {
    /// The audio list listener was denied or stopped.
    ListFetchFailed,
    /// The selected clip began playing.
    PlaybackStarted,
    /// The selected clip could not be bound, prepared or started.
    PlaybackFailed,
}

impl Notification {
    pub fn message(self) -> &'static str {
        match self {
            Notification::ListFetchFailed => "Failed to retrieve audio list",
            Notification::PlaybackStarted => "Audio playback started",
            Notification::PlaybackFailed => "Audio playback failed",
        }
    }

    pub fn is_failure(self) -> bool {
        !matches!(self, Notification::PlaybackStarted)
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Host surface for transient user messages.
///
/// Called from the service's event loop, so implementations should hand
/// the message off rather than block.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the `tracing` log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        if notification.is_failure() {
            warn!(target: "clipdeck::notify", "{}", notification);
        } else {
            info!(target: "clipdeck::notify", "{}", notification);
        }
    }
}
