//! # Playback Error Types
//!
//! Errors reported through a session's failure callback.

use bridge_traits::BridgeError;
use thiserror::Error;

/// Errors that can occur while starting playback of a clip.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Source Errors
    // ========================================================================
    /// The selected entry has no locator.
    #[error("No audio URL for the selected entry")]
    MissingUrl,

    /// The locator is malformed or uses an unsupported scheme.
    #[error("Invalid audio source: {0}")]
    InvalidSource(String),

    // ========================================================================
    // Player Errors
    // ========================================================================
    /// The host could not provide or configure a media player.
    #[error("Media player unavailable: {0}")]
    PlayerUnavailable(String),

    /// Asynchronous preparation failed (fetch, decode, unsupported codec).
    #[error("Failed to prepare audio: {0}")]
    PrepareFailed(String),

    /// Output could not be started once the clip was prepared.
    #[error("Failed to start playback: {0}")]
    StartFailed(String),

    /// Audio output device error.
    #[error("Audio device error: {0}")]
    AudioDevice(String),
}

impl PlaybackError {
    /// Classify a bridge failure that happened while preparing.
    pub fn from_prepare(error: BridgeError) -> Self {
        match error {
            BridgeError::InvalidSource(msg) => PlaybackError::InvalidSource(msg),
            BridgeError::AudioDevice(msg) => PlaybackError::AudioDevice(msg),
            other => PlaybackError::PrepareFailed(other.to_string()),
        }
    }

    /// Classify a bridge failure that happened while starting output.
    pub fn from_start(error: BridgeError) -> Self {
        match error {
            BridgeError::AudioDevice(msg) => PlaybackError::AudioDevice(msg),
            other => PlaybackError::StartFailed(other.to_string()),
        }
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_error_classification() {
        assert!(matches!(
            PlaybackError::from_prepare(BridgeError::InvalidSource("ftp".into())),
            PlaybackError::InvalidSource(_)
        ));
        assert!(matches!(
            PlaybackError::from_prepare(BridgeError::OperationFailed("HTTP 404".into())),
            PlaybackError::PrepareFailed(_)
        ));
        assert!(matches!(
            PlaybackError::from_start(BridgeError::AudioDevice("no device".into())),
            PlaybackError::AudioDevice(_)
        ));
        assert!(matches!(
            PlaybackError::from_start(BridgeError::InvalidSource("ftp".into())),
            PlaybackError::StartFailed(_)
        ));
    }
}
