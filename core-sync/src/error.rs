use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Audio list fetch denied: {reason}")]
    ListFetchDenied { reason: String },

    #[error("Audio list listener failed: {0}")]
    Listener(String),

    #[error("Audio list listener closed by the remote side")]
    ListenerClosed,

    #[error("No async runtime available: {0}")]
    Runtime(String),
}

impl SyncError {
    /// Map a listener failure from the database bridge.
    pub fn from_listener(error: BridgeError) -> Self {
        match error {
            BridgeError::PermissionDenied(reason) => SyncError::ListFetchDenied { reason },
            other => SyncError::Listener(other.to_string()),
        }
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, SyncError::ListFetchDenied { .. })
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
