use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid media source: {0}")]
    InvalidSource(String),

    #[error("Audio device error: {0}")]
    AudioDevice(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Returns `true` when the remote side refused access, as opposed to a
    /// transport failure.
    pub fn is_denied(&self) -> bool {
        matches!(self, BridgeError::PermissionDenied(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
