//! Error types for the sync engine.

use formsync_protocol::ProtocolError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while talking to the authority.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The request could not be delivered or its response was lost.
    #[error("request error: {message}")]
    Request {
        /// Error message.
        message: String,
    },

    /// Protocol error (invalid message format).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The authority rejected the request.
    #[error("server error: {0}")]
    ServerError(String),

    /// Not connected.
    #[error("not connected to server")]
    NotConnected,
}

impl SyncError {
    /// Creates a request error.
    pub fn request(message: impl Into<String>) -> Self {
        Self::Request {
            message: message.into(),
        }
    }

    /// Returns true if the failure happened before the authority could
    /// answer, as opposed to the authority rejecting the request.
    pub fn is_request_error(&self) -> bool {
        matches!(self, SyncError::Request { .. } | SyncError::NotConnected)
    }
}

impl From<ProtocolError> for SyncError {
    fn from(err: ProtocolError) -> Self {
        SyncError::Protocol(err.to_string())
    }
}
