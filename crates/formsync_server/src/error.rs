//! Error types for the reference authority.

use formsync_protocol::ProtocolError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the reference authority.
#[derive(Error, Debug)]
pub enum ServerError {
    /// No session with this ID is hosted.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// A session with this ID already exists.
    #[error("session already exists: {0}")]
    SessionExists(String),

    /// Invalid request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The request body could not be decoded, or the response encoded.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),
}

impl ServerError {
    /// Returns true if the client caused the error (4xx).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ServerError::SessionNotFound(_)
                | ServerError::InvalidRequest(_)
                | ServerError::Protocol(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classification() {
        assert!(ServerError::SessionNotFound("s1".into()).is_client_error());
        assert!(ServerError::InvalidRequest("bad".into()).is_client_error());
        assert!(!ServerError::SessionExists("s1".into()).is_client_error());
    }

    #[test]
    fn error_display() {
        let err = ServerError::SessionNotFound("s-9".into());
        assert_eq!(err.to_string(), "session not found: s-9");
    }
}
