//! Error types for the collaborator and the synchronizer.

use shared::models::{ErrorResponse, MessageId};
use thiserror::Error;

/// Failures of the stream REST collaborator.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// A non-2xx response.
    #[error("server returned {status}: {error}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Decoded error body.
        error: ErrorResponse,
    },
    /// The endpoint could not be joined onto the base URL.
    #[error("invalid endpoint: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    /// Builds a status error from a code and message.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            error: ErrorResponse::new(message),
        }
    }
}

/// Why the access gate refused to start a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessDenial {
    /// The stream has its chat feature turned off.
    #[error("chat is disabled for this stream")]
    ChatDisabled,
    /// The viewer is on the stream's ban list.
    #[error("viewer is banned from this stream")]
    ViewerBanned,
}

/// Errors surfaced by the synchronizer core.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Terminal for the session; no retries.
    #[error("chat access denied: {0}")]
    AccessDenied(AccessDenial),
    /// A collaborator call failed.
    #[error(transparent)]
    Api(#[from] ApiError),
    /// No store holds a message with this id.
    #[error("message {0} is not loaded in this stream")]
    UnknownMessage(MessageId),
    /// Blank content was rejected before any request.
    #[error("message content must not be empty")]
    EmptyContent,
    /// The session or store was disposed.
    #[error("stream session has been disposed")]
    Disposed,
}

/// Result alias for synchronizer operations.
pub type SyncResult<T> = Result<T, SyncError>;
