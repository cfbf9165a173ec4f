//! Error types for mockdeck-canvas
//!
//! Nothing in the synchronization engine itself throws past its boundary:
//! reference misses are logged no-ops and malformed inbound events are
//! dropped. These error types cover the edges where failure is real -
//! channel transport, persistence and session lifecycle.

use thiserror::Error;
use uuid::Uuid;

/// Canvas error type
#[derive(Debug, Error)]
pub enum Error {
    /// Screen not found
    #[error("screen not found: {0}")]
    ScreenNotFound(String),

    /// Shape not found
    #[error("shape not found: {0}")]
    ShapeNotFound(String),

    /// Event channel is closed or unreachable
    #[error("channel error: {0}")]
    Channel(String),

    /// Invalid or malformed event payload
    #[error("invalid event: {0}")]
    InvalidEvent(String),

    /// Session is in the wrong state for the requested transition
    #[error("invalid session state: {0}")]
    InvalidState(&'static str),

    /// Document not found in the store
    #[error("document not found: {0}")]
    DocumentNotFound(Uuid),

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a channel error
    #[must_use]
    pub fn channel(msg: impl Into<String>) -> Self {
        Self::Channel(msg.into())
    }

    /// Create a database error
    #[must_use]
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create an invalid event error
    #[must_use]
    pub fn invalid_event(msg: impl Into<String>) -> Self {
        Self::InvalidEvent(msg.into())
    }

    /// Check if the error is recoverable by retrying later
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Channel(_) | Self::Database(_))
    }

    /// Get a stable error code for status surfaces
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::ScreenNotFound(_) => "screen_not_found",
            Self::ShapeNotFound(_) => "shape_not_found",
            Self::Channel(_) => "channel_error",
            Self::InvalidEvent(_) => "invalid_event",
            Self::InvalidState(_) => "invalid_state",
            Self::DocumentNotFound(_) => "document_not_found",
            Self::Database(_) => "database_error",
            Self::Serialization(_) => "serialization_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Result type alias for canvas operations
pub type Result<T> = std::result::Result<T, Error>;
