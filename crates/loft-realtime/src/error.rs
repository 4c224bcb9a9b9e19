//! Error handling for the realtime client.

use std::time::Duration;

use thiserror::Error;

/// The result type used throughout the realtime client.
pub type ClientResult<T> = Result<T, ClientError>;

/// Error type for all realtime client operations.
///
/// Only the very first `connect` attempt surfaces errors to the caller;
/// everything after that is observed through the connection-status event
/// stream.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Configuration errors.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// WebSocket transport errors.
    #[error("websocket error: {message}")]
    Websocket { message: String },

    /// The connection was closed.
    #[error("connection closed{}", .reason.as_deref().map(|r| format!(": {r}")).unwrap_or_default())]
    ConnectionClosed { reason: Option<String> },

    /// An operation did not complete in time.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::Websocket {
            message: e.to_string(),
        }
    }
}

impl ClientError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a WebSocket error.
    pub fn websocket(message: impl Into<String>) -> Self {
        Self::Websocket {
            message: message.into(),
        }
    }

    /// Create a connection-closed error.
    pub fn connection_closed(reason: Option<String>) -> Self {
        Self::ConnectionClosed { reason }
    }

    /// Create a timeout error.
    pub fn timeout(duration: Duration) -> Self {
        Self::Timeout { duration }
    }
}
