//! Error types for the signaling server

use strangers_protocol::SessionId;
use thiserror::Error;

/// Errors that can occur while serving connections
#[derive(Error, Debug)]
pub enum SignalingError {
    /// Listener or socket failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket handshake or transport error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A session was about to be placed in a second room
    #[error("Session {0} is already paired")]
    AlreadyPaired(SessionId),

    /// Unknown session
    #[error("Unknown session")]
    UnknownSession,
}

/// Errors from client requests
#[derive(Error, Debug)]
pub enum ClientRequestError {
    /// Connection was closed
    #[error("Connection closed")]
    Close,

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unsupported message type
    #[error("Unsupported message type")]
    UnsupportedType,

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
}
