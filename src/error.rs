//! Crate-level error type

use tokio_tungstenite::tungstenite;

use crate::registry::Channel;

/// Errors from the relay server and client links
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Socket bind/accept or other I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket handshake or transport failure on a client link
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] Box<tungstenite::Error>),

    /// A message could not be serialized or parsed
    #[error("invalid message: {0}")]
    Json(#[from] serde_json::Error),

    /// The link has no connection open for this channel
    #[error("channel not connected: {0}")]
    ChannelNotConnected(Channel),
}

impl From<tungstenite::Error> for Error {
    fn from(err: tungstenite::Error) -> Self {
        Error::WebSocket(Box::new(err))
    }
}

/// Result alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;
