//! Error types for the HTSP client.

use thiserror::Error;

use htsp_protocol::ProtocolError;

/// Errors surfaced to callers of the connection and demuxer.
#[derive(Error, Debug)]
pub enum HtspError {
    /// Socket-level I/O failure.
    #[error("Transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// Malformed or unexpected frame.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A pending request or open/seek exceeded its deadline.
    #[error("Request timed out")]
    Timeout,

    /// The receive loop terminated while the request was outstanding.
    #[error("Connection lost")]
    ConnectionLost,

    /// The server rejected the authenticate request.
    #[error("Authentication rejected by server")]
    AuthenticationFailed,

    /// The server declined or never acknowledged a subscribe request.
    #[error("Subscription failed: {0}")]
    SubscriptionFailed(String),

    /// The server answered a request with an error field.
    #[error("Server error: {0}")]
    Server(String),
}

pub type Result<T> = std::result::Result<T, HtspError>;
