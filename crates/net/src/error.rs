//! Network error types

use std::io;

/// Network result type
pub type Result<T> = std::result::Result<T, Error>;

/// Network errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Connection closed")]
    ConnectionClosed,

    /// Framing is broken; the connection cannot continue
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A well-framed payload that is not a valid message
    #[error("Malformed message: {0}")]
    Malformed(String),

    /// The server answered with an error outcome
    #[error("{code}: {message}")]
    Remote { code: String, message: String },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Request timed out")]
    Timeout,
}

impl Error {
    /// Error code reported by the server, if this is a remote failure
    pub fn remote_code(&self) -> Option<&str> {
        match self {
            Error::Remote { code, .. } => Some(code),
            _ => None,
        }
    }
}
