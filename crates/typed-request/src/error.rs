//! Error types

use thiserror::Error;

/// Errors that can occur while building or sending a request
#[derive(Debug, Error)]
pub enum Error {
    /// Request body could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// URL is not usable for a request
    #[error("Invalid URL: {0}")]
    Url(String),
    /// Connection could not be established
    #[error("Connection error: {0}")]
    Connection(String),
    /// TLS setup or handshake failed
    #[error("TLS error: {0}")]
    Tls(String),
    /// I/O failure during an in-flight exchange
    #[error("I/O error: {0}")]
    Io(String),
    /// Peer sent a response this client cannot frame
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}
