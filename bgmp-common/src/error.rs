//! Common error types for BGMP

use std::net::SocketAddr;

use thiserror::Error;

/// Common result type for BGMP operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across both BGMP processes
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Listening address already taken by another process
    #[error("Address already in use: {0}")]
    AddressInUse(SocketAddr),

    /// Transport failure (bind, send, or use after close)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Datagram could not be encoded or decoded
    #[error("Codec error: {0}")]
    Codec(String),

    /// Message carried a topic outside the protocol vocabulary
    #[error("Unknown topic: {0}")]
    UnknownTopic(String),

    /// Message payload did not match its topic's shape
    #[error("Invalid payload for {topic}: {reason}")]
    InvalidPayload { topic: String, reason: String },

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}
