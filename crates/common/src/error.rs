//! Common error types for the GLBP workspace.

use std::fmt;

/// A specialized Result type for GLBP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for GLBP operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("protocol error: {0}")]
    Glbp(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unknown error: {0}")]
    Other(String),
}

impl Error {
    /// Create a new codec error.
    pub fn codec(msg: impl fmt::Display) -> Self {
        Error::Codec(msg.to_string())
    }

    /// Create a new protocol error.
    pub fn glbp(msg: impl fmt::Display) -> Self {
        Error::Glbp(msg.to_string())
    }

    /// Create a new configuration error.
    pub fn config(msg: impl fmt::Display) -> Self {
        Error::Config(msg.to_string())
    }

    /// Create a new other error.
    pub fn other(msg: impl fmt::Display) -> Self {
        Error::Other(msg.to_string())
    }
}
