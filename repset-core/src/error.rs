//! Error types for repset-core

use thiserror::Error;

/// Main error type for the repset-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Network-level failure (connect, timeout, TLS)
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-2xx response from the coach API
    #[error("api error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Backend reachable but reporting an unhealthy status
    #[error("backend unhealthy: {0}")]
    Unhealthy(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for failures that never reached the backend.
    ///
    /// Only these count toward the ambient unavailability streak; API-level
    /// errors surface through store state instead.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}

/// Result type alias for repset-core
pub type Result<T> = std::result::Result<T, Error>;
