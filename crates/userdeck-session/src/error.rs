//! Error types for session storage.

/// Error type for session store operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The underlying medium could not be read or written.
    #[error("Session I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be encoded or decoded.
    #[error("Session serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for session store operations.
pub type Result<T> = std::result::Result<T, Error>;
