//! Storage error types.

use thiserror::Error;

/// Errors that can occur in the object model and tracker.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed object data or identifier.
    #[error("invalid object: {0}")]
    InvalidObject(String),

    /// A content identifier that does not map to a git object.
    #[error("invalid cid: {0}")]
    InvalidCid(String),

    /// The tracker backend failed.
    #[error("tracker backend error: {0}")]
    Backend(String),
}
