//! Protocol error types.

use pfg_git::GitError;
use pfg_storage::{ObjectId, StorageError};
use thiserror::Error;

/// Errors that can occur while serving a remote-helper session.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// git sent a command we do not understand.
    #[error("received unknown command {0:?}")]
    UnknownCommand(String),

    /// A known command with missing or invalid arguments.
    #[error("malformed command {0:?}")]
    Malformed(String),

    /// Input ended while work was still queued.
    #[error("unexpected end of input with {0} queued command(s)")]
    UnexpectedEof(usize),

    /// An object needed by a fetch is neither provided nor stored inline.
    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),

    /// Fetched bytes do not hash to the requested object.
    #[error("integrity check failed: expected {expected}, got {actual}")]
    Integrity {
        /// Requested object.
        expected: ObjectId,
        /// Hash of the received bytes.
        actual: ObjectId,
    },

    /// The remote handler failed.
    #[error(transparent)]
    Handler(Box<dyn std::error::Error + Send + Sync>),

    /// Local repository error.
    #[error("repository error: {0}")]
    Git(#[from] GitError),

    /// Object model or tracker error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Reading commands or writing replies failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Wraps an error returned by a [`ProtocolHandler`](crate::ProtocolHandler).
    pub fn handler<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Handler(Box::new(error))
    }
}
