//! Repository error types.

use thiserror::Error;

/// Errors that can occur while reading or writing the local repository.
#[derive(Debug, Error)]
pub enum GitError {
    /// The repository could not be opened.
    #[error("cannot open repository at {path}: {source}")]
    Open {
        /// Path that was tried.
        path: String,
        /// Underlying libgit2 error.
        #[source]
        source: git2::Error,
    },

    /// Object kind the remote cannot represent.
    #[error("unsupported object kind for {0}")]
    UnsupportedKind(String),

    /// libgit2 error.
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(#[from] pfg_storage::StorageError),
}
