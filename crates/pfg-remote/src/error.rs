//! Remote handler error types.

use pfg_consensus::AuditError;
use pfg_git::GitError;
use pfg_ipfs::StoreError;
use pfg_storage::{ObjectId, StorageError};
use thiserror::Error;

/// Errors that can occur while serving a Peerforge remote.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The local ref being pushed does not exist.
    #[error("ref not found: {0}")]
    RefNotFound(String),

    /// An object reachable from a pushed ref is missing locally.
    #[error("object {0} missing from local repository")]
    MissingObject(ObjectId),

    /// Stored or fetched data does not match its identifier.
    #[error("integrity check failed for {object}: expected {expected}, got {actual}")]
    Integrity {
        /// Object being stored or fetched.
        object: ObjectId,
        /// Identifier derived from the object hash.
        expected: String,
        /// Identifier reported by the store or derived from the data.
        actual: String,
    },

    /// A large object listed in the index has no data in the store.
    #[error("large object {id} has no data at {cid}")]
    MissingLargeObject {
        /// Object hash.
        id: ObjectId,
        /// Identifier of the stored file.
        cid: String,
    },

    /// The remote tree does not have the expected shape.
    #[error("invalid remote layout: {0}")]
    InvalidLayout(String),

    /// The handler was used before the session initialized it.
    #[error("remote handler not initialized")]
    NotInitialized,

    /// Recording the audit event failed. The pushed data is not rolled back.
    #[error("audit event failed: {0}")]
    Audit(#[from] AuditError),

    /// Content store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Local repository error.
    #[error("repository error: {0}")]
    Git(#[from] GitError),

    /// Object model or tracker error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Malformed content identifier.
    #[error("invalid cid: {0}")]
    Cid(#[from] cid::Error),
}
