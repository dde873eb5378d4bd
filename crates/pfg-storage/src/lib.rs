//! Object model and local bookkeeping for the Peerforge remote helper.
//!
//! This crate provides the git object types exchanged with the content
//! store, the translation between git object hashes and content identifiers,
//! and the tracker that remembers pushed refs and diverted large objects.

mod content_id;
mod error;
mod object;
#[cfg(feature = "rocksdb-backend")]
mod rocksdb;
mod tracker;

pub use content_id::{cid_from_object_id, object_id_from_cid, GIT_RAW_CODEC, SHA1_CODE};
pub use error::StorageError;
pub use object::{GitObject, ObjectId, ObjectType, TreeEntry};
#[cfg(feature = "rocksdb-backend")]
pub use self::rocksdb::RocksDbTracker;
pub use tracker::{lobj_key, MemoryTracker, Tracker, LOBJ_PREFIX};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
