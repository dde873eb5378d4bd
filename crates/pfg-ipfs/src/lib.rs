//! Content store adapter for the Peerforge remote helper.
//!
//! The remote lives in a content-addressed store as a tree of named links.
//! [`ContentStore`] is the narrow contract the remote handler needs from it;
//! [`HttpStore`] talks to an IPFS node over its RPC API and [`MemoryStore`]
//! keeps the same structure in memory.

mod error;
mod http;
mod memory;
mod store;

pub use error::StoreError;
pub use http::HttpStore;
pub use memory::MemoryStore;
pub use store::{store_path, ContentStore, Link, NodeKind, EMPTY_DIR};

/// Result type for content store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
