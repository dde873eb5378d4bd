//! Local git repository access for the Peerforge remote helper.
//!
//! The remote helper reads objects and refs from the repository git invoked
//! it for, and writes fetched objects back into it. Both operations go
//! through [`ObjectRepository`], implemented on top of libgit2 for real
//! repositories and in memory for tests.

mod error;
mod memory;
mod repository;

pub use error::GitError;
pub use memory::MemoryRepository;
pub use repository::{Git2Repository, ObjectRepository};

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, GitError>;
