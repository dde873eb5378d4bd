//! Content store contract.

use crate::{Result, StoreError};
use bytes::Bytes;
use cid::Cid;

/// CID of the empty unixfs directory, the root of a fresh remote.
pub const EMPTY_DIR: &str = "QmUNLLsPACCz1vLxQVkXqqLX5R1X345qqfHbsf67hvA3Nn";

/// Kind of node a link points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A directory: a nested namespace of further links.
    Directory,
    /// A file: opaque bytes readable with [`ContentStore::read_bytes`].
    File,
    /// Raw or non-unixfs data, such as an inline git object.
    Unknown,
}

impl NodeKind {
    /// Maps the numeric link type reported by the IPFS `ls` command.
    pub fn from_unixfs_type(code: i32) -> Result<Self> {
        match code {
            // Directory and HAMT-sharded directory.
            1 | 5 => Ok(Self::Directory),
            2 => Ok(Self::File),
            -1 | 0 => Ok(Self::Unknown),
            other => Err(StoreError::UnexpectedLinkType(other)),
        }
    }
}

/// A named child of a directory node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Link name inside its parent.
    pub name: String,
    /// Identifier of the child.
    pub cid: Cid,
    /// Kind of the child node.
    pub kind: NodeKind,
}

/// Joins a root identifier and a relative path into a store path.
pub fn store_path(root: &Cid, relative: &str) -> String {
    let relative = relative.trim_matches('/');
    if relative.is_empty() {
        root.to_string()
    } else {
        format!("{}/{}", root, relative)
    }
}

/// The operations the remote handler needs from a content-addressed store.
///
/// Paths are `<root-cid>/<name>/<name>...`. Lookups distinguish a missing
/// path (`Ok(None)`) from a failure (`Err`).
pub trait ContentStore: Send + Sync {
    /// Stores `data` as a single block, decoded with `input_codec` and
    /// encoded with `store_codec`.
    fn put(&self, data: &[u8], input_codec: &str, store_codec: &str) -> Result<Cid>;

    /// Stores `data` as a file.
    fn add(&self, data: &[u8]) -> Result<Cid>;

    /// Links `child` at `path` below `root` and returns the new root.
    ///
    /// With `create`, missing intermediate directories are created.
    fn patch_link(&self, root: &Cid, path: &str, child: &Cid, create: bool) -> Result<Cid>;

    /// Lists the children of the directory at `path`.
    fn list(&self, path: &str) -> Result<Option<Vec<Link>>>;

    /// Reads the file at `path`.
    fn read_bytes(&self, path: &str) -> Result<Option<Bytes>>;

    /// Resolves `path` to the identifier it names.
    fn resolve(&self, path: &str) -> Result<Option<Cid>>;

    /// Reads a raw block by identifier.
    fn get_block(&self, cid: &Cid) -> Result<Option<Bytes>>;
}

/// Splits a store path into its root identifier and the remaining segments.
pub(crate) fn split_path(path: &str) -> Result<(Cid, Vec<&str>)> {
    let trimmed = path.trim_start_matches("/ipfs/").trim_matches('/');
    let mut segments = trimmed.split('/').filter(|s| !s.is_empty());
    let root = segments
        .next()
        .ok_or_else(|| StoreError::InvalidPath(path.to_string()))?;
    let root = Cid::try_from(root)?;
    Ok((root, segments.collect()))
}
