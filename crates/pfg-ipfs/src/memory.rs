//! In-memory content store.
//!
//! Mirrors the structure an IPFS node keeps for a remote: immutable nodes
//! addressed by CID, directories as sorted link maps. Patching a link
//! rewrites every directory on the path and yields a new root.

use crate::store::split_path;
use crate::{ContentStore, Link, NodeKind, Result, StoreError, EMPTY_DIR};
use bytes::Bytes;
use cid::multihash::Multihash;
use cid::Cid;
use parking_lot::RwLock;
use pfg_storage::{GIT_RAW_CODEC, SHA1_CODE};
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};

const RAW_CODEC: u64 = 0x55;
const DAG_PB_CODEC: u64 = 0x70;
const SHA2_256_CODE: u64 = 0x12;

#[derive(Debug, Clone)]
enum Node {
    Directory(BTreeMap<String, Cid>),
    File(Bytes),
    Block(Bytes),
}

impl Node {
    fn kind(&self) -> NodeKind {
        match self {
            Node::Directory(_) => NodeKind::Directory,
            Node::File(_) => NodeKind::File,
            Node::Block(_) => NodeKind::Unknown,
        }
    }
}

/// Content store kept entirely in memory.
#[derive(Debug)]
pub struct MemoryStore {
    nodes: RwLock<HashMap<Cid, Node>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates a store holding only the empty directory.
    pub fn new() -> Self {
        let mut nodes = HashMap::new();
        if let Ok(empty) = Cid::try_from(EMPTY_DIR) {
            nodes.insert(empty, Node::Directory(BTreeMap::new()));
        }
        Self {
            nodes: RwLock::new(nodes),
        }
    }

    /// Returns the identifier of the empty directory every remote starts from.
    pub fn empty_root() -> Result<Cid> {
        Ok(Cid::try_from(EMPTY_DIR)?)
    }

    /// Returns the number of stored nodes.
    pub fn len(&self) -> usize {
        self.nodes.read().len()
    }

    /// Returns true if nothing but the empty directory is stored.
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    fn cid_for(codec: u64, data: &[u8]) -> Result<Cid> {
        let digest = Sha256::digest(data);
        let hash = Multihash::<64>::wrap(SHA2_256_CODE, &digest)
            .map_err(|e| StoreError::Decode(e.to_string()))?;
        Ok(Cid::new_v1(codec, hash))
    }

    fn insert_directory(
        nodes: &mut HashMap<Cid, Node>,
        entries: BTreeMap<String, Cid>,
    ) -> Result<Cid> {
        let mut encoded = Vec::new();
        for (name, cid) in &entries {
            encoded.extend_from_slice(name.as_bytes());
            encoded.push(0);
            encoded.extend_from_slice(&cid.to_bytes());
        }
        let cid = Self::cid_for(DAG_PB_CODEC, &encoded)?;
        nodes.insert(cid, Node::Directory(entries));
        Ok(cid)
    }

    fn walk(nodes: &HashMap<Cid, Node>, path: &str) -> Result<Option<Cid>> {
        let (mut current, segments) = split_path(path)?;
        if !nodes.contains_key(&current) {
            return Ok(None);
        }
        for segment in segments {
            match nodes.get(&current) {
                Some(Node::Directory(entries)) => match entries.get(segment) {
                    Some(next) => current = *next,
                    None => return Ok(None),
                },
                Some(_) => return Err(StoreError::NotDirectory(path.to_string())),
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    fn patch(
        nodes: &mut HashMap<Cid, Node>,
        dir: &Cid,
        segments: &[&str],
        child: Cid,
        create: bool,
    ) -> Result<Cid> {
        let mut entries = match nodes.get(dir) {
            Some(Node::Directory(entries)) => entries.clone(),
            Some(_) => return Err(StoreError::NotDirectory(dir.to_string())),
            None => return Err(StoreError::MissingLink(dir.to_string())),
        };
        let Some((first, rest)) = segments.split_first() else {
            return Err(StoreError::InvalidPath(dir.to_string()));
        };

        let replacement = if rest.is_empty() {
            child
        } else {
            let sub = match entries.get(*first) {
                Some(sub) => *sub,
                None if create => Self::insert_directory(nodes, BTreeMap::new())?,
                None => return Err(StoreError::MissingLink(first.to_string())),
            };
            Self::patch(nodes, &sub, rest, child, create)?
        };

        entries.insert(first.to_string(), replacement);
        Self::insert_directory(nodes, entries)
    }
}

impl ContentStore for MemoryStore {
    fn put(&self, data: &[u8], input_codec: &str, store_codec: &str) -> Result<Cid> {
        if input_codec != "raw" {
            return Err(StoreError::Unsupported(format!("input codec {}", input_codec)));
        }
        let cid = match store_codec {
            "git-raw" => {
                let digest = Sha1::digest(data);
                let hash = Multihash::<64>::wrap(SHA1_CODE, &digest)
                    .map_err(|e| StoreError::Decode(e.to_string()))?;
                Cid::new_v1(GIT_RAW_CODEC, hash)
            }
            "raw" => Self::cid_for(RAW_CODEC, data)?,
            other => return Err(StoreError::Unsupported(format!("store codec {}", other))),
        };
        self.nodes
            .write()
            .insert(cid, Node::Block(Bytes::copy_from_slice(data)));
        Ok(cid)
    }

    fn add(&self, data: &[u8]) -> Result<Cid> {
        let cid = Self::cid_for(RAW_CODEC, data)?;
        self.nodes
            .write()
            .insert(cid, Node::File(Bytes::copy_from_slice(data)));
        Ok(cid)
    }

    fn patch_link(&self, root: &Cid, path: &str, child: &Cid, create: bool) -> Result<Cid> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut nodes = self.nodes.write();
        Self::patch(&mut nodes, root, &segments, *child, create)
    }

    fn list(&self, path: &str) -> Result<Option<Vec<Link>>> {
        let nodes = self.nodes.read();
        let Some(cid) = Self::walk(&nodes, path)? else {
            return Ok(None);
        };
        match nodes.get(&cid) {
            Some(Node::Directory(entries)) => Ok(Some(
                entries
                    .iter()
                    .map(|(name, cid)| Link {
                        name: name.clone(),
                        cid: *cid,
                        kind: nodes.get(cid).map_or(NodeKind::Unknown, Node::kind),
                    })
                    .collect(),
            )),
            _ => Err(StoreError::NotDirectory(path.to_string())),
        }
    }

    fn read_bytes(&self, path: &str) -> Result<Option<Bytes>> {
        let nodes = self.nodes.read();
        let Some(cid) = Self::walk(&nodes, path)? else {
            return Ok(None);
        };
        match nodes.get(&cid) {
            Some(Node::File(data)) => Ok(Some(data.clone())),
            _ => Err(StoreError::NotFile(path.to_string())),
        }
    }

    fn resolve(&self, path: &str) -> Result<Option<Cid>> {
        Self::walk(&self.nodes.read(), path)
    }

    fn get_block(&self, cid: &Cid) -> Result<Option<Bytes>> {
        match self.nodes.read().get(cid) {
            Some(Node::Block(data)) | Some(Node::File(data)) => Ok(Some(data.clone())),
            Some(Node::Directory(_)) => Err(StoreError::NotFile(cid.to_string())),
            None => Ok(None),
        }
    }
}
