//! Tracker: local record of pushed refs and diverted large objects.
//!
//! Keys are either ref names (`refs/heads/main`) holding the raw bytes of the
//! last pushed or fetched object hash, or `//lobj/<hex>` holding the content
//! identifier string of a diverted large object. Writes overwrite, nothing
//! is ever deleted.

use crate::{ObjectId, Result};
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Key prefix reserved for the large-object index.
pub const LOBJ_PREFIX: &str = "//lobj/";

/// Returns the tracker key of a large object.
pub fn lobj_key(id: &ObjectId) -> String {
    format!("{}{}", LOBJ_PREFIX, id)
}

/// Append/overwrite key-value store with prefix scans.
pub trait Tracker: Send + Sync {
    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Reads the value stored under `key`.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Lists every entry whose key starts with `prefix`, ordered by key.
    fn list_prefixed(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>>;

    /// Records the object a ref points to.
    fn set_ref(&self, name: &str, id: &ObjectId) -> Result<()> {
        self.set(name, id.as_bytes())
    }

    /// Reads the object a ref was last recorded at.
    fn get_ref(&self, name: &str) -> Result<Option<ObjectId>> {
        match self.get(name)? {
            Some(bytes) => Ok(Some(ObjectId::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

/// In-memory tracker, used in tests and when no persistent backend is built.
#[derive(Debug, Default)]
pub struct MemoryTracker {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Tracker for MemoryTracker {
    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entries.write().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn list_prefixed(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        Ok(self
            .entries
            .read()
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }
}
