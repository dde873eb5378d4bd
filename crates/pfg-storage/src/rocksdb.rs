//! RocksDB persistent tracker backend.
//!
//! Keeps the tracker under the repository's git directory so ref and
//! large-object records survive across helper invocations.

use crate::{Result, StorageError, Tracker};
use rocksdb::{Direction, IteratorMode, Options, DB};
use std::path::Path;

/// Tracker stored in a RocksDB database.
pub struct RocksDbTracker {
    db: DB,
}

impl RocksDbTracker {
    /// Opens or creates the tracker database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);

        let db = DB::open(&opts, path.as_ref()).map_err(backend)?;
        tracing::debug!(path = %path.as_ref().display(), "Opened tracker");
        Ok(Self { db })
    }
}

impl std::fmt::Debug for RocksDbTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RocksDbTracker")
            .field("path", &self.db.path())
            .finish()
    }
}

impl Tracker for RocksDbTracker {
    fn set(&self, key: &str, value: &[u8]) -> Result<()> {
        self.db.put(key.as_bytes(), value).map_err(backend)
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.db.get(key.as_bytes()).map_err(backend)
    }

    fn list_prefixed(&self, prefix: &str) -> Result<Vec<(String, Vec<u8>)>> {
        let mode = IteratorMode::From(prefix.as_bytes(), Direction::Forward);
        let mut out = Vec::new();
        for item in self.db.iterator(mode) {
            let (key, value) = item.map_err(backend)?;
            if !key.starts_with(prefix.as_bytes()) {
                break;
            }
            let key = String::from_utf8(key.into_vec())
                .map_err(|e| StorageError::Backend(format!("non-utf8 tracker key: {}", e)))?;
            out.push((key, value.into_vec()));
        }
        Ok(out)
    }
}

fn backend(e: rocksdb::Error) -> StorageError {
    StorageError::Backend(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lobj_key, ObjectId, LOBJ_PREFIX};
    use tempfile::TempDir;

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let id = ObjectId::from_bytes([5u8; 20]);

        {
            let tracker = RocksDbTracker::open(dir.path()).unwrap();
            tracker.set_ref("refs/heads/main", &id).unwrap();
        }

        let tracker = RocksDbTracker::open(dir.path()).unwrap();
        assert_eq!(tracker.get_ref("refs/heads/main").unwrap(), Some(id));
    }

    #[test]
    fn test_prefix_scan_stops_at_prefix_end() {
        let dir = TempDir::new().unwrap();
        let tracker = RocksDbTracker::open(dir.path()).unwrap();
        let id = ObjectId::from_bytes([6u8; 20]);

        tracker.set(&lobj_key(&id), b"bafk").unwrap();
        tracker.set("refs/heads/main", id.as_bytes()).unwrap();

        let listed = tracker.list_prefixed(LOBJ_PREFIX).unwrap();
        assert_eq!(listed, vec![(lobj_key(&id), b"bafk".to_vec())]);
    }
}
