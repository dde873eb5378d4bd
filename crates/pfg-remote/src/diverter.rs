//! Large-object diversion.
//!
//! Objects whose serialized form exceeds [`LARGE_OBJECT_THRESHOLD`] are not
//! stored as inline graph blocks. They are added as plain files, recorded in
//! the tracker under `//lobj/<hash>`, and linked into the remote tree at
//! `objects/<2 hex>/<38 hex>`.

use crate::remote::OBJECTS_DIR;
use crate::Result;
use cid::Cid;
use pfg_ipfs::ContentStore;
use pfg_storage::{lobj_key, ObjectId, Tracker};

/// Largest serialized object, in bytes, that is still stored inline.
pub const LARGE_OBJECT_THRESHOLD: usize = 1 << 21;

/// Returns the path of a diverted object below the remote root.
pub fn large_object_path(id: &ObjectId) -> String {
    let (dir, rest) = id.fan_out();
    format!("{}/{}/{}", OBJECTS_DIR, dir, rest)
}

/// Result of diverting one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diversion {
    /// Remote root after linking the object.
    pub root: Cid,
    /// Identifier of the stored file.
    pub block: Cid,
}

/// Moves oversized objects out of the inline graph.
pub struct Diverter<'a> {
    store: &'a dyn ContentStore,
    tracker: &'a dyn Tracker,
}

impl<'a> Diverter<'a> {
    /// Creates a diverter writing to `store` and recording into `tracker`.
    pub fn new(store: &'a dyn ContentStore, tracker: &'a dyn Tracker) -> Self {
        Self { store, tracker }
    }

    /// Returns true if an object of `len` serialized bytes must be diverted.
    pub fn should_divert(len: usize) -> bool {
        len > LARGE_OBJECT_THRESHOLD
    }

    /// Diverts the object if it is too large to inline.
    ///
    /// Returns `Ok(None)` and touches nothing for objects at or below the
    /// threshold. The returned root replaces `root`.
    pub fn divert(&self, root: &Cid, id: &ObjectId, serialized: &[u8]) -> Result<Option<Diversion>> {
        if !Self::should_divert(serialized.len()) {
            return Ok(None);
        }

        let block = self.store.add(serialized)?;
        self.tracker
            .set(&lobj_key(id), block.to_string().as_bytes())?;
        let root = self
            .store
            .patch_link(root, &large_object_path(id), &block, true)?;

        tracing::debug!(
            id = %id,
            size = serialized.len(),
            block = %block,
            "Diverted large object"
        );
        Ok(Some(Diversion { root, block }))
    }
}
