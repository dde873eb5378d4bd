//! In-memory repository.

use crate::{ObjectRepository, Result};
use parking_lot::RwLock;
use pfg_storage::{GitObject, ObjectId};
use std::collections::{BTreeMap, HashMap};

/// Repository kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    objects: RwLock<HashMap<ObjectId, GitObject>>,
    refs: RwLock<BTreeMap<String, ObjectId>>,
}

impl MemoryRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores an object and returns its ID.
    pub fn insert(&self, object: GitObject) -> ObjectId {
        let id = object.id;
        self.objects.write().insert(id, object);
        id
    }

    /// Points a ref at an object.
    pub fn set_ref(&self, name: &str, target: ObjectId) {
        self.refs.write().insert(name.to_string(), target);
    }

    /// Returns the number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    /// Returns true if no objects are stored.
    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

impl ObjectRepository for MemoryRepository {
    fn resolve_ref(&self, name: &str) -> Result<Option<ObjectId>> {
        Ok(self.refs.read().get(name).copied())
    }

    fn branches(&self) -> Result<Vec<(String, ObjectId)>> {
        Ok(self
            .refs
            .read()
            .iter()
            .filter(|(name, _)| name.starts_with("refs/heads/"))
            .map(|(name, id)| (name.clone(), *id))
            .collect())
    }

    fn read_object(&self, id: &ObjectId) -> Result<Option<GitObject>> {
        Ok(self.objects.read().get(id).cloned())
    }

    fn contains(&self, id: &ObjectId) -> Result<bool> {
        Ok(self.objects.read().contains_key(id))
    }

    fn write_object(&self, object: &GitObject) -> Result<ObjectId> {
        Ok(self.insert(object.clone()))
    }
}
