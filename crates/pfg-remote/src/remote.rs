//! The Peerforge protocol handler.

use crate::diverter::large_object_path;
use crate::push::push_graph;
use crate::{RemoteError, Result};
use bytes::Bytes;
use cid::Cid;
use pfg_consensus::{AuditSink, Event};
use pfg_ipfs::{store_path, ContentStore, NodeKind};
use pfg_protocol::{ListEntry, ProtocolHandler, Session};
use pfg_storage::{cid_from_object_id, lobj_key, object_id_from_cid, ObjectId, LOBJ_PREFIX};
use std::collections::HashMap;
use std::sync::Arc;

/// Directory holding diverted large objects.
pub const OBJECTS_DIR: &str = "objects";

/// Name of the file holding the remote's default ref.
const HEAD: &str = "HEAD";

/// Default ref written to `HEAD` by the first push.
pub const DEFAULT_HEAD_REF: &str = "refs/heads/main";

/// Serves one git remote-helper session against a Peerforge remote.
pub struct PeerforgeRemote {
    store: Arc<dyn ContentStore>,
    audit: Arc<dyn AuditSink>,
    root: Cid,
    session: Option<Session>,
    large_objects: Option<HashMap<ObjectId, Cid>>,
    pushed: bool,
}

impl PeerforgeRemote {
    /// Creates a handler for the remote rooted at `root`.
    pub fn new(store: Arc<dyn ContentStore>, audit: Arc<dyn AuditSink>, root: Cid) -> Self {
        Self {
            store,
            audit,
            root,
            session: None,
            large_objects: None,
            pushed: false,
        }
    }

    /// Returns the current remote root.
    pub fn root(&self) -> &Cid {
        &self.root
    }

    /// Returns true once a push has run in this session.
    pub fn pushed(&self) -> bool {
        self.pushed
    }

    fn session(&self) -> Result<Session> {
        self.session.clone().ok_or(RemoteError::NotInitialized)
    }

    fn path(&self, relative: &str) -> String {
        store_path(&self.root, relative)
    }

    /// Reads the value of a file-typed ref, `Ok(None)` if it does not exist.
    fn read_ref(&self, name: &str) -> Result<Option<String>> {
        Ok(self
            .store
            .read_bytes(&self.path(name))?
            .map(|bytes| String::from_utf8_lossy(&bytes).trim().to_string()))
    }

    /// Collects every ref below `prefix`, skipping the large-object tree.
    fn walk_refs(&self, prefix: &str, out: &mut Vec<ListEntry>) -> Result<()> {
        let Some(links) = self.store.list(&self.path(prefix))? else {
            return Ok(());
        };

        for link in links {
            if prefix.is_empty() && link.name == OBJECTS_DIR {
                continue;
            }
            let name = if prefix.is_empty() {
                link.name.clone()
            } else {
                format!("{}/{}", prefix, link.name)
            };

            match link.kind {
                NodeKind::Directory => self.walk_refs(&name, out)?,
                NodeKind::File => {
                    if let Some(value) = self.read_ref(&name)? {
                        out.push(ListEntry::from_value(&value, name));
                    }
                }
                NodeKind::Unknown => {
                    out.push(ListEntry::object(object_id_from_cid(&link.cid)?, name));
                }
            }
        }
        Ok(())
    }

    fn list_for_push(&self) -> Result<Vec<ListEntry>> {
        let session = self.session()?;
        let mut out = Vec::new();
        for (name, _) in session.repo.branches()? {
            let remote = match self.store.resolve(&self.path(&name))? {
                Some(cid) => object_id_from_cid(&cid)?,
                None => ObjectId::ZERO,
            };
            out.push(ListEntry::object(remote, name));
        }
        Ok(out)
    }

    /// Builds the large-object index from the remote's `objects/` tree.
    fn load_object_map(&mut self) -> Result<&mut HashMap<ObjectId, Cid>> {
        if self.large_objects.is_none() {
            let mut map = HashMap::new();
            if let Some(dirs) = self.store.list(&self.path(OBJECTS_DIR))? {
                for dir in dirs {
                    if dir.kind != NodeKind::Directory {
                        return Err(RemoteError::InvalidLayout(format!(
                            "{}/{} is not a directory",
                            OBJECTS_DIR, dir.name
                        )));
                    }
                    let path = format!("{}/{}", OBJECTS_DIR, dir.name);
                    for entry in self.store.list(&self.path(&path))?.unwrap_or_default() {
                        let id = ObjectId::from_hex(&format!("{}{}", dir.name, entry.name))
                            .map_err(|_| {
                                RemoteError::InvalidLayout(format!("{}/{}", path, entry.name))
                            })?;
                        map.insert(id, entry.cid);
                    }
                }
            }
            tracing::debug!(count = map.len(), "Loaded large object index");
            self.large_objects = Some(map);
        }

        Ok(self.large_objects.get_or_insert_with(HashMap::new))
    }

    /// Links tracked large objects the remote tree does not know about yet.
    fn fill_missing_large_objects(&mut self) -> Result<()> {
        let session = self.session()?;
        let tracked = session.tracker.list_prefixed(LOBJ_PREFIX)?;
        let known = self.load_object_map()?.clone();

        let mut root = self.root;
        let mut added = Vec::new();
        for (key, value) in tracked {
            let id = ObjectId::from_hex(key.trim_start_matches(LOBJ_PREFIX))?;
            if known.contains_key(&id) {
                continue;
            }
            let text = String::from_utf8_lossy(&value);
            let block = Cid::try_from(text.trim())?;
            root = self
                .store
                .patch_link(&root, &large_object_path(&id), &block, true)?;
            added.push((id, block));
        }

        if !added.is_empty() {
            tracing::debug!(count = added.len(), "Linked tracked large objects");
        }
        self.root = root;
        self.load_object_map()?.extend(added);
        Ok(())
    }
}

impl std::fmt::Debug for PeerforgeRemote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerforgeRemote")
            .field("root", &self.root)
            .field("pushed", &self.pushed)
            .finish_non_exhaustive()
    }
}

impl ProtocolHandler for PeerforgeRemote {
    type Error = RemoteError;

    fn initialize(&mut self, session: &Session) -> Result<()> {
        tracing::debug!(root = %self.root, "Initialized remote");
        self.session = Some(session.clone());
        Ok(())
    }

    fn list(&mut self, for_push: bool) -> Result<Vec<ListEntry>> {
        if for_push {
            return self.list_for_push();
        }
        let mut out = Vec::new();
        self.walk_refs("", &mut out)?;
        Ok(out)
    }

    fn push(&mut self, local: &str, remote: &str) -> Result<String> {
        let session = self.session()?;
        self.pushed = true;

        let head = session
            .repo
            .resolve_ref(local)?
            .ok_or_else(|| RemoteError::RefNotFound(local.to_string()))?;
        tracing::info!(%local, %remote, head = %head, "Pushing");

        let outcome = push_graph(
            self.store.as_ref(),
            session.repo.as_ref(),
            session.tracker.as_ref(),
            self.root,
            &head,
        )?;
        self.root = outcome.root;
        if let Some(index) = self.large_objects.as_mut() {
            index.extend(outcome.diverted.iter().copied());
        }

        session.tracker.set_ref(remote, &head)?;

        let head_cid = cid_from_object_id(&head)?;
        self.root = self.store.patch_link(&self.root, remote, &head_cid, true)?;

        if self.read_ref(HEAD)?.is_none() {
            let default = self.store.add(DEFAULT_HEAD_REF.as_bytes())?;
            self.root = self.store.patch_link(&self.root, HEAD, &default, true)?;
            tracing::info!(root = %self.root, "Initialized repository");

            // The remote tree is already updated at this point; a failed
            // audit fails the push without reverting it.
            self.audit.record(&Event::repository_initialized())?;
        }

        Ok(remote.to_string())
    }

    fn provide_block(&mut self, id: &ObjectId) -> Result<Option<Bytes>> {
        let Some(block) = self.load_object_map()?.get(id).copied() else {
            return Ok(None);
        };
        let session = self.session()?;
        session
            .tracker
            .set(&lobj_key(id), block.to_string().as_bytes())?;

        let data = self
            .store
            .read_bytes(&block.to_string())?
            .ok_or_else(|| RemoteError::MissingLargeObject {
                id: *id,
                cid: block.to_string(),
            })?;

        let expected = cid_from_object_id(id)?;
        let actual = cid_from_object_id(&ObjectId::digest(&data))?;
        if actual != expected {
            return Err(RemoteError::Integrity {
                object: *id,
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
        Ok(Some(data))
    }

    fn read_block(&mut self, id: &ObjectId) -> Result<Option<Bytes>> {
        Ok(self.store.get_block(&cid_from_object_id(id)?)?)
    }

    fn finish(&mut self) -> Result<()> {
        if !self.pushed {
            return Ok(());
        }
        self.fill_missing_large_objects()?;
        tracing::info!("Pushed to IPFS as pfg://{}", self.root);
        Ok(())
    }
}
