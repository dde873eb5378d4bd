//! Repository access trait and the libgit2-backed implementation.

use crate::{GitError, Result};
use bytes::Bytes;
use git2::{BranchType, ErrorCode, Oid, Repository};
use parking_lot::Mutex;
use pfg_storage::{GitObject, ObjectId, ObjectType};
use std::path::{Path, PathBuf};

/// Read/write access to a local object graph and its refs.
pub trait ObjectRepository: Send + Sync {
    /// Resolves a ref (following symbolic refs) to the object it points at.
    ///
    /// Returns `Ok(None)` if the ref does not exist.
    fn resolve_ref(&self, name: &str) -> Result<Option<ObjectId>>;

    /// Lists local branches as `(full ref name, target)`, ordered by name.
    fn branches(&self) -> Result<Vec<(String, ObjectId)>>;

    /// Reads an object, or `Ok(None)` if it is not present.
    fn read_object(&self, id: &ObjectId) -> Result<Option<GitObject>>;

    /// Checks if an object exists.
    fn contains(&self, id: &ObjectId) -> Result<bool>;

    /// Writes an object and returns its ID.
    fn write_object(&self, object: &GitObject) -> Result<ObjectId>;
}

/// A git repository on disk, accessed through libgit2.
pub struct Git2Repository {
    path: PathBuf,
    repo: Mutex<Repository>,
}

impl Git2Repository {
    /// Opens the repository at `path` (a work tree or a git directory).
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let repo = Repository::open(path).map_err(|source| GitError::Open {
            path: path.display().to_string(),
            source,
        })?;
        tracing::debug!(path = %path.display(), bare = repo.is_bare(), "Opened repository");

        Ok(Self {
            path: repo.path().to_path_buf(),
            repo: Mutex::new(repo),
        })
    }

    /// Returns the git directory of the repository.
    pub fn git_dir(&self) -> &Path {
        &self.path
    }
}

impl std::fmt::Debug for Git2Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git2Repository")
            .field("path", &self.path)
            .finish()
    }
}

fn to_oid(id: &ObjectId) -> Result<Oid> {
    Ok(Oid::from_bytes(id.as_bytes())?)
}

fn from_oid(oid: Oid) -> Result<ObjectId> {
    Ok(ObjectId::from_slice(oid.as_bytes())?)
}

fn to_git2_kind(kind: ObjectType) -> git2::ObjectType {
    match kind {
        ObjectType::Blob => git2::ObjectType::Blob,
        ObjectType::Tree => git2::ObjectType::Tree,
        ObjectType::Commit => git2::ObjectType::Commit,
        ObjectType::Tag => git2::ObjectType::Tag,
    }
}

fn from_git2_kind(kind: git2::ObjectType, id: &ObjectId) -> Result<ObjectType> {
    match kind {
        git2::ObjectType::Blob => Ok(ObjectType::Blob),
        git2::ObjectType::Tree => Ok(ObjectType::Tree),
        git2::ObjectType::Commit => Ok(ObjectType::Commit),
        git2::ObjectType::Tag => Ok(ObjectType::Tag),
        git2::ObjectType::Any => Err(GitError::UnsupportedKind(id.to_hex())),
    }
}

impl ObjectRepository for Git2Repository {
    fn resolve_ref(&self, name: &str) -> Result<Option<ObjectId>> {
        let repo = self.repo.lock();
        match repo.refname_to_id(name) {
            Ok(oid) => Ok(Some(from_oid(oid)?)),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn branches(&self) -> Result<Vec<(String, ObjectId)>> {
        let repo = self.repo.lock();
        let mut out = Vec::new();
        for item in repo.branches(Some(BranchType::Local))? {
            let (branch, _) = item?;
            let reference = branch.get();
            let (Some(name), Some(target)) = (reference.name(), reference.target()) else {
                continue;
            };
            out.push((name.to_string(), from_oid(target)?));
        }
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }

    fn read_object(&self, id: &ObjectId) -> Result<Option<GitObject>> {
        let repo = self.repo.lock();
        let odb = repo.odb()?;
        let object = match odb.read(to_oid(id)?) {
            Ok(object) => object,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let kind = from_git2_kind(object.kind(), id)?;
        Ok(Some(GitObject::new(kind, Bytes::copy_from_slice(object.data()))))
    }

    fn contains(&self, id: &ObjectId) -> Result<bool> {
        let repo = self.repo.lock();
        let odb = repo.odb()?;
        Ok(odb.exists(to_oid(id)?))
    }

    fn write_object(&self, object: &GitObject) -> Result<ObjectId> {
        let repo = self.repo.lock();
        let odb = repo.odb()?;
        let oid = odb.write(to_git2_kind(object.object_type), &object.data)?;
        from_oid(oid)
    }
}
