//! Git object types and utilities.

use crate::{Result, StorageError};
use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha1::{Digest, Sha1};
use std::fmt;
use std::str::FromStr;

/// Mode git uses for submodule commits inside trees.
const GITLINK_MODE: &str = "160000";
/// Mode git uses for subdirectories inside trees.
const TREE_MODE: &str = "40000";

/// A 20-byte SHA-1 object identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; 20]);

impl Serialize for ObjectId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ObjectId::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl ObjectId {
    /// The all-zero id git uses for "no object" (ref creation or deletion).
    pub const ZERO: ObjectId = ObjectId([0u8; 20]);

    /// Creates an ObjectId from raw bytes.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Creates an ObjectId from a byte slice, which must be exactly 20 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let arr: [u8; 20] = bytes.try_into().map_err(|_| {
            StorageError::InvalidObject(format!("invalid object id length: {}", bytes.len()))
        })?;
        Ok(Self(arr))
    }

    /// Creates an ObjectId from a hex string.
    pub fn from_hex(hex: &str) -> Result<Self> {
        if hex.len() != 40 {
            return Err(StorageError::InvalidObject(format!(
                "invalid object id length: {}",
                hex.len()
            )));
        }
        let mut bytes = [0u8; 20];
        hex::decode_to_slice(hex, &mut bytes)
            .map_err(|e| StorageError::InvalidObject(e.to_string()))?;
        Ok(Self(bytes))
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Returns the hex representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Returns true for the all-zero sentinel.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Hashes an already serialized object (`"<type> <len>\0" + body`).
    pub fn digest(serialized: &[u8]) -> Self {
        let result = Sha1::digest(serialized);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&result);
        Self(bytes)
    }

    /// Computes the SHA-1 hash of data with a git object header.
    pub fn hash_object(object_type: ObjectType, data: &[u8]) -> Self {
        let header = format!("{} {}\0", object_type.as_str(), data.len());
        let mut hasher = Sha1::new();
        hasher.update(header.as_bytes());
        hasher.update(data);
        let result = hasher.finalize();
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&result);
        Self(bytes)
    }

    /// Splits the hex form into the two-character fan-out directory and the rest.
    pub fn fan_out(&self) -> (String, String) {
        let hex = self.to_hex();
        let (dir, rest) = hex.split_at(2);
        (dir.to_string(), rest.to_string())
    }
}

impl FromStr for ObjectId {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Git object types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    /// File content.
    Blob,
    /// Directory listing.
    Tree,
    /// Commit object.
    Commit,
    /// Annotated tag.
    Tag,
}

impl ObjectType {
    /// Returns the string representation used in git.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
            Self::Tag => "tag",
        }
    }

    /// Parses an object type from a string.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "blob" => Ok(Self::Blob),
            "tree" => Ok(Self::Tree),
            "commit" => Ok(Self::Commit),
            "tag" => Ok(Self::Tag),
            _ => Err(StorageError::InvalidObject(format!(
                "unknown object type: {}",
                s
            ))),
        }
    }
}

/// One entry of a tree object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Octal file mode as git writes it (`100644`, `40000`, ...).
    pub mode: String,
    /// Entry name.
    pub name: String,
    /// Referenced object.
    pub id: ObjectId,
}

impl TreeEntry {
    /// Creates a tree entry.
    pub fn new(mode: impl Into<String>, name: impl Into<String>, id: ObjectId) -> Self {
        Self {
            mode: mode.into(),
            name: name.into(),
            id,
        }
    }

    fn sort_key(&self) -> Vec<u8> {
        let mut key = self.name.as_bytes().to_vec();
        if self.mode == TREE_MODE {
            key.push(b'/');
        }
        key
    }
}

/// A git object (blob, tree, commit, or tag).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitObject {
    /// The object's unique identifier (SHA-1 hash).
    pub id: ObjectId,
    /// The type of object.
    pub object_type: ObjectType,
    /// The raw object body, without the loose-object header.
    pub data: Bytes,
}

impl GitObject {
    /// Creates a new git object, computing its ID from the data.
    pub fn new(object_type: ObjectType, data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let id = ObjectId::hash_object(object_type, &data);
        Self {
            id,
            object_type,
            data,
        }
    }

    /// Creates a blob object from file content.
    pub fn blob(content: impl Into<Bytes>) -> Self {
        Self::new(ObjectType::Blob, content)
    }

    /// Creates a tree object, ordering entries the way git does.
    pub fn tree(mut entries: Vec<TreeEntry>) -> Self {
        entries.sort_by_key(TreeEntry::sort_key);
        let mut data = Vec::new();
        for entry in &entries {
            data.extend_from_slice(entry.mode.as_bytes());
            data.push(b' ');
            data.extend_from_slice(entry.name.as_bytes());
            data.push(0);
            data.extend_from_slice(entry.id.as_bytes());
        }
        Self::new(ObjectType::Tree, data)
    }

    /// Creates a commit object.
    pub fn commit(
        tree_id: &ObjectId,
        parents: &[ObjectId],
        author: &str,
        committer: &str,
        message: &str,
    ) -> Self {
        let mut content = format!("tree {}\n", tree_id);
        for parent in parents {
            content.push_str(&format!("parent {}\n", parent));
        }
        content.push_str(&format!("author {}\n", author));
        content.push_str(&format!("committer {}\n", committer));
        content.push_str(&format!("\n{}", message));
        Self::new(ObjectType::Commit, content.into_bytes())
    }

    /// Returns the size of the object body.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Serializes to the loose-object form the object hash is computed over.
    pub fn serialize(&self) -> Bytes {
        let header = format!("{} {}\0", self.object_type.as_str(), self.data.len());
        let mut out = Vec::with_capacity(header.len() + self.data.len());
        out.extend_from_slice(header.as_bytes());
        out.extend_from_slice(&self.data);
        Bytes::from(out)
    }

    /// Parses the loose-object form produced by [`GitObject::serialize`].
    pub fn parse_serialized(serialized: &[u8]) -> Result<Self> {
        let null_pos = serialized.iter().position(|&b| b == 0).ok_or_else(|| {
            StorageError::InvalidObject("missing null byte in header".to_string())
        })?;

        let header = std::str::from_utf8(&serialized[..null_pos])
            .map_err(|_| StorageError::InvalidObject("non-utf8 header".to_string()))?;
        let (kind, size) = header
            .split_once(' ')
            .ok_or_else(|| StorageError::InvalidObject(format!("invalid header: {}", header)))?;

        let object_type = ObjectType::parse(kind)?;
        let size: usize = size
            .parse()
            .map_err(|_| StorageError::InvalidObject(format!("invalid size: {}", size)))?;

        let body = &serialized[null_pos + 1..];
        if body.len() != size {
            return Err(StorageError::InvalidObject(format!(
                "size mismatch: header says {}, body has {}",
                size,
                body.len()
            )));
        }

        Ok(Self::new(object_type, Bytes::copy_from_slice(body)))
    }

    /// Parses the entries of a tree object.
    pub fn tree_entries(&self) -> Result<Vec<TreeEntry>> {
        if self.object_type != ObjectType::Tree {
            return Err(StorageError::InvalidObject(format!(
                "{} is a {}, not a tree",
                self.id,
                self.object_type.as_str()
            )));
        }

        let mut entries = Vec::new();
        let mut rest: &[u8] = &self.data;
        while !rest.is_empty() {
            let space = rest
                .iter()
                .position(|&b| b == b' ')
                .ok_or_else(|| StorageError::InvalidObject("tree entry without mode".into()))?;
            let null = rest
                .iter()
                .position(|&b| b == 0)
                .ok_or_else(|| StorageError::InvalidObject("tree entry without name".into()))?;
            if null < space || rest.len() < null + 21 {
                return Err(StorageError::InvalidObject("truncated tree entry".into()));
            }

            let mode = String::from_utf8_lossy(&rest[..space]).into_owned();
            let name = String::from_utf8_lossy(&rest[space + 1..null]).into_owned();
            let id = ObjectId::from_slice(&rest[null + 1..null + 21])?;
            entries.push(TreeEntry { mode, name, id });
            rest = &rest[null + 21..];
        }
        Ok(entries)
    }

    /// Returns the objects this object references.
    ///
    /// Submodule commits inside trees live in other repositories and are
    /// not followed.
    pub fn links(&self) -> Result<Vec<ObjectId>> {
        match self.object_type {
            ObjectType::Blob => Ok(Vec::new()),
            ObjectType::Tree => Ok(self
                .tree_entries()?
                .into_iter()
                .filter(|entry| entry.mode != GITLINK_MODE)
                .map(|entry| entry.id)
                .collect()),
            ObjectType::Commit => self.header_links(&["tree ", "parent "]),
            ObjectType::Tag => self.header_links(&["object "]),
        }
    }

    fn header_links(&self, prefixes: &[&str]) -> Result<Vec<ObjectId>> {
        let content = String::from_utf8_lossy(&self.data);
        let mut links = Vec::new();
        for line in content.lines() {
            if line.is_empty() {
                break;
            }
            for prefix in prefixes {
                if let Some(hex) = line.strip_prefix(prefix) {
                    links.push(ObjectId::from_hex(hex)?);
                }
            }
        }
        Ok(links)
    }
}
