//! The remote handler contract.

use bytes::Bytes;
use pfg_git::ObjectRepository;
use pfg_storage::{ObjectId, Tracker};
use std::fmt;
use std::sync::Arc;

/// Verbs advertised in reply to `capabilities`.
pub const DEFAULT_CAPABILITIES: &[&str] = &["push", "fetch"];

/// Local collaborators shared by the engine and the handler for one session.
#[derive(Clone)]
pub struct Session {
    /// The local repository git invoked us from.
    pub repo: Arc<dyn ObjectRepository>,
    /// Ref and large-object bookkeeping.
    pub tracker: Arc<dyn Tracker>,
}

impl Session {
    /// Bundles a repository and a tracker.
    pub fn new(repo: Arc<dyn ObjectRepository>, tracker: Arc<dyn Tracker>) -> Self {
        Self { repo, tracker }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

/// What a listed ref points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefValue {
    /// A concrete object.
    Object(ObjectId),
    /// Another ref, e.g. `HEAD` pointing at `refs/heads/main`.
    Symbolic(String),
    /// A value reported verbatim.
    Raw(String),
}

/// One line of a `list` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    /// Ref target.
    pub value: RefValue,
    /// Ref name.
    pub name: String,
}

impl ListEntry {
    /// Entry for a ref pointing at an object.
    pub fn object(id: ObjectId, name: impl Into<String>) -> Self {
        Self {
            value: RefValue::Object(id),
            name: name.into(),
        }
    }

    /// Entry for a ref whose value was read from the remote.
    ///
    /// A 40-hex value is reported verbatim, anything else as a symbolic ref.
    pub fn from_value(value: &str, name: impl Into<String>) -> Self {
        let value = value.trim();
        let is_hash = value.len() == 40 && value.bytes().all(|b| b.is_ascii_hexdigit());
        Self {
            value: if is_hash {
                RefValue::Raw(value.to_string())
            } else {
                RefValue::Symbolic(value.to_string())
            },
            name: name.into(),
        }
    }
}

impl fmt::Display for ListEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            RefValue::Object(id) => write!(f, "{} {}", id, self.name),
            RefValue::Symbolic(target) => write!(f, "@{} {}", target, self.name),
            RefValue::Raw(value) => write!(f, "{} {}", value, self.name),
        }
    }
}

/// Remote-specific half of a remote helper.
///
/// The engine calls [`initialize`](Self::initialize) once, then any number
/// of `list`/`push`/block calls, then [`finish`](Self::finish) once after a
/// successful flush.
pub trait ProtocolHandler {
    /// Error type reported by the handler.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Binds the handler to the session's repository and tracker.
    fn initialize(&mut self, session: &Session) -> Result<(), Self::Error>;

    /// Verbs to advertise.
    fn capabilities(&self) -> &[&'static str] {
        DEFAULT_CAPABILITIES
    }

    /// Lists remote refs, or local refs with their remote values when
    /// `for_push` is set.
    fn list(&mut self, for_push: bool) -> Result<Vec<ListEntry>, Self::Error>;

    /// Pushes `local` to `remote`, returning the ref to confirm.
    fn push(&mut self, local: &str, remote: &str) -> Result<String, Self::Error>;

    /// Returns the serialized object if the remote keeps it out of line.
    fn provide_block(&mut self, id: &ObjectId) -> Result<Option<Bytes>, Self::Error>;

    /// Returns the serialized object stored inline.
    fn read_block(&mut self, id: &ObjectId) -> Result<Option<Bytes>, Self::Error>;

    /// Completes the session.
    fn finish(&mut self) -> Result<(), Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_entry_rendering() {
        let id = ObjectId::from_hex("e69de29bb2d1d6434b8b29ae775ad8c2e48c5391").unwrap();
        assert_eq!(
            ListEntry::object(id, "refs/heads/main").to_string(),
            "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391 refs/heads/main"
        );
        assert_eq!(
            ListEntry::from_value("refs/heads/main\n", "HEAD").to_string(),
            "@refs/heads/main HEAD"
        );
        assert_eq!(
            ListEntry::from_value("e69de29bb2d1d6434b8b29ae775ad8c2e48c5391", "refs/tags/v1")
                .to_string(),
            "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391 refs/tags/v1"
        );
    }
}
