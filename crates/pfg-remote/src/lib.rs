//! Peerforge remote handler.
//!
//! A Peerforge remote is a directory tree in a content-addressed store:
//!
//! ```text
//! <root>/HEAD                       file holding the default ref name
//! <root>/refs/heads/<branch>        link to the branch head object
//! <root>/objects/<2 hex>/<38 hex>   objects too large to store inline
//! ```
//!
//! Every git object is stored inline as a `git-raw` block whose identifier
//! is derived from the object hash, except objects larger than
//! [`LARGE_OBJECT_THRESHOLD`], which are stored as plain files and linked
//! under `objects/`. Each change yields a new root identifier; the handler
//! tracks the current one for the duration of a session.

mod diverter;
mod error;
mod push;
mod remote;

pub use diverter::{large_object_path, Diversion, Diverter, LARGE_OBJECT_THRESHOLD};
pub use error::RemoteError;
pub use push::{push_graph, PushOutcome};
pub use remote::{PeerforgeRemote, DEFAULT_HEAD_REF, OBJECTS_DIR};

/// Result type for remote operations.
pub type Result<T> = std::result::Result<T, RemoteError>;
