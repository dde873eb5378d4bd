//! Command line parsing and queued work.

use crate::{ProtocolError, Result};
use pfg_storage::ObjectId;

/// A single line received from git.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `capabilities`
    Capabilities,
    /// `list` or `list for-push`
    List {
        /// Whether git is about to push.
        for_push: bool,
    },
    /// `push [+]<src>:<dst>`
    Push {
        /// Local ref being pushed.
        local: String,
        /// Remote ref being updated.
        remote: String,
        /// Whether a non-fast-forward update was requested.
        force: bool,
    },
    /// `fetch <sha> <ref>`
    Fetch {
        /// Wanted object.
        hash: ObjectId,
        /// Ref the object was listed under.
        name: String,
    },
    /// Blank line terminating a batch.
    Flush,
}

impl Command {
    /// Parses a command line with its line terminator already stripped.
    pub fn parse(line: &str) -> Result<Self> {
        if line.is_empty() {
            return Ok(Self::Flush);
        }

        let (verb, args) = match line.split_once(' ') {
            Some((verb, args)) => (verb, Some(args)),
            None => (line, None),
        };

        match (verb, args) {
            ("capabilities", None) => Ok(Self::Capabilities),
            ("list", None) => Ok(Self::List { for_push: false }),
            ("list", Some("for-push")) => Ok(Self::List { for_push: true }),
            ("list", Some(_)) => Err(ProtocolError::Malformed(line.to_string())),
            ("push", Some(spec)) => {
                let (spec, force) = match spec.strip_prefix('+') {
                    Some(rest) => (rest, true),
                    None => (spec, false),
                };
                let (local, remote) = spec
                    .split_once(':')
                    .ok_or_else(|| ProtocolError::Malformed(line.to_string()))?;
                // An empty source is a ref deletion, which the remote cannot express.
                if local.is_empty() || remote.is_empty() {
                    return Err(ProtocolError::Malformed(line.to_string()));
                }
                Ok(Self::Push {
                    local: local.to_string(),
                    remote: remote.to_string(),
                    force,
                })
            }
            ("fetch", Some(args)) => {
                let (hash, name) = args
                    .split_once(' ')
                    .ok_or_else(|| ProtocolError::Malformed(line.to_string()))?;
                let hash = ObjectId::from_hex(hash)
                    .map_err(|_| ProtocolError::Malformed(line.to_string()))?;
                Ok(Self::Fetch {
                    hash,
                    name: name.to_string(),
                })
            }
            ("push", None) | ("fetch", None) => Err(ProtocolError::Malformed(line.to_string())),
            _ => Err(ProtocolError::UnknownCommand(line.to_string())),
        }
    }
}

/// Work deferred until git flushes the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem {
    /// Push a local ref to a remote ref.
    Push {
        /// Local ref.
        local: String,
        /// Remote ref.
        remote: String,
    },
    /// Fetch the graph below `hash` and record it under `name`.
    Fetch {
        /// Wanted object.
        hash: ObjectId,
        /// Ref name reported by git.
        name: String,
    },
}
