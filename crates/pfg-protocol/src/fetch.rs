//! Graph fetch.
//!
//! Walks the object graph breadth-first from a wanted object, asking the
//! handler for each object the local repository lacks. Objects kept out of
//! line are tried first, then the inline copy. Every object is re-hashed
//! before it is written.

use crate::{ProtocolError, ProtocolHandler, Result, Session};
use pfg_storage::{GitObject, ObjectId};
use std::collections::{HashSet, VecDeque};

/// Counters for a finished fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    /// Objects written to the local repository.
    pub fetched: usize,
    /// Objects that came from the handler's out-of-line storage.
    pub provided: usize,
    /// Objects already present locally.
    pub skipped: usize,
}

/// Copies every object reachable from `want` into the session repository.
///
/// Objects already present locally are assumed to have their full
/// ancestry present too and are not descended into.
pub fn fetch_graph<H: ProtocolHandler>(
    session: &Session,
    handler: &mut H,
    want: &ObjectId,
) -> Result<FetchStats> {
    let mut stats = FetchStats::default();
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([*want]);

    while let Some(id) = queue.pop_front() {
        if !seen.insert(id) {
            continue;
        }
        if session.repo.contains(&id)? {
            stats.skipped += 1;
            continue;
        }

        let bytes = match handler.provide_block(&id).map_err(ProtocolError::handler)? {
            Some(bytes) => {
                stats.provided += 1;
                bytes
            }
            None => handler
                .read_block(&id)
                .map_err(ProtocolError::handler)?
                .ok_or(ProtocolError::ObjectNotFound(id))?,
        };

        let object = GitObject::parse_serialized(&bytes)?;
        if object.id != id {
            return Err(ProtocolError::Integrity {
                expected: id,
                actual: object.id,
            });
        }

        queue.extend(object.links()?);
        session.repo.write_object(&object)?;
        stats.fetched += 1;
        tracing::trace!(id = %id, kind = object.object_type.as_str(), "Fetched object");
    }

    tracing::debug!(
        want = %want,
        fetched = stats.fetched,
        provided = stats.provided,
        skipped = stats.skipped,
        "Fetch complete"
    );
    Ok(stats)
}
