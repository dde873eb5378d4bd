//! Graph push.
//!
//! Copies every object reachable from a head into the store. The remote
//! root is passed in and handed back in the [`PushOutcome`]; diversions
//! along the way produce intermediate roots that are threaded through the
//! traversal rather than written to shared state.

use crate::{Diverter, RemoteError, Result};
use cid::Cid;
use pfg_git::ObjectRepository;
use pfg_ipfs::ContentStore;
use pfg_storage::{cid_from_object_id, ObjectId, Tracker};
use std::collections::HashSet;

/// Codec the serialized objects are handed to the store in.
const INPUT_CODEC: &str = "raw";
/// Codec inline objects are stored with.
const STORE_CODEC: &str = "git-raw";

/// Result of pushing an object graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushOutcome {
    /// Remote root after every diversion.
    pub root: Cid,
    /// Objects stored as inline blocks.
    pub inlined: usize,
    /// Objects stored out of line, with their file identifiers.
    pub diverted: Vec<(ObjectId, Cid)>,
}

/// Pushes the graph below `head`, starting from remote root `root`.
pub fn push_graph(
    store: &dyn ContentStore,
    repo: &dyn ObjectRepository,
    tracker: &dyn Tracker,
    root: Cid,
    head: &ObjectId,
) -> Result<PushOutcome> {
    let diverter = Diverter::new(store, tracker);
    let mut outcome = PushOutcome {
        root,
        inlined: 0,
        diverted: Vec::new(),
    };
    let mut seen = HashSet::new();
    let mut stack = vec![*head];

    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }

        let object = repo
            .read_object(&id)?
            .ok_or(RemoteError::MissingObject(id))?;
        let serialized = object.serialize();

        match diverter.divert(&outcome.root, &id, &serialized)? {
            Some(diversion) => {
                outcome.root = diversion.root;
                outcome.diverted.push((id, diversion.block));
            }
            None => {
                let stored = store.put(&serialized, INPUT_CODEC, STORE_CODEC)?;
                let expected = cid_from_object_id(&id)?;
                if stored != expected {
                    return Err(RemoteError::Integrity {
                        object: id,
                        expected: expected.to_string(),
                        actual: stored.to_string(),
                    });
                }
                outcome.inlined += 1;
            }
        }

        stack.extend(object.links()?);
    }

    tracing::debug!(
        head = %head,
        inlined = outcome.inlined,
        diverted = outcome.diverted.len(),
        root = %outcome.root,
        "Pushed object graph"
    );
    Ok(outcome)
}
