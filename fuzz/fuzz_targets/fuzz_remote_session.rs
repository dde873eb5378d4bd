//! Fuzz target for the remote-helper line protocol.
//!
//! Feeds arbitrary input to a full session over in-memory collaborators and
//! checks that it never panics.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pfg_consensus::NoopAudit;
use pfg_git::MemoryRepository;
use pfg_ipfs::MemoryStore;
use pfg_protocol::{Command, Protocol, Session};
use pfg_remote::PeerforgeRemote;
use pfg_storage::MemoryTracker;
use std::sync::Arc;

fuzz_target!(|data: &[u8]| {
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    for line in input.lines() {
        let _ = Command::parse(line);
    }

    let Ok(root) = MemoryStore::empty_root() else {
        return;
    };
    let handler = PeerforgeRemote::new(Arc::new(MemoryStore::new()), Arc::new(NoopAudit), root);
    let session = Session::new(
        Arc::new(MemoryRepository::new()),
        Arc::new(MemoryTracker::new()),
    );
    if let Ok(mut protocol) = Protocol::new(handler, session) {
        let mut output = Vec::new();
        let _ = protocol.run(input.as_bytes(), &mut output);
    }
});
