//! Fuzz target for loose git object parsing.
//!
//! Tests that object parsing and link extraction handle arbitrary input
//! without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pfg_storage::{cid_from_object_id, object_id_from_cid, GitObject, ObjectId};

fuzz_target!(|data: &[u8]| {
    if let Ok(object) = GitObject::parse_serialized(data) {
        assert_eq!(object.id, ObjectId::digest(data));
        let _ = object.links();
        let _ = object.tree_entries();

        if let Ok(cid) = cid_from_object_id(&object.id) {
            assert_eq!(object_id_from_cid(&cid).ok(), Some(object.id));
        }
    }
});
