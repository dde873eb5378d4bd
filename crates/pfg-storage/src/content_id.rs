//! Translation between git object hashes and content identifiers.
//!
//! Inline objects are stored with the `git-raw` codec and a SHA-1
//! multihash, so the multihash digest is exactly the git object hash.

use crate::{ObjectId, Result, StorageError};
use ::cid::multihash::Multihash;
use ::cid::Cid;

/// Multicodec code of the `git-raw` IPLD codec.
pub const GIT_RAW_CODEC: u64 = 0x78;
/// Multihash code of SHA-1.
pub const SHA1_CODE: u64 = 0x11;

/// Returns the content identifier of an inline git object.
pub fn cid_from_object_id(id: &ObjectId) -> Result<Cid> {
    let hash = Multihash::<64>::wrap(SHA1_CODE, id.as_bytes())
        .map_err(|e| StorageError::InvalidCid(e.to_string()))?;
    Ok(Cid::new_v1(GIT_RAW_CODEC, hash))
}

/// Recovers the git object hash from a content identifier.
///
/// Fails for identifiers whose multihash is not a 20-byte SHA-1 digest.
pub fn object_id_from_cid(cid: &Cid) -> Result<ObjectId> {
    let hash = cid.hash();
    if hash.code() != SHA1_CODE {
        return Err(StorageError::InvalidCid(format!(
            "{} is not sha1-addressed (multihash code {:#x})",
            cid,
            hash.code()
        )));
    }
    ObjectId::from_slice(hash.digest()).map_err(|_| {
        StorageError::InvalidCid(format!(
            "{} carries a {}-byte digest",
            cid,
            hash.digest().len()
        ))
    })
}
