//! Content store error types.

use thiserror::Error;

/// Errors reported by the content store.
///
/// A path or link that does not exist is not an error: lookups return
/// `Ok(None)` for it.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport failure talking to the store.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with an error status.
    #[error("store api error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Message reported by the store.
        message: String,
    },

    /// The store answered with something we could not decode.
    #[error("malformed store response: {0}")]
    Decode(String),

    /// A content identifier could not be parsed.
    #[error("invalid cid: {0}")]
    InvalidCid(#[from] cid::Error),

    /// A link type outside the known unixfs/ipld set.
    #[error("unexpected link type {0}")]
    UnexpectedLinkType(i32),

    /// A path walked through something that is not a directory.
    #[error("not a directory: {0}")]
    NotDirectory(String),

    /// Bytes were requested from something that is not a file.
    #[error("not a file: {0}")]
    NotFile(String),

    /// An intermediate link is missing and creation was not requested.
    #[error("missing intermediate link: {0}")]
    MissingLink(String),

    /// Malformed store path.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Codec or format combination the store does not handle.
    #[error("unsupported: {0}")]
    Unsupported(String),
}
