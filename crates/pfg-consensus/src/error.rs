//! Audit error types.

use thiserror::Error;

/// Errors that can occur while recording an audit event.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Transport failure talking to the consensus node.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Event payload could not be encoded, or the reply decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The node answered with a JSON-RPC error.
    #[error("rpc error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// Error message, with any detail appended.
        message: String,
    },

    /// The transaction was rejected by the application.
    #[error("transaction rejected at {stage} (code {code}): {log}")]
    Rejected {
        /// `check_tx` or `deliver_tx`.
        stage: &'static str,
        /// Non-zero application result code.
        code: u32,
        /// Log reported by the application.
        log: String,
    },

    /// The reply carried neither a result nor an error.
    #[error("malformed rpc response: {0}")]
    Malformed(String),
}
