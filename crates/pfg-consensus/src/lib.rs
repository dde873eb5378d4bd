//! Audit events for the Peerforge remote helper.
//!
//! A push that initializes a repository is recorded as an event on the
//! Peerforge hub chain. The [`AuditSink`] trait is what the remote handler
//! depends on; [`TendermintClient`] broadcasts events as transactions and
//! [`NoopAudit`] / [`RecordingAudit`] stand in when no chain is configured
//! or under test.

mod client;
mod error;
mod event;
mod sink;

pub use client::TendermintClient;
pub use error::AuditError;
pub use event::{Event, EventsTx, EVENT_SOURCE, REPOSITORY_INITIALIZED};
pub use sink::{AuditSink, NoopAudit, RecordingAudit};

/// Result type for audit operations.
pub type Result<T> = std::result::Result<T, AuditError>;
