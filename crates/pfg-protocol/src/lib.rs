//! Git remote-helper protocol engine.
//!
//! git drives a remote helper over stdin/stdout with one command per line.
//! [`Protocol`] reads those commands, answers `capabilities` and `list`
//! directly, queues `push` and `fetch` as [`WorkItem`]s and runs the queue
//! once when git sends the terminating blank line. Everything specific to a
//! remote lives behind [`ProtocolHandler`].

mod command;
mod engine;
mod error;
mod fetch;
mod handler;

pub use command::{Command, WorkItem};
pub use engine::Protocol;
pub use error::ProtocolError;
pub use fetch::{fetch_graph, FetchStats};
pub use handler::{ListEntry, ProtocolHandler, RefValue, Session, DEFAULT_CAPABILITIES};

/// Result type for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
