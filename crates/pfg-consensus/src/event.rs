//! Event payloads.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Event type recorded when the first push creates a repository.
pub const REPOSITORY_INITIALIZED: &str = "repository.Initialized";

/// Source identifier of events emitted by the remote helper.
pub const EVENT_SOURCE: &str = "peerforge.hubd";

/// A single hub event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Version 4 UUID.
    pub id: String,
    /// Payload version, encoded as a JSON string.
    #[serde(
        serialize_with = "serialize_version",
        deserialize_with = "deserialize_version"
    )]
    pub version: u32,
    /// Emitting component.
    pub source: String,
    /// Event type, e.g. [`REPOSITORY_INITIALIZED`].
    #[serde(rename = "type")]
    pub kind: String,
}

impl Event {
    /// Creates an event with a fresh random id.
    pub fn new(kind: impl Into<String>, version: u32, source: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            version,
            source: source.into(),
            kind: kind.into(),
        }
    }

    /// The event recorded for a repository's first push.
    pub fn repository_initialized() -> Self {
        Self::new(REPOSITORY_INITIALIZED, 1, EVENT_SOURCE)
    }
}

fn serialize_version<S: Serializer>(version: &u32, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&version.to_string())
}

fn deserialize_version<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let raw = String::deserialize(deserializer)?;
    raw.parse().map_err(serde::de::Error::custom)
}

/// Transaction body carrying a batch of events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventsTx {
    /// Events in emission order.
    pub events: Vec<Event>,
}

impl EventsTx {
    /// Wraps a single event.
    pub fn single(event: Event) -> Self {
        Self {
            events: vec![event],
        }
    }

    /// Encodes the transaction as JSON bytes.
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
