//! Typed feed messages
//!
//! Inbound frames decode into `Message`s; the only outbound message is the
//! keepalive ping sent when the feed opens.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::route::{Route, StopId};

/// Decoding failures. All of them drop the frame, never the connection.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed frame: {0}")]
    MalformedFrame(String),

    #[error("unknown message kind `{0}`")]
    UnknownKind(String),

    #[error("duplicate stop id `{0}` in route")]
    DuplicateStop(StopId),
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedFrame(err.to_string())
    }
}

/// How a position update names a stop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopRef {
    /// 0-based index into the held route (index dialect)
    Index(usize),
    /// Stop id (station object dialect)
    Id(StopId),
}

impl fmt::Display for StopRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(i) => write!(f, "#{i}"),
            Self::Id(id) => write!(f, "{id}"),
        }
    }
}

/// Current/next station update, not yet resolved against a route
#[derive(Debug, Clone, PartialEq)]
pub struct PositionUpdate {
    pub current: StopRef,
    pub next: StopRef,
    /// Server clock sample carried by the frame
    pub timestamp: Option<DateTime<Utc>>,
}

/// Auxiliary data the core forwards to the renderer without interpreting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Telemetry {
    /// Frame kind the data came from (e.g. `AdditionalOperationalData`)
    pub source: String,
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// A decoded feed message
#[derive(Debug, Clone)]
pub enum Message {
    Ping,
    RouteSnapshot(Route),
    PositionUpdate(PositionUpdate),
    Telemetry(Telemetry),
}

/// Message sent from the board to the feed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Keepalive, sent once the connection opens
    Ping,
}

impl ClientMessage {
    /// Serialize to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"ping"}"#.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_serialization() {
        assert_eq!(ClientMessage::Ping.to_json(), r#"{"type":"ping"}"#);
    }

    #[test]
    fn test_stop_ref_display() {
        assert_eq!(StopRef::Index(3).to_string(), "#3");
        assert_eq!(StopRef::Id(StopId::new("S2")).to_string(), "S2");
    }

    #[test]
    fn test_decode_error_from_json() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(DecodeError::from(err), DecodeError::MalformedFrame(_)));
    }
}
