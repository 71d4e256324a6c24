//! Actor Message Definitions
//!
//! ```text
//! ConnectionManager --ConnectionEvent--> DisplayActor --RenderCommand--> RenderActor
//!                                             ^                              |
//!                                             +--------- Measured -----------+
//! ```

use serde::Serialize;

use crate::animate::AnimationKind;
use crate::feed::ConnectionState;
use crate::layout::{LabelWidths, Layout};
use crate::protocol::Telemetry;
use crate::route::{LineMeta, RouteRevision, Stop, StopId};

// =============================================================================
// DisplayActor Messages
// =============================================================================

/// Messages to Display Actor (besides feed events)
#[derive(Debug)]
pub enum DisplayMsg {
    /// Label widths measured for the route drawn at `revision`
    Measured {
        revision: RouteRevision,
        widths: LabelWidths,
    },
    /// Stop animations, close the feed and exit
    Shutdown,
}

// =============================================================================
// RenderActor Messages
// =============================================================================

/// Instructions for the rendering surface.
///
/// Serialized one per line in `--json` mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum RenderCommand {
    ConnectionStatus {
        state: ConnectionState,
        attempts: u32,
    },
    /// Reconnect attempts exhausted
    ConnectionLost { attempts: u32 },
    /// Rebuild stop elements. The renderer answers with
    /// [`DisplayMsg::Measured`] for the same revision.
    DrawRoute {
        revision: RouteRevision,
        line: LineMeta,
        stops: Vec<Stop>,
    },
    Layout {
        revision: RouteRevision,
        layout: Layout,
    },
    Position {
        current: StopId,
        next: StopId,
        current_index: usize,
    },
    Animate {
        kind: AnimationKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        target: Option<StopId>,
        from: f64,
        to: f64,
        duration_ms: u64,
    },
    Frame {
        kind: AnimationKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        target: Option<StopId>,
        value: f64,
    },
    TransitionDone {
        kind: AnimationKind,
        #[serde(skip_serializing_if = "Option::is_none")]
        target: Option<StopId>,
    },
    Telemetry(Telemetry),
    /// Server clock offset in milliseconds (server minus local)
    ClockSync { offset_ms: i64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_command_json() {
        let cmd = RenderCommand::Animate {
            kind: AnimationKind::Highlight,
            target: Some(StopId::new("S2")),
            from: 0.0,
            to: 1.0,
            duration_ms: 300,
        };
        assert_eq!(
            serde_json::to_value(&cmd).unwrap(),
            json!({
                "command": "animate",
                "kind": "highlight",
                "target": "S2",
                "from": 0.0,
                "to": 1.0,
                "duration_ms": 300
            })
        );

        let status = RenderCommand::ConnectionStatus {
            state: ConnectionState::Reconnecting,
            attempts: 3,
        };
        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            json!({"command": "connection_status", "state": "reconnecting", "attempts": 3})
        );
    }

    #[test]
    fn test_telemetry_flattened() {
        let mut fields = serde_json::Map::new();
        fields.insert("speed".into(), json!(42));
        let cmd = RenderCommand::Telemetry(Telemetry {
            source: "AdditionalOperationalData".into(),
            fields,
        });
        assert_eq!(
            serde_json::to_value(&cmd).unwrap(),
            json!({
                "command": "telemetry",
                "source": "AdditionalOperationalData",
                "fields": {"speed": 42}
            })
        );
    }
}
