//! Wire shapes of both feed dialects.
//!
//! Field names follow the server verbatim. Everything nullable on the
//! server side is an `Option` here and defaulted on conversion.

use serde::Deserialize;

use crate::route::{IconPart, Stop, StopId, Transfer};

/// Station id as sent by the server: a code string or a numeric id
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum WireId {
    Text(String),
    Number(i64),
}

#[derive(Debug, Deserialize)]
pub(super) struct WireIconPart {
    symbol: Option<String>,
    color: Option<String>,
}

impl From<WireIconPart> for IconPart {
    fn from(part: WireIconPart) -> Self {
        Self {
            symbol: part.symbol.unwrap_or_default(),
            color: part.color.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireTransfer {
    transfer_name: Option<String>,
    transfer_name2: Option<String>,
    icon_parts: Option<Vec<WireIconPart>>,
}

impl From<WireTransfer> for Transfer {
    fn from(t: WireTransfer) -> Self {
        Self {
            name: t.transfer_name,
            secondary_name: t.transfer_name2,
            icon_parts: t
                .icon_parts
                .unwrap_or_default()
                .into_iter()
                .map(IconPart::from)
                .collect(),
        }
    }
}

/// Stop object shared by both dialects.
///
/// The route-data dialect names its fields `stationName`/`stationID`.
#[derive(Debug, Deserialize)]
pub(super) struct WireStop {
    #[serde(alias = "stationName")]
    name: String,
    name2: Option<String>,
    #[serde(default, alias = "stationID", alias = "code")]
    id: Option<WireId>,
    transfers: Option<Vec<WireTransfer>>,
}

impl WireStop {
    /// Explicit id when present, otherwise the display name
    pub(super) fn stop_id(&self) -> StopId {
        match &self.id {
            Some(WireId::Text(code)) if !code.is_empty() => StopId::new(code),
            Some(WireId::Number(n)) => StopId::new(n.to_string()),
            _ => StopId::new(&self.name),
        }
    }
}

impl From<WireStop> for Stop {
    fn from(stop: WireStop) -> Self {
        Self {
            id: stop.stop_id(),
            name: stop.name,
            secondary_name: stop.name2.filter(|n| !n.is_empty()),
            transfers: stop
                .transfers
                .unwrap_or_default()
                .into_iter()
                .map(Transfer::from)
                .collect(),
        }
    }
}

/// `{"start_stops": [...], "currentStationIndex": N, "nextStationIndex": M}`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct WireStartSnapshot {
    #[serde(rename = "start_stops")]
    pub start_stops: Vec<WireStop>,
    pub current_station_index: Option<usize>,
    pub next_station_index: Option<usize>,
}

/// `{"dataType": "RouteData", "stops": [...]}`
#[derive(Debug, Deserialize)]
pub(super) struct WireRouteData {
    pub stops: Vec<WireStop>,
}

/// `{"dataType": "OperationalData", ...}`; unknown fields are telemetry
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct WireOperationalData {
    pub current_station_index: usize,
    pub next_station_index: usize,
    pub time: Option<String>,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

/// `connection_data` bundle; unknown fields (wagons, side, ...) are telemetry
#[derive(Debug, Deserialize)]
pub(super) struct WireBundle {
    pub stops: Vec<WireStop>,
    pub line_name: Option<String>,
    pub line_icons: Option<Vec<WireIconPart>>,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}

/// `update_station` payload
#[derive(Debug, Deserialize)]
pub(super) struct WireStationUpdate {
    pub current_station: WireStop,
    pub next_station: WireStop,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
}
