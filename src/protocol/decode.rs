//! Frame decoder.
//!
//! A frame is first parsed into a JSON object, then dispatched on its
//! discriminant: a `type` string, a `start_stops` array, or a nested
//! `message.dataType`. A frame may produce several messages; a snapshot
//! frame that also names the current station yields the route followed by
//! the position update.

use serde_json::{Map, Value};

use super::message::{DecodeError, Message, PositionUpdate, StopRef, Telemetry};
use super::wire::{
    WireBundle, WireOperationalData, WireRouteData, WireStartSnapshot, WireStationUpdate,
    WireStop,
};
use crate::route::{IconPart, LineMeta, Route, Stop, parse_server_time};

type Object = Map<String, Value>;

/// Decode one raw feed frame into typed messages.
pub fn decode_frame(raw: &str) -> Result<Vec<Message>, DecodeError> {
    let value: Value = serde_json::from_str(raw)?;
    let Value::Object(mut frame) = value else {
        return Err(DecodeError::MalformedFrame(
            "frame is not a JSON object".to_string(),
        ));
    };

    if let Some(kind) = frame.get("type").and_then(Value::as_str).map(str::to_owned) {
        return decode_typed(&kind, frame);
    }

    if frame.contains_key("start_stops") {
        let snapshot: WireStartSnapshot = serde_json::from_value(Value::Object(frame))?;
        return decode_start_snapshot(snapshot);
    }

    if let Some(Value::Object(inner)) = frame.remove("message") {
        return decode_data(inner);
    }

    // Oldest boards received the bundle without an envelope
    if frame.contains_key("stops") {
        let bundle: WireBundle = serde_json::from_value(Value::Object(frame))?;
        return decode_bundle(bundle, "bundle");
    }

    Err(DecodeError::UnknownKind("<untyped>".to_string()))
}

// ============================================================================
// Dispatch
// ============================================================================

fn decode_typed(kind: &str, mut frame: Object) -> Result<Vec<Message>, DecodeError> {
    match kind {
        "ping" | "pong" => Ok(vec![Message::Ping]),
        "connection_data" => {
            let data = take_field(&mut frame, "data")?;
            decode_bundle(serde_json::from_value(data)?, "connection_data")
        }
        "update_station" => {
            let message = take_field(&mut frame, "message")?;
            decode_station_update(serde_json::from_value(message)?)
        }
        "update" => match take_field(&mut frame, "message")? {
            Value::Object(inner) => decode_data(inner),
            _ => Err(DecodeError::MalformedFrame(
                "`message` is not an object".to_string(),
            )),
        },
        other => Err(DecodeError::UnknownKind(other.to_string())),
    }
}

/// `message` payloads discriminated by `dataType`
fn decode_data(mut inner: Object) -> Result<Vec<Message>, DecodeError> {
    let data_type = match inner.remove("dataType") {
        Some(Value::String(s)) => s,
        Some(_) => {
            return Err(DecodeError::MalformedFrame(
                "`dataType` is not a string".to_string(),
            ));
        }
        None => return Err(DecodeError::MalformedFrame("missing `dataType`".to_string())),
    };

    match data_type.as_str() {
        "RouteData" => {
            let data: WireRouteData = serde_json::from_value(Value::Object(inner))?;
            let route = build_route(data.stops, LineMeta::default())?;
            Ok(vec![Message::RouteSnapshot(route)])
        }
        "OperationalData" => {
            let data: WireOperationalData = serde_json::from_value(Value::Object(inner))?;
            let mut messages = vec![Message::PositionUpdate(PositionUpdate {
                current: StopRef::Index(data.current_station_index),
                next: StopRef::Index(data.next_station_index),
                timestamp: data.time.as_deref().and_then(parse_server_time),
            })];
            push_telemetry(&mut messages, "OperationalData", data.rest);
            Ok(messages)
        }
        "AdditionalOperationalData" => Ok(vec![Message::Telemetry(Telemetry {
            source: data_type,
            fields: inner,
        })]),
        _ => Err(DecodeError::UnknownKind(data_type)),
    }
}

// ============================================================================
// Frame Shapes
// ============================================================================

fn decode_start_snapshot(snapshot: WireStartSnapshot) -> Result<Vec<Message>, DecodeError> {
    let route = build_route(snapshot.start_stops, LineMeta::default())?;
    let mut messages = vec![Message::RouteSnapshot(route)];
    if let (Some(current), Some(next)) =
        (snapshot.current_station_index, snapshot.next_station_index)
    {
        messages.push(Message::PositionUpdate(PositionUpdate {
            current: StopRef::Index(current),
            next: StopRef::Index(next),
            timestamp: None,
        }));
    }
    Ok(messages)
}

fn decode_bundle(bundle: WireBundle, source: &str) -> Result<Vec<Message>, DecodeError> {
    let icons: Vec<IconPart> = bundle
        .line_icons
        .unwrap_or_default()
        .into_iter()
        .map(IconPart::from)
        .collect();
    let line = LineMeta::from_icons(bundle.line_name.filter(|n| !n.is_empty()), icons);
    let route = build_route(bundle.stops, line)?;

    let mut messages = vec![Message::RouteSnapshot(route)];
    push_telemetry(&mut messages, source, bundle.rest);
    Ok(messages)
}

fn decode_station_update(update: WireStationUpdate) -> Result<Vec<Message>, DecodeError> {
    let mut messages = vec![Message::PositionUpdate(PositionUpdate {
        current: StopRef::Id(update.current_station.stop_id()),
        next: StopRef::Id(update.next_station.stop_id()),
        timestamp: None,
    })];
    push_telemetry(&mut messages, "update_station", update.rest);
    Ok(messages)
}

// ============================================================================
// Helpers
// ============================================================================

fn build_route(stops: Vec<WireStop>, line: LineMeta) -> Result<Route, DecodeError> {
    Route::new(stops.into_iter().map(Stop::from).collect(), line)
}

fn take_field(frame: &mut Object, field: &str) -> Result<Value, DecodeError> {
    frame
        .remove(field)
        .ok_or_else(|| DecodeError::MalformedFrame(format!("missing `{field}`")))
}

/// Leftover fields travel to the renderer untouched
fn push_telemetry(messages: &mut Vec<Message>, source: &str, fields: Object) {
    if !fields.is_empty() {
        messages.push(Message::Telemetry(Telemetry {
            source: source.to_string(),
            fields,
        }));
    }
}
