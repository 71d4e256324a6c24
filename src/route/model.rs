//! Route data model: stops, transfers and line branding.
//!
//! Identifiers use `Arc<str>` so route snapshots, the position pointer,
//! layouts and animation targets can all hold the same id cheaply.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::protocol::DecodeError;

/// Stable station identifier (station code, or the station name when the
/// feed carries no code).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StopId(Arc<str>);

impl StopId {
    pub fn new(s: impl AsRef<str>) -> Self {
        Self(s.as_ref().into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for StopId {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for StopId {}

impl Hash for StopId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl fmt::Display for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StopId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for StopId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// One colored glyph of a line or transfer icon
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconPart {
    pub symbol: String,
    pub color: String,
}

/// A connecting line available at a stop
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_name: Option<String>,
    pub icon_parts: Vec<IconPart>,
}

impl Transfer {
    /// A transfer with a name is drawn as a ring marker instead of a dot
    pub fn is_named(&self) -> bool {
        self.name.as_deref().is_some_and(|n| !n.is_empty())
    }
}

/// One station on the route
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stop {
    pub id: StopId,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transfers: Vec<Transfer>,
}

impl Stop {
    pub fn new(id: impl Into<StopId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            secondary_name: None,
            transfers: Vec::new(),
        }
    }

    pub fn has_transfer(&self) -> bool {
        self.transfers.iter().any(Transfer::is_named)
    }
}

/// Line branding shown next to the progress bar
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub icons: Vec<IconPart>,
}

impl LineMeta {
    /// Build line meta from the feed's icon list; the line color is the
    /// color of the first icon part.
    pub fn from_icons(name: Option<String>, icons: Vec<IconPart>) -> Self {
        let color = icons
            .first()
            .map(|icon| icon.color.clone())
            .filter(|c| !c.is_empty());
        Self { name, color, icons }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.color.is_none() && self.icons.is_empty()
    }
}

/// Ordered stop sequence plus line metadata.
///
/// Immutable once built; the store replaces it wholesale and shares it
/// behind an `Arc`.
#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    pub line: LineMeta,
    stops: Vec<Stop>,
    index: FxHashMap<StopId, usize>,
}

impl Route {
    /// Build a route, rejecting duplicate stop ids.
    pub fn new(stops: Vec<Stop>, line: LineMeta) -> Result<Self, DecodeError> {
        let mut index = FxHashMap::default();
        for (i, stop) in stops.iter().enumerate() {
            if index.insert(stop.id.clone(), i).is_some() {
                return Err(DecodeError::DuplicateStop(stop.id.clone()));
            }
        }
        Ok(Self { line, stops, index })
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Stop> {
        self.stops.get(index)
    }

    pub fn index_of(&self, id: &StopId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, id: &StopId) -> bool {
        self.index.contains_key(id)
    }

    /// Index-aligned id comparison.
    ///
    /// Two routes have the same sequence only if they have the same length
    /// and the ids at every index are equal. Names, transfers and line meta
    /// are not compared.
    pub fn same_sequence(&self, other: &Route) -> bool {
        self.stops.len() == other.stops.len()
            && self
                .stops
                .iter()
                .zip(other.stops.iter())
                .all(|(a, b)| a.id == b.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(ids: &[&str]) -> Route {
        Route::new(
            ids.iter().map(|id| Stop::new(*id, *id)).collect(),
            LineMeta::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_stop_id_equality() {
        let a = StopId::new("S1");
        let b = StopId::from("S1");
        let c = a.clone();
        assert_eq!(a, b);
        assert!(Arc::ptr_eq(&a.0, &c.0));
    }

    #[test]
    fn test_stop_id_serializes_as_string() {
        let json = serde_json::to_string(&StopId::new("S1")).unwrap();
        assert_eq!(json, r#""S1""#);
        let id: StopId = serde_json::from_str(r#""S2""#).unwrap();
        assert_eq!(id, StopId::new("S2"));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let stops = vec![Stop::new("S1", "A"), Stop::new("S1", "B")];
        let err = Route::new(stops, LineMeta::default()).unwrap_err();
        assert!(matches!(err, DecodeError::DuplicateStop(id) if id.as_str() == "S1"));
    }

    #[test]
    fn test_index_lookup() {
        let r = route(&["S1", "S2", "S3"]);
        assert_eq!(r.index_of(&StopId::new("S2")), Some(1));
        assert_eq!(r.index_of(&StopId::new("S9")), None);
        assert_eq!(r.get(2).map(|s| s.id.as_str()), Some("S3"));
    }

    #[test]
    fn test_same_sequence_is_index_aligned() {
        let held = route(&["S1", "S2", "S3"]);
        assert!(held.same_sequence(&route(&["S1", "S2", "S3"])));
        assert!(!held.same_sequence(&route(&["S1", "S2"])));
        assert!(!held.same_sequence(&route(&["S1", "S3", "S2"])));
    }

    #[test]
    fn test_same_sequence_ignores_names() {
        let held = route(&["S1", "S2"]);
        let renamed = Route::new(
            vec![Stop::new("S1", "First"), Stop::new("S2", "Second")],
            LineMeta::default(),
        )
        .unwrap();
        assert!(held.same_sequence(&renamed));
    }

    #[test]
    fn test_line_color_from_first_icon() {
        let meta = LineMeta::from_icons(
            Some("Line 1".into()),
            vec![
                IconPart {
                    symbol: "1".into(),
                    color: "#E42313".into(),
                },
                IconPart {
                    symbol: "M".into(),
                    color: "#000000".into(),
                },
            ],
        );
        assert_eq!(meta.color.as_deref(), Some("#E42313"));
        assert!(!meta.is_empty());
        assert!(LineMeta::from_icons(None, Vec::new()).is_empty());
    }

    #[test]
    fn test_has_transfer() {
        let mut stop = Stop::new("S1", "A");
        assert!(!stop.has_transfer());
        stop.transfers.push(Transfer {
            name: Some(String::new()),
            ..Default::default()
        });
        assert!(!stop.has_transfer());
        stop.transfers.push(Transfer {
            name: Some("Ring line".into()),
            ..Default::default()
        });
        assert!(stop.has_transfer());
    }
}
