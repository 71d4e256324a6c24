//! Layout Engine
//!
//! Places stops left to right on the progress bar. The layout is a pure
//! function of `(route, widths, config)`: identical inputs give bit-identical
//! offsets, so a remeasure with unchanged widths reproduces the same layout.
//!
//! ```text
//! start_offset
//! |<- w0 ->|<- padding ->|<- w1 ->|<- padding ->|<- w2 ->|
//! S0                     S1                     S2
//! ```
//!
//! Degenerate input never fails. Missing widths count as zero, invalid widths
//! clamp to zero, and the progress line never has negative or NaN length.
//! Every clamp is recorded as a [`LayoutError`] on the result.

use rustc_hash::FxHashMap;
use serde::Serialize;
use thiserror::Error;

use crate::route::{Route, StopId};

/// Measured label widths, keyed by stop id
pub type LabelWidths = FxHashMap<StopId, f64>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    /// Left offset of the first stop
    pub start_offset: f64,
    /// Gap between one label's right edge and the next label
    pub padding: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            start_offset: 0.0,
            padding: 50.0,
        }
    }
}

/// Non-fatal layout issues
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("route has no stops")]
    EmptyRoute,

    #[error("route has a single stop")]
    SingleStop,

    #[error("invalid width {width} for stop `{id}`, using 0")]
    InvalidWidth { id: StopId, width: f64 },

    #[error("progress line ends before it starts ({start} > {finish})")]
    InvertedLine { start: f64, finish: f64 },
}

/// A stop's horizontal slot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slot {
    pub id: StopId,
    pub left: f64,
    pub width: f64,
}

/// Progress line from the first stop to the last
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressLine {
    pub left: f64,
    pub length: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub start_offset: f64,
    pub slots: Vec<Slot>,
    pub line: ProgressLine,
    /// Right edge of the last label relative to the start offset
    pub total_width: f64,
    /// Stops placed without a measurement
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unmeasured: Vec<StopId>,
    #[serde(skip)]
    pub issues: Vec<LayoutError>,
}

impl Layout {
    pub fn slot(&self, id: &StopId) -> Option<&Slot> {
        self.slots.iter().find(|slot| &slot.id == id)
    }

    pub fn left_of(&self, id: &StopId) -> Option<f64> {
        self.slot(id).map(|slot| slot.left)
    }

    /// Translation that moves `id` to the start offset
    pub fn shift_for(&self, id: &StopId) -> Option<f64> {
        self.left_of(id).map(|left| self.start_offset - left)
    }

    pub fn is_complete(&self) -> bool {
        self.unmeasured.is_empty()
    }
}

/// Compute stop positions.
pub fn compute_layout(route: &Route, widths: &LabelWidths, config: &LayoutConfig) -> Layout {
    let mut slots = Vec::with_capacity(route.len());
    let mut unmeasured = Vec::new();
    let mut issues = Vec::new();
    let mut left = config.start_offset;

    for stop in route.stops() {
        let width = match widths.get(&stop.id) {
            None => {
                unmeasured.push(stop.id.clone());
                0.0
            }
            Some(&w) if !w.is_finite() || w < 0.0 => {
                issues.push(LayoutError::InvalidWidth {
                    id: stop.id.clone(),
                    width: w,
                });
                0.0
            }
            Some(&w) => w,
        };
        slots.push(Slot {
            id: stop.id.clone(),
            left,
            width,
        });
        left += width + config.padding;
    }

    let line = progress_line(&slots, config.start_offset, &mut issues);
    let total_width = slots
        .last()
        .map_or(0.0, |last| last.left + last.width - config.start_offset);

    Layout {
        start_offset: config.start_offset,
        slots,
        line,
        total_width,
        unmeasured,
        issues,
    }
}

fn progress_line(slots: &[Slot], start_offset: f64, issues: &mut Vec<LayoutError>) -> ProgressLine {
    let (first, last) = match slots {
        [] => {
            issues.push(LayoutError::EmptyRoute);
            return ProgressLine {
                left: start_offset,
                length: 0.0,
            };
        }
        [only] => {
            issues.push(LayoutError::SingleStop);
            return ProgressLine {
                left: only.left,
                length: 0.0,
            };
        }
        [first, .., last] => (first, last),
    };

    let length = last.left - first.left;
    if length > 0.0 {
        return ProgressLine {
            left: first.left,
            length,
        };
    }
    if length < 0.0 || length.is_nan() {
        issues.push(LayoutError::InvertedLine {
            start: first.left,
            finish: last.left,
        });
    }
    ProgressLine {
        left: first.left,
        length: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::{LineMeta, Stop};

    fn route(ids: &[&str]) -> Route {
        Route::new(
            ids.iter().map(|id| Stop::new(*id, *id)).collect(),
            LineMeta::default(),
        )
        .unwrap()
    }

    fn widths(pairs: &[(&str, f64)]) -> LabelWidths {
        pairs.iter().map(|(id, w)| (StopId::new(id), *w)).collect()
    }

    #[test]
    fn test_worked_example() {
        let config = LayoutConfig {
            start_offset: 100.0,
            padding: 100.0,
        };
        let layout = compute_layout(
            &route(&["S1", "S2", "S3"]),
            &widths(&[("S1", 40.0), ("S2", 60.0), ("S3", 30.0)]),
            &config,
        );
        let lefts: Vec<f64> = layout.slots.iter().map(|s| s.left).collect();
        assert_eq!(lefts, [100.0, 240.0, 400.0]);
        assert_eq!(layout.line.left, 100.0);
        assert_eq!(layout.line.length, 300.0);
        assert_eq!(layout.total_width, 330.0);
        assert!(layout.is_complete());
        assert!(layout.issues.is_empty());
    }

    #[test]
    fn test_pure() {
        let r = route(&["A", "B", "C", "D"]);
        let w = widths(&[("A", 13.7), ("B", 0.1), ("C", 99.9), ("D", 42.42)]);
        let config = LayoutConfig::default();
        let a = compute_layout(&r, &w, &config);
        let b = compute_layout(&r, &w, &config);
        assert_eq!(a, b);
        for (x, y) in a.slots.iter().zip(&b.slots) {
            assert_eq!(x.left.to_bits(), y.left.to_bits());
        }
    }

    #[test]
    fn test_shift_for() {
        let layout = compute_layout(
            &route(&["S1", "S2", "S3"]),
            &widths(&[("S1", 40.0), ("S2", 60.0), ("S3", 30.0)]),
            &LayoutConfig::default(),
        );
        assert_eq!(layout.shift_for(&StopId::new("S1")), Some(0.0));
        assert_eq!(layout.shift_for(&StopId::new("S2")), Some(-90.0));
        assert_eq!(layout.shift_for(&StopId::new("S3")), Some(-200.0));
        assert_eq!(layout.shift_for(&StopId::new("S9")), None);
    }

    #[test]
    fn test_empty_route() {
        let layout = compute_layout(&route(&[]), &LabelWidths::default(), &LayoutConfig::default());
        assert!(layout.slots.is_empty());
        assert_eq!(layout.line.length, 0.0);
        assert_eq!(layout.total_width, 0.0);
        assert_eq!(layout.issues, [LayoutError::EmptyRoute]);
    }

    #[test]
    fn test_single_stop() {
        let layout = compute_layout(
            &route(&["S1"]),
            &widths(&[("S1", 80.0)]),
            &LayoutConfig::default(),
        );
        assert_eq!(layout.slots.len(), 1);
        assert_eq!(layout.line.length, 0.0);
        assert_eq!(layout.issues, [LayoutError::SingleStop]);
    }

    #[test]
    fn test_missing_and_invalid_widths() {
        let layout = compute_layout(
            &route(&["S1", "S2", "S3"]),
            &widths(&[("S1", f64::NAN), ("S3", -5.0)]),
            &LayoutConfig {
                start_offset: 0.0,
                padding: 10.0,
            },
        );
        let lefts: Vec<f64> = layout.slots.iter().map(|s| s.left).collect();
        assert_eq!(lefts, [0.0, 10.0, 20.0]);
        assert_eq!(layout.unmeasured, [StopId::new("S2")]);
        assert_eq!(layout.issues.len(), 2);
        assert!(!layout.line.length.is_nan());
    }

    #[test]
    fn test_zero_padding_zero_widths() {
        let layout = compute_layout(
            &route(&["S1", "S2"]),
            &widths(&[("S1", 0.0), ("S2", 0.0)]),
            &LayoutConfig {
                start_offset: 0.0,
                padding: 0.0,
            },
        );
        assert_eq!(layout.line.length, 0.0);
        assert!(layout.issues.is_empty());
    }
}
