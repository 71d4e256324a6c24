//! `[layout]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [layout]
//! start_offset = 0.0    # Where the current stop sits after a shift
//! padding = 50.0        # Gap between neighbouring labels
//! glyph_width = 14.0    # Width estimate per character
//! ```

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};
use crate::layout::LayoutConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSectionConfig {
    pub start_offset: f64,
    pub padding: f64,

    /// Used by the bundled renderers to estimate label widths.
    pub glyph_width: f64,
}

impl Default for LayoutSectionConfig {
    fn default() -> Self {
        let engine = LayoutConfig::default();
        Self {
            start_offset: engine.start_offset,
            padding: engine.padding,
            glyph_width: 14.0,
        }
    }
}

impl LayoutSectionConfig {
    const START_OFFSET: FieldPath = FieldPath::new("layout.start_offset");
    const PADDING: FieldPath = FieldPath::new("layout.padding");
    const GLYPH_WIDTH: FieldPath = FieldPath::new("layout.glyph_width");

    pub fn engine(&self) -> LayoutConfig {
        LayoutConfig {
            start_offset: self.start_offset,
            padding: self.padding,
        }
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if !self.start_offset.is_finite() {
            diag.error(Self::START_OFFSET, "must be a finite number");
        }
        for (field, value) in [(Self::PADDING, self.padding), (Self::GLYPH_WIDTH, self.glyph_width)] {
            if !value.is_finite() || value < 0.0 {
                diag.error(field, format!("must be a non-negative number, got {value}"));
            }
        }
    }
}
