//! `[animation]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [animation]
//! shift_ms = 500        # Progress bar slide
//! highlight_ms = 300    # Current-stop label fade
//! frame_ms = 16         # Tick interval while animating
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub shift_ms: u64,
    pub highlight_ms: u64,
    pub frame_ms: u64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            shift_ms: 500,
            highlight_ms: 300,
            frame_ms: 16,
        }
    }
}

impl AnimationConfig {
    const FRAME: FieldPath = FieldPath::new("animation.frame_ms");

    pub fn shift(&self) -> Duration {
        Duration::from_millis(self.shift_ms)
    }

    pub fn highlight(&self) -> Duration {
        Duration::from_millis(self.highlight_ms)
    }

    pub fn frame(&self) -> Duration {
        Duration::from_millis(self.frame_ms)
    }

    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        if self.frame_ms == 0 {
            diag.error(Self::FRAME, "must be at least 1");
        }
    }
}
