//! Perceived screen state handed to the orchestrator.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use screen_parser::ElementRecord;

/// Activity name substituted when the capture layer cannot tell us.
pub const UNKNOWN_ACTIVITY: &str = "unknown";

/// Immutable snapshot of the screen for one step. Created once per
/// perception cycle and superseded by the next one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScreenState {
    /// Labeled element listing with scroll markers, ready for the prompt.
    pub display: String,

    /// Whether the soft keyboard was visible at capture time.
    pub keyboard_open: bool,

    /// Foreground activity identity.
    pub activity: String,

    /// Lookup from surfaced element id to its record.
    pub lookup: HashMap<u32, ElementRecord>,

    /// Scrollable content above the viewport, in pixels.
    pub pixels_above: i32,

    /// Scrollable content below the viewport, in pixels.
    pub pixels_below: i32,
}

impl ScreenState {
    pub fn element(&self, id: u32) -> Option<&ElementRecord> {
        self.lookup.get(&id)
    }

    pub fn element_count(&self) -> usize {
        self.lookup.len()
    }
}
