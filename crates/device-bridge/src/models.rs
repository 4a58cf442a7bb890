//! Data carried across the device seams.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// One raw capture of the current screen.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawScreen {
    /// Tree-structured markup snapshot of the on-screen hierarchy.
    pub markup: String,

    /// Scrollable content above the viewport, in pixels.
    pub pixels_above: i32,

    /// Scrollable content below the viewport, in pixels.
    pub pixels_below: i32,

    pub width: i32,
    pub height: i32,
}

impl RawScreen {
    pub fn new(markup: impl Into<String>, width: i32, height: i32) -> Self {
        Self {
            markup: markup.into(),
            pixels_above: 0,
            pixels_below: 0,
            width,
            height,
        }
    }

    pub fn with_scroll_extents(mut self, above: i32, below: i32) -> Self {
        self.pixels_above = above;
        self.pixels_below = below;
        self
    }
}

/// An application installed on the device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstalledApp {
    /// Human-facing launcher label.
    pub label: String,
    /// Package identifier used for launching.
    pub package: String,
}

impl InstalledApp {
    pub fn new(label: impl Into<String>, package: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            package: package.into(),
        }
    }
}

/// Payload handed to the host when launching an external capability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentPayload {
    /// Registered capability name.
    pub name: String,
    /// String extras built from the model-provided parameters.
    pub extras: HashMap<String, String>,
}
