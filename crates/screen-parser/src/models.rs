//! Output types produced by one parse call.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::bounds::Bounds;

/// Placeholder display text for screens where nothing could be surfaced.
pub const EMPTY_SCREEN_NOTICE: &str = "(empty screen, no interactive elements detected)";

/// One surfaced element, addressable by the numeric id shown to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementRecord {
    /// Resource identifier from the markup, empty when absent.
    pub resource_id: String,

    /// Element text after the merge pass folded descendant labels in.
    pub text: String,

    /// Accessibility description, empty when absent.
    pub description: String,

    /// Fully qualified widget class.
    pub class_name: String,

    /// Raw bounds string as captured, kept for diagnostics.
    pub bounds_raw: String,

    /// Parsed on-screen rectangle.
    pub bounds: Bounds,

    pub clickable: bool,
    pub long_clickable: bool,
    pub password: bool,
}

impl ElementRecord {
    /// Best human-readable label: text, then description, then resource id,
    /// then class.
    pub fn label(&self) -> &str {
        if !self.text.trim().is_empty() {
            &self.text
        } else if !self.description.trim().is_empty() {
            &self.description
        } else if !self.resource_id.trim().is_empty() {
            &self.resource_id
        } else {
            &self.class_name
        }
    }

    /// Center of the element rectangle, the tap target.
    pub fn center(&self) -> (i32, i32) {
        self.bounds.center()
    }
}

/// Result of parsing one markup snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedScreen {
    /// Compact labeled listing handed to the reasoning model.
    pub display: String,

    /// Lookup from surfaced element id (1-based) to its record.
    pub lookup: HashMap<u32, ElementRecord>,
}

impl ParsedScreen {
    pub fn element_count(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }
}
