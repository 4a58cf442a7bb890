//! Perception coordinator: capture, parse, annotate.

use std::sync::Arc;

use tracing::warn;

use device_bridge::{RawScreen, ScreenCapture};
use screen_parser::ScreenParser;

use crate::models::{ScreenState, UNKNOWN_ACTIVITY};

/// Runs the three capture fetches concurrently, parses the markup, and
/// decorates the display with scroll affordance markers.
///
/// Failed fetches are substituted with sentinels rather than propagated;
/// deadline discipline belongs to the orchestrator, not here.
pub struct PerceptionCoordinator {
    capture: Arc<dyn ScreenCapture>,
    parser: ScreenParser,
}

impl PerceptionCoordinator {
    pub fn new(capture: Arc<dyn ScreenCapture>) -> Self {
        Self {
            capture,
            parser: ScreenParser::new(),
        }
    }

    pub fn with_parser(capture: Arc<dyn ScreenCapture>, parser: ScreenParser) -> Self {
        Self { capture, parser }
    }

    /// Produce a fresh [`ScreenState`]. Never fails; the worst capture
    /// outcome is an empty screen with an unknown activity.
    pub async fn analyze(&self) -> ScreenState {
        let (raw, keyboard, activity) = tokio::join!(
            self.capture.raw_screen(),
            self.capture.keyboard_visible(),
            self.capture.foreground_activity(),
        );

        let raw = raw.unwrap_or_else(|err| {
            warn!(target: "perception", error = %err, "screen capture failed, using empty snapshot");
            RawScreen::default()
        });
        let keyboard_open = keyboard.unwrap_or_else(|err| {
            warn!(target: "perception", error = %err, "keyboard probe failed, assuming closed");
            false
        });
        let activity = activity.unwrap_or_else(|err| {
            warn!(target: "perception", error = %err, "activity probe failed");
            UNKNOWN_ACTIVITY.to_string()
        });

        let parsed = self.parser.parse(&raw.markup, raw.width, raw.height);
        let display = annotate_scroll_extents(&parsed.display, raw.pixels_above, raw.pixels_below);

        ScreenState {
            display,
            keyboard_open,
            activity,
            lookup: parsed.lookup,
            pixels_above: raw.pixels_above,
            pixels_below: raw.pixels_below,
        }
    }
}

/// Wrap the element listing with markers telling the model whether there
/// is more content beyond the viewport.
fn annotate_scroll_extents(body: &str, pixels_above: i32, pixels_below: i32) -> String {
    let above = if pixels_above > 0 {
        format!("... {} pixels above, scroll up to see more ...", pixels_above)
    } else {
        "... start of page ...".to_string()
    };
    let below = if pixels_below > 0 {
        format!("... {} pixels below, scroll down to see more ...", pixels_below)
    } else {
        "... end of page ...".to_string()
    };
    format!("{above}\n{body}\n{below}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use device_bridge::mock::MockScreenCapture;
    use screen_parser::EMPTY_SCREEN_NOTICE;

    fn button_markup() -> &'static str {
        r#"<node class="android.widget.Button" text="OK" clickable="true" bounds="[0,0][200,100]"/>"#
    }

    #[tokio::test]
    async fn test_analyze_produces_screen_state() {
        let capture = MockScreenCapture::new();
        capture.push_frame(RawScreen::new(button_markup(), 1080, 2400));
        capture.set_activity("com.example/.MainActivity");
        capture.set_keyboard_visible(true);

        let coordinator = PerceptionCoordinator::new(Arc::new(capture));
        let state = coordinator.analyze().await;

        assert_eq!(state.element_count(), 1);
        assert!(state.keyboard_open);
        assert_eq!(state.activity, "com.example/.MainActivity");
        assert!(state.display.contains("[1]<Button> OK"));
    }

    #[tokio::test]
    async fn test_scroll_markers() {
        let capture = MockScreenCapture::new();
        capture.push_frame(
            RawScreen::new(button_markup(), 1080, 2400).with_scroll_extents(300, 0),
        );

        let coordinator = PerceptionCoordinator::new(Arc::new(capture));
        let state = coordinator.analyze().await;

        assert!(state.display.starts_with("... 300 pixels above"));
        assert!(state.display.ends_with("... end of page ..."));
    }

    #[tokio::test]
    async fn test_failed_capture_becomes_sentinel_state() {
        let capture = MockScreenCapture::new();
        capture.set_fail_captures(true);

        let coordinator = PerceptionCoordinator::new(Arc::new(capture));
        let state = coordinator.analyze().await;

        assert_eq!(state.element_count(), 0);
        assert_eq!(state.activity, UNKNOWN_ACTIVITY);
        assert!(!state.keyboard_open);
        assert!(state.display.contains(EMPTY_SCREEN_NOTICE));
    }
}
