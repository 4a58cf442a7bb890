//! Bounds string parsing for screen elements.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static BOUNDS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[(-?\d+),(-?\d+)\]\[(-?\d+),(-?\d+)\]$").expect("bounds pattern is valid")
});

/// Pixel rectangle of an element on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Bounds {
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Parse the `[l,t][r,b]` bounds syntax.
    ///
    /// Inverted rectangles are auto-corrected so that left <= right and
    /// top <= bottom. Any other syntax yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let caps = BOUNDS_RE.captures(raw.trim())?;
        let nums: Vec<i32> = (1..=4)
            .map(|i| caps.get(i).and_then(|m| m.as_str().parse().ok()))
            .collect::<Option<Vec<_>>>()?;

        Some(Self {
            left: nums[0].min(nums[2]),
            top: nums[1].min(nums[3]),
            right: nums[0].max(nums[2]),
            bottom: nums[1].max(nums[3]),
        })
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Center point, used as the tap target for element actions.
    pub fn center(&self) -> (i32, i32) {
        (
            self.left + self.width() / 2,
            self.top + self.height() / 2,
        )
    }

    /// True when the rectangle lies fully inside the screen and has a
    /// non-zero area.
    pub fn visible_within(&self, screen_width: i32, screen_height: i32) -> bool {
        self.left >= 0
            && self.top >= 0
            && self.right <= screen_width
            && self.bottom <= screen_height
            && self.width() > 0
            && self.height() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let b = Bounds::parse("[0,0][1080,2400]").unwrap();
        assert_eq!(b, Bounds::new(0, 0, 1080, 2400));
    }

    #[test]
    fn test_parse_negative_coordinates() {
        let b = Bounds::parse("[-10,-20][30,40]").unwrap();
        assert_eq!(b, Bounds::new(-10, -20, 30, 40));
    }

    #[test]
    fn test_parse_inverted_rectangle_is_corrected() {
        let b = Bounds::parse("[50,80][10,20]").unwrap();
        assert_eq!(b, Bounds::new(10, 20, 50, 80));
    }

    #[test]
    fn test_parse_rejects_other_syntax() {
        assert!(Bounds::parse("").is_none());
        assert!(Bounds::parse("[0,0]").is_none());
        assert!(Bounds::parse("0,0,10,10").is_none());
        assert!(Bounds::parse("[a,b][c,d]").is_none());
        assert!(Bounds::parse("[0,0][10,10] trailing").is_none());
    }

    #[test]
    fn test_center() {
        let b = Bounds::new(0, 0, 100, 50);
        assert_eq!(b.center(), (50, 25));
    }

    #[test]
    fn test_visible_within() {
        assert!(Bounds::new(0, 0, 100, 100).visible_within(1080, 2400));
        // Partially off screen.
        assert!(!Bounds::new(-1, 0, 100, 100).visible_within(1080, 2400));
        assert!(!Bounds::new(0, 0, 1081, 100).visible_within(1080, 2400));
        // Zero area.
        assert!(!Bounds::new(10, 10, 10, 50).visible_within(1080, 2400));
        assert!(!Bounds::new(10, 10, 50, 10).visible_within(1080, 2400));
    }
}
