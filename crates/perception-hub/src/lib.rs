//! Perception layer binding screen capture to the semantic parser.
//!
//! One [`PerceptionCoordinator::analyze`] call fans out the three capture
//! fetches concurrently, joins them, and returns an immutable
//! [`ScreenState`] for the current step.

pub mod hub;
pub mod models;

pub use hub::PerceptionCoordinator;
pub use models::{ScreenState, UNKNOWN_ACTIVITY};
