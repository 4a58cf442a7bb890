//! Trait seams to the host device.
//!
//! The agent core never talks to the platform directly; everything it
//! needs from the outside world arrives through the four traits in this
//! crate. Hosts implement them against their automation layer; tests and
//! offline development use the deterministic implementations in
//! [`mock`].

pub mod errors;
pub mod mock;
pub mod models;

use async_trait::async_trait;

pub use errors::BridgeError;
pub use models::{InstalledApp, IntentPayload, RawScreen};

/// Supplies raw UI snapshots and screen metadata.
#[async_trait]
pub trait ScreenCapture: Send + Sync {
    /// Capture the current hierarchy markup together with screen
    /// dimensions and scroll extents.
    async fn raw_screen(&self) -> Result<RawScreen, BridgeError>;

    /// Whether the soft keyboard is currently shown.
    async fn keyboard_visible(&self) -> Result<bool, BridgeError>;

    /// Identity of the foreground activity.
    async fn foreground_activity(&self) -> Result<String, BridgeError>;
}

/// Low-level gesture and navigation primitives.
#[async_trait]
pub trait DeviceAutomation: Send + Sync {
    async fn tap(&self, x: i32, y: i32) -> Result<(), BridgeError>;

    async fn long_press(&self, x: i32, y: i32) -> Result<(), BridgeError>;

    /// Inject text into the focused input field.
    async fn type_text(&self, text: &str) -> Result<(), BridgeError>;

    async fn scroll_up(&self, pixels: i32) -> Result<(), BridgeError>;

    async fn scroll_down(&self, pixels: i32) -> Result<(), BridgeError>;

    async fn press_back(&self) -> Result<(), BridgeError>;

    async fn press_home(&self) -> Result<(), BridgeError>;

    /// Launch an app by package name. `Ok(false)` means the platform
    /// refused the launch (distinct from a transport failure).
    async fn open_app(&self, package: &str) -> Result<bool, BridgeError>;

    /// Bring up the recent-apps switcher.
    async fn switch_app(&self) -> Result<(), BridgeError>;

    /// Fire a registered external capability.
    async fn launch_intent(&self, payload: &IntentPayload) -> Result<bool, BridgeError>;

    /// Applications currently installed, for name-based app matching.
    async fn installed_apps(&self) -> Result<Vec<InstalledApp>, BridgeError>;
}

/// Sandboxed file area the agent may read and write.
#[async_trait]
pub trait AgentFileSystem: Send + Sync {
    async fn read_file(&self, name: &str) -> Result<String, BridgeError>;

    async fn write_file(&self, name: &str, content: &str) -> Result<(), BridgeError>;

    async fn append_file(&self, name: &str, content: &str) -> Result<(), BridgeError>;

    /// Short human-readable summary of the file area.
    async fn describe(&self) -> String;

    /// Current contents of the todo scratchpad.
    async fn todo_contents(&self) -> String;

    /// File names currently available for reading.
    async fn available_paths(&self) -> Vec<String>;
}

/// Channel to the person supervising the run. The concrete rendering
/// (speech, notification, dialog) is the host's concern.
#[async_trait]
pub trait UserChannel: Send + Sync {
    /// Say something to the user without waiting.
    async fn speak(&self, text: &str) -> Result<(), BridgeError>;

    /// Ask a question and wait for an answer; `None` when the user
    /// dismissed the prompt.
    async fn ask(&self, question: &str) -> Result<Option<String>, BridgeError>;
}
