//! Scripted device harness for offline runs.
//!
//! The CLI has no real device attached; these fixtures simulate a small
//! phone session (home screen, then a messaging app) so the loop can be
//! exercised end to end, either with the scripted reasoning provider
//! (`--mock`) or against a real reasoning endpoint.

use agent_core::{AgentAction, ScriptedProvider, StepDecision};
use device_bridge::mock::{InMemoryFileSystem, MockDevice, MockScreenCapture};
use device_bridge::{InstalledApp, RawScreen};

const HOME_MARKUP: &str = r#"
<node class="android.widget.FrameLayout" bounds="[0,0][1080,2400]">
  <node class="android.widget.TextView" text="Friday, August 6" bounds="[60,180][1020,260]"/>
  <node class="android.widget.ImageView" content-desc="Messages" clickable="true" bounds="[80,2000][280,2200]"/>
  <node class="android.widget.ImageView" content-desc="Clock" clickable="true" bounds="[440,2000][640,2200]"/>
  <node class="android.widget.ImageView" content-desc="Settings" clickable="true" bounds="[800,2000][1000,2200]"/>
</node>
"#;

const MESSAGES_MARKUP: &str = r#"
<node class="android.widget.FrameLayout" bounds="[0,0][1080,2400]">
  <node class="android.widget.TextView" text="Messages" bounds="[60,120][500,200]"/>
  <node class="android.widget.Button" clickable="true" bounds="[820,2140][1020,2320]">
    <node class="android.widget.TextView" text="Start chat" bounds="[840,2200][1000,2260]"/>
  </node>
  <node class="android.widget.LinearLayout" clickable="true" bounds="[0,300][1080,480]">
    <node class="android.widget.TextView" text="Alex" bounds="[40,320][400,380]"/>
    <node class="android.widget.TextView" text="See you tomorrow!" bounds="[40,390][800,450]"/>
  </node>
</node>
"#;

pub fn demo_capture() -> MockScreenCapture {
    let capture = MockScreenCapture::new();
    capture.push_frame(RawScreen::new(HOME_MARKUP, 1080, 2400));
    capture.push_frame(RawScreen::new(MESSAGES_MARKUP, 1080, 2400).with_scroll_extents(0, 600));
    capture.set_activity("com.android.launcher/.Home");
    capture
}

pub fn demo_device() -> MockDevice {
    MockDevice::with_apps(vec![
        InstalledApp::new("Messages", "com.android.messaging"),
        InstalledApp::new("Clock", "com.android.deskclock"),
        InstalledApp::new("Settings", "com.android.settings"),
    ])
}

pub fn demo_files() -> InMemoryFileSystem {
    InMemoryFileSystem::with_files(&[(
        "todo.md",
        "- reply to Alex\n- set an alarm for tomorrow\n",
    )])
}

/// Reasoning script matching the captured frames: open the messaging app,
/// then report completion.
pub fn demo_provider() -> ScriptedProvider {
    let provider = ScriptedProvider::new();
    provider.push_decision(StepDecision {
        thinking: "The home screen is showing; the Messages app is available.".to_string(),
        next_goal: "Open the Messages app".to_string(),
        actions: vec![AgentAction::OpenApp {
            name: "Messages".to_string(),
        }],
        ..Default::default()
    });
    provider.push_decision(StepDecision {
        thinking: "The Messages app is open and the conversation list is visible.".to_string(),
        evaluation_previous_goal: Some("Success".to_string()),
        next_goal: "Report completion".to_string(),
        actions: vec![AgentAction::Done {
            success: true,
            text: "Opened the Messages app; the conversation list is showing.".to_string(),
            attachments: Vec::new(),
        }],
        ..Default::default()
    });
    provider
}
