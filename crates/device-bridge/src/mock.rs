//! Deterministic in-memory implementations of the device seams.
//!
//! Used by the scenario tests and by the CLI's offline mode. Scripted
//! captures play back a queue of frames; the automation mock records every
//! primitive it is asked to perform so tests can assert on the exact
//! device interaction sequence.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::errors::BridgeError;
use crate::models::{InstalledApp, IntentPayload, RawScreen};
use crate::{AgentFileSystem, DeviceAutomation, ScreenCapture, UserChannel};

/// Screen capture that plays back scripted frames.
///
/// The queue advances one frame per capture; the final frame repeats once
/// the queue is exhausted. With `fail_captures` set, every fetch errors,
/// which exercises the sentinel substitution path downstream.
#[derive(Debug, Default)]
pub struct MockScreenCapture {
    frames: Mutex<VecDeque<RawScreen>>,
    last: Mutex<Option<RawScreen>>,
    keyboard: AtomicBool,
    activity: Mutex<String>,
    fail_captures: AtomicBool,
}

impl MockScreenCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_frame(frame: RawScreen) -> Self {
        let mock = Self::new();
        mock.push_frame(frame);
        mock
    }

    pub fn push_frame(&self, frame: RawScreen) {
        self.frames.lock().expect("frames lock").push_back(frame);
    }

    pub fn set_keyboard_visible(&self, visible: bool) {
        self.keyboard.store(visible, Ordering::SeqCst);
    }

    pub fn set_activity(&self, activity: impl Into<String>) {
        *self.activity.lock().expect("activity lock") = activity.into();
    }

    pub fn set_fail_captures(&self, fail: bool) {
        self.fail_captures.store(fail, Ordering::SeqCst);
    }

    fn failing(&self) -> bool {
        self.fail_captures.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScreenCapture for MockScreenCapture {
    async fn raw_screen(&self) -> Result<RawScreen, BridgeError> {
        if self.failing() {
            return Err(BridgeError::capture("scripted capture failure"));
        }
        let mut frames = self.frames.lock().expect("frames lock");
        if let Some(frame) = frames.pop_front() {
            *self.last.lock().expect("last lock") = Some(frame.clone());
            return Ok(frame);
        }
        self.last
            .lock()
            .expect("last lock")
            .clone()
            .ok_or_else(|| BridgeError::capture("no scripted frames"))
    }

    async fn keyboard_visible(&self) -> Result<bool, BridgeError> {
        if self.failing() {
            return Err(BridgeError::capture("scripted capture failure"));
        }
        Ok(self.keyboard.load(Ordering::SeqCst))
    }

    async fn foreground_activity(&self) -> Result<String, BridgeError> {
        if self.failing() {
            return Err(BridgeError::capture("scripted capture failure"));
        }
        Ok(self.activity.lock().expect("activity lock").clone())
    }
}

/// Automation layer that records every primitive invocation.
#[derive(Debug, Default)]
pub struct MockDevice {
    calls: Mutex<Vec<String>>,
    apps: Mutex<Vec<InstalledApp>>,
    refuse_launches: AtomicBool,
    refuse_intents: AtomicBool,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_apps(apps: Vec<InstalledApp>) -> Self {
        let device = Self::new();
        *device.apps.lock().expect("apps lock") = apps;
        device
    }

    /// Every primitive recorded so far, in invocation order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("calls lock").len()
    }

    /// Make `open_app` report a platform refusal.
    pub fn set_refuse_launches(&self, refuse: bool) {
        self.refuse_launches.store(refuse, Ordering::SeqCst);
    }

    /// Make `launch_intent` report a platform refusal.
    pub fn set_refuse_intents(&self, refuse: bool) {
        self.refuse_intents.store(refuse, Ordering::SeqCst);
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

#[async_trait]
impl DeviceAutomation for MockDevice {
    async fn tap(&self, x: i32, y: i32) -> Result<(), BridgeError> {
        self.record(format!("tap({x},{y})"));
        Ok(())
    }

    async fn long_press(&self, x: i32, y: i32) -> Result<(), BridgeError> {
        self.record(format!("long_press({x},{y})"));
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<(), BridgeError> {
        self.record(format!("type_text({text})"));
        Ok(())
    }

    async fn scroll_up(&self, pixels: i32) -> Result<(), BridgeError> {
        self.record(format!("scroll_up({pixels})"));
        Ok(())
    }

    async fn scroll_down(&self, pixels: i32) -> Result<(), BridgeError> {
        self.record(format!("scroll_down({pixels})"));
        Ok(())
    }

    async fn press_back(&self) -> Result<(), BridgeError> {
        self.record("press_back".to_string());
        Ok(())
    }

    async fn press_home(&self) -> Result<(), BridgeError> {
        self.record("press_home".to_string());
        Ok(())
    }

    async fn open_app(&self, package: &str) -> Result<bool, BridgeError> {
        self.record(format!("open_app({package})"));
        Ok(!self.refuse_launches.load(Ordering::SeqCst))
    }

    async fn switch_app(&self) -> Result<(), BridgeError> {
        self.record("switch_app".to_string());
        Ok(())
    }

    async fn launch_intent(&self, payload: &IntentPayload) -> Result<bool, BridgeError> {
        self.record(format!("launch_intent({})", payload.name));
        Ok(!self.refuse_intents.load(Ordering::SeqCst))
    }

    async fn installed_apps(&self) -> Result<Vec<InstalledApp>, BridgeError> {
        Ok(self.apps.lock().expect("apps lock").clone())
    }
}

/// File area backed by a plain map.
#[derive(Debug, Default)]
pub struct InMemoryFileSystem {
    files: Mutex<HashMap<String, String>>,
}

/// Name of the todo scratchpad file.
pub const TODO_FILE: &str = "todo.md";

impl InMemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files(entries: &[(&str, &str)]) -> Self {
        let fs = Self::new();
        {
            let mut files = fs.files.lock().expect("files lock");
            for (name, content) in entries {
                files.insert((*name).to_string(), (*content).to_string());
            }
        }
        fs
    }
}

#[async_trait]
impl AgentFileSystem for InMemoryFileSystem {
    async fn read_file(&self, name: &str) -> Result<String, BridgeError> {
        self.files
            .lock()
            .expect("files lock")
            .get(name)
            .cloned()
            .ok_or_else(|| BridgeError::file(format!("no such file: {name}")))
    }

    async fn write_file(&self, name: &str, content: &str) -> Result<(), BridgeError> {
        self.files
            .lock()
            .expect("files lock")
            .insert(name.to_string(), content.to_string());
        Ok(())
    }

    async fn append_file(&self, name: &str, content: &str) -> Result<(), BridgeError> {
        self.files
            .lock()
            .expect("files lock")
            .entry(name.to_string())
            .or_default()
            .push_str(content);
        Ok(())
    }

    async fn describe(&self) -> String {
        let files = self.files.lock().expect("files lock");
        if files.is_empty() {
            return "file area is empty".to_string();
        }
        let mut names: Vec<&String> = files.keys().collect();
        names.sort();
        format!(
            "{} file(s): {}",
            names.len(),
            names
                .iter()
                .map(|n| n.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }

    async fn todo_contents(&self) -> String {
        self.files
            .lock()
            .expect("files lock")
            .get(TODO_FILE)
            .cloned()
            .unwrap_or_default()
    }

    async fn available_paths(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .files
            .lock()
            .expect("files lock")
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

/// User channel with a scripted answer and a transcript of spoken lines.
#[derive(Debug, Default)]
pub struct ScriptedUserChannel {
    spoken: Mutex<Vec<String>>,
    answer: Mutex<Option<String>>,
}

impl ScriptedUserChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_answer(answer: impl Into<String>) -> Self {
        let channel = Self::new();
        *channel.answer.lock().expect("answer lock") = Some(answer.into());
        channel
    }

    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().expect("spoken lock").clone()
    }
}

#[async_trait]
impl UserChannel for ScriptedUserChannel {
    async fn speak(&self, text: &str) -> Result<(), BridgeError> {
        self.spoken.lock().expect("spoken lock").push(text.to_string());
        Ok(())
    }

    async fn ask(&self, _question: &str) -> Result<Option<String>, BridgeError> {
        Ok(self.answer.lock().expect("answer lock").clone())
    }
}
