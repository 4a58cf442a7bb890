//! Maps decided actions onto device primitives.
//!
//! Everything step-local and recoverable becomes a structured
//! [`ActionResult`] error that travels back to the model on the next
//! step; the executor itself never fails.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use device_bridge::{AgentFileSystem, BridgeError, DeviceAutomation, InstalledApp, UserChannel};
use perception_hub::ScreenState;
use screen_parser::ElementRecord;

use crate::actions::intents::IntentError;
use crate::actions::{ActionResult, AgentAction, IntentRegistry};

/// Scroll distance when the model does not specify one.
const DEFAULT_SCROLL_PIXELS: i32 = 800;

/// Executes one action against the device seams.
pub struct ActionExecutor {
    device: Arc<dyn DeviceAutomation>,
    files: Arc<dyn AgentFileSystem>,
    user: Arc<dyn UserChannel>,
    intents: Arc<IntentRegistry>,
}

impl ActionExecutor {
    pub fn new(
        device: Arc<dyn DeviceAutomation>,
        files: Arc<dyn AgentFileSystem>,
        user: Arc<dyn UserChannel>,
        intents: Arc<IntentRegistry>,
    ) -> Self {
        Self {
            device,
            files,
            user,
            intents,
        }
    }

    /// Execute `action` against the current screen. Never raises; failures
    /// come back as `ActionResult::error`.
    pub async fn execute(&self, action: &AgentAction, screen: &ScreenState) -> ActionResult {
        debug!(target: "executor", action = action.name(), "executing action");
        match action {
            AgentAction::TapElement { element_id } => {
                let record = match self.resolve(screen, *element_id) {
                    Ok(record) => record,
                    Err(result) => return result,
                };
                let (x, y) = record.center();
                self.automation(self.device.tap(x, y).await, format!("Tapped element {element_id}"))
            }
            AgentAction::LongPressElement { element_id } => {
                let record = match self.resolve(screen, *element_id) {
                    Ok(record) => record,
                    Err(result) => return result,
                };
                let (x, y) = record.center();
                self.automation(
                    self.device.long_press(x, y).await,
                    format!("Long-pressed element {element_id}"),
                )
            }
            AgentAction::InputText { text } => self.automation(
                self.device.type_text(text).await,
                format!("Typed {} characters", text.chars().count()),
            ),
            AgentAction::TapAndInput {
                element_id,
                text,
                submit,
            } => self.tap_and_input(screen, *element_id, text, *submit).await,
            AgentAction::ScrollUp { pixels } => {
                let distance = pixels.unwrap_or(DEFAULT_SCROLL_PIXELS);
                self.automation(
                    self.device.scroll_up(distance).await,
                    format!("Scrolled up {distance} pixels"),
                )
            }
            AgentAction::ScrollDown { pixels } => {
                let distance = pixels.unwrap_or(DEFAULT_SCROLL_PIXELS);
                self.automation(
                    self.device.scroll_down(distance).await,
                    format!("Scrolled down {distance} pixels"),
                )
            }
            AgentAction::OpenApp { name } => self.open_app(name).await,
            AgentAction::SwitchApp => {
                self.automation(self.device.switch_app().await, "Opened the app switcher".into())
            }
            AgentAction::PressBack => {
                self.automation(self.device.press_back().await, "Pressed back".into())
            }
            AgentAction::PressHome => {
                self.automation(self.device.press_home().await, "Went to the home screen".into())
            }
            AgentAction::Wait { seconds } => {
                tokio::time::sleep(Duration::from_secs(u64::from(*seconds))).await;
                ActionResult::with_content(format!("Waited {seconds} second(s)"))
            }
            AgentAction::Speak { text } => match self.user.speak(text).await {
                Ok(()) => ActionResult::with_content("Spoke to the user"),
                Err(err) => ActionResult::error(format!("could not speak: {err}")),
            },
            AgentAction::AskUser { question } => match self.user.ask(question).await {
                Ok(Some(answer)) => ActionResult::with_content(answer.clone())
                    .with_memory(format!("User answered: {answer}")),
                Ok(None) => ActionResult::error("user dismissed the question"),
                Err(err) => ActionResult::error(format!("could not ask the user: {err}")),
            },
            AgentAction::ReadFile { name } => match self.files.read_file(name).await {
                Ok(content) => ActionResult::with_content(content),
                Err(err) => ActionResult::error(format!("could not read {name}: {err}")),
            },
            AgentAction::WriteFile { name, content } => {
                match self.files.write_file(name, content).await {
                    Ok(()) => ActionResult::with_content(format!("Wrote {name}")),
                    Err(err) => ActionResult::error(format!("could not write {name}: {err}")),
                }
            }
            AgentAction::AppendFile { name, content } => {
                match self.files.append_file(name, content).await {
                    Ok(()) => ActionResult::with_content(format!("Appended to {name}")),
                    Err(err) => ActionResult::error(format!("could not append to {name}: {err}")),
                }
            }
            AgentAction::LaunchIntent { name, params } => self.launch_intent(name, params).await,
            AgentAction::Done {
                success,
                text,
                attachments,
            } => ActionResult::done(*success, text.clone()).with_attachments(attachments.clone()),
        }
    }

    /// Look up an element id in the current screen lookup.
    fn resolve<'a>(
        &self,
        screen: &'a ScreenState,
        element_id: u32,
    ) -> Result<&'a ElementRecord, ActionResult> {
        screen.element(element_id).ok_or_else(|| {
            ActionResult::error(format!(
                "element {element_id} not found on the current screen; only use ids from the latest listing"
            ))
        })
    }

    fn automation(&self, outcome: Result<(), BridgeError>, success_note: String) -> ActionResult {
        match outcome {
            Ok(()) => ActionResult::with_content(success_note),
            Err(err) => ActionResult::error(err.to_string()),
        }
    }

    async fn tap_and_input(
        &self,
        screen: &ScreenState,
        element_id: u32,
        text: &str,
        submit: bool,
    ) -> ActionResult {
        let record = match self.resolve(screen, element_id) {
            Ok(record) => record,
            Err(result) => return result,
        };
        let (x, y) = record.center();

        if let Err(err) = self.device.tap(x, y).await {
            return ActionResult::error(format!("tap before typing failed: {err}"));
        }
        if let Err(err) = self.device.type_text(text).await {
            return ActionResult::error(format!("typing failed: {err}"));
        }
        if submit {
            if let Err(err) = self.device.type_text("\n").await {
                return ActionResult::error(format!("submit failed: {err}"));
            }
        }
        ActionResult::with_content(format!(
            "Entered text into element {element_id}{}",
            if submit { " and submitted" } else { "" }
        ))
    }

    /// Exact case-insensitive label match first, then substring match.
    /// "not found" and "launch failed" stay distinct errors.
    async fn open_app(&self, name: &str) -> ActionResult {
        let apps = match self.device.installed_apps().await {
            Ok(apps) => apps,
            Err(err) => return ActionResult::error(format!("could not list apps: {err}")),
        };

        let needle = name.trim().to_lowercase();
        let matched: Option<&InstalledApp> = apps
            .iter()
            .find(|app| app.label.to_lowercase() == needle)
            .or_else(|| apps.iter().find(|app| app.label.to_lowercase().contains(&needle)));

        let Some(app) = matched else {
            return ActionResult::error(format!("app not found: {name}"));
        };

        match self.device.open_app(&app.package).await {
            Ok(true) => ActionResult::with_content(format!("Opened {}", app.label)),
            Ok(false) => ActionResult::error(format!("failed to launch {}", app.label)),
            Err(err) => ActionResult::error(format!("failed to launch {}: {err}", app.label)),
        }
    }

    async fn launch_intent(
        &self,
        name: &str,
        params: &std::collections::HashMap<String, String>,
    ) -> ActionResult {
        let payload = match self.intents.build_payload(name, params) {
            Ok(payload) => payload,
            Err(err @ IntentError::NotFound(_)) => return ActionResult::error(err.to_string()),
            Err(err @ IntentError::InvalidParams { .. }) => {
                return ActionResult::error(err.to_string())
            }
        };

        match self.device.launch_intent(&payload).await {
            Ok(true) => ActionResult::with_content(format!("Launched capability {name}")),
            Ok(false) => ActionResult::error(format!("capability launch failed: {name}")),
            Err(err) => ActionResult::error(format!("capability launch failed: {name}: {err}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use device_bridge::mock::{InMemoryFileSystem, MockDevice, ScriptedUserChannel};
    use device_bridge::InstalledApp;
    use screen_parser::Bounds;
    use std::collections::HashMap;

    use crate::actions::IntentSpec;

    fn record(left: i32, top: i32, right: i32, bottom: i32) -> ElementRecord {
        ElementRecord {
            resource_id: String::new(),
            text: "Send".to_string(),
            description: String::new(),
            class_name: "android.widget.Button".to_string(),
            bounds_raw: format!("[{left},{top}][{right},{bottom}]"),
            bounds: Bounds::new(left, top, right, bottom),
            clickable: true,
            long_clickable: false,
            password: false,
        }
    }

    fn screen_with_element(id: u32) -> ScreenState {
        let mut screen = ScreenState::default();
        screen.lookup.insert(id, record(0, 0, 100, 50));
        screen
    }

    struct Harness {
        device: Arc<MockDevice>,
        executor: ActionExecutor,
    }

    fn harness() -> Harness {
        harness_with(
            MockDevice::with_apps(vec![
                InstalledApp::new("Clock", "com.android.clock"),
                InstalledApp::new("Calendar", "com.android.calendar"),
            ]),
            IntentRegistry::new(),
        )
    }

    fn harness_with(device: MockDevice, intents: IntentRegistry) -> Harness {
        let device = Arc::new(device);
        Harness {
            device: device.clone(),
            executor: ActionExecutor::new(
                device,
                Arc::new(InMemoryFileSystem::new()),
                Arc::new(ScriptedUserChannel::with_answer("yes")),
                Arc::new(intents),
            ),
        }
    }

    #[tokio::test]
    async fn test_tap_resolves_center() {
        let h = harness();
        let screen = screen_with_element(1);
        let result = h
            .executor
            .execute(&AgentAction::TapElement { element_id: 1 }, &screen)
            .await;

        assert!(!result.failed());
        assert_eq!(h.device.calls(), vec!["tap(50,25)"]);
    }

    #[tokio::test]
    async fn test_missing_element_is_reported_not_thrown() {
        let h = harness();
        let screen = ScreenState::default();
        let result = h
            .executor
            .execute(&AgentAction::TapElement { element_id: 9 }, &screen)
            .await;

        assert!(result.failed());
        assert!(result.error.unwrap().contains("element 9 not found"));
        assert_eq!(h.device.call_count(), 0);
    }

    #[tokio::test]
    async fn test_tap_and_input_with_submit() {
        let h = harness();
        let screen = screen_with_element(2);
        let result = h
            .executor
            .execute(
                &AgentAction::TapAndInput {
                    element_id: 2,
                    text: "hello".to_string(),
                    submit: true,
                },
                &screen,
            )
            .await;

        assert!(!result.failed());
        assert_eq!(
            h.device.calls(),
            vec!["tap(50,25)", "type_text(hello)", "type_text(\n)"]
        );
    }

    #[tokio::test]
    async fn test_open_app_exact_match_beats_substring() {
        let device = MockDevice::with_apps(vec![
            InstalledApp::new("Maps Go", "com.maps.go"),
            InstalledApp::new("Maps", "com.maps"),
        ]);
        let h = harness_with(device, IntentRegistry::new());
        let result = h
            .executor
            .execute(
                &AgentAction::OpenApp {
                    name: "maps".to_string(),
                },
                &ScreenState::default(),
            )
            .await;

        assert!(!result.failed());
        assert_eq!(h.device.calls(), vec!["open_app(com.maps)"]);
    }

    #[tokio::test]
    async fn test_open_app_substring_match() {
        let h = harness();
        let result = h
            .executor
            .execute(
                &AgentAction::OpenApp {
                    name: "calend".to_string(),
                },
                &ScreenState::default(),
            )
            .await;
        assert!(!result.failed());
        assert_eq!(h.device.calls(), vec!["open_app(com.android.calendar)"]);
    }

    #[tokio::test]
    async fn test_open_app_not_found_vs_launch_failed() {
        let h = harness();
        let missing = h
            .executor
            .execute(
                &AgentAction::OpenApp {
                    name: "Spreadsheets".to_string(),
                },
                &ScreenState::default(),
            )
            .await;
        assert!(missing.error.unwrap().contains("app not found"));

        let device = MockDevice::with_apps(vec![InstalledApp::new("Clock", "com.android.clock")]);
        device.set_refuse_launches(true);
        let h = harness_with(device, IntentRegistry::new());
        let refused = h
            .executor
            .execute(
                &AgentAction::OpenApp {
                    name: "Clock".to_string(),
                },
                &ScreenState::default(),
            )
            .await;
        assert!(refused.error.unwrap().contains("failed to launch"));
    }

    #[tokio::test]
    async fn test_launch_intent_error_taxonomy() {
        let mut intents = IntentRegistry::new();
        intents.register(IntentSpec::new("set_alarm", "Set an alarm").with_param("hour", "Hour"));
        let h = harness_with(MockDevice::new(), intents);

        let not_found = h
            .executor
            .execute(
                &AgentAction::LaunchIntent {
                    name: "send_fax".to_string(),
                    params: HashMap::new(),
                },
                &ScreenState::default(),
            )
            .await;
        assert!(not_found.error.unwrap().contains("capability not found"));

        let invalid = h
            .executor
            .execute(
                &AgentAction::LaunchIntent {
                    name: "set_alarm".to_string(),
                    params: HashMap::new(),
                },
                &ScreenState::default(),
            )
            .await;
        assert!(invalid.error.unwrap().contains("invalid parameters"));

        let mut params = HashMap::new();
        params.insert("hour".to_string(), "7".to_string());
        let ok = h
            .executor
            .execute(
                &AgentAction::LaunchIntent {
                    name: "set_alarm".to_string(),
                    params,
                },
                &ScreenState::default(),
            )
            .await;
        assert!(!ok.failed());
    }

    #[tokio::test]
    async fn test_done_packages_result_without_device_calls() {
        let h = harness();
        let result = h
            .executor
            .execute(
                &AgentAction::Done {
                    success: true,
                    text: "alarm set for 07:00".to_string(),
                    attachments: vec!["log.md".to_string()],
                },
                &ScreenState::default(),
            )
            .await;

        assert!(result.is_done && result.success);
        assert_eq!(result.extracted_content.as_deref(), Some("alarm set for 07:00"));
        assert_eq!(result.attachments, vec!["log.md"]);
        assert_eq!(h.device.call_count(), 0);
    }

    #[tokio::test]
    async fn test_ask_user_surfaces_answer() {
        let h = harness();
        let result = h
            .executor
            .execute(
                &AgentAction::AskUser {
                    question: "Proceed?".to_string(),
                },
                &ScreenState::default(),
            )
            .await;
        assert_eq!(result.extracted_content.as_deref(), Some("yes"));
        assert!(result.long_term_memory.unwrap().contains("yes"));
    }
}
