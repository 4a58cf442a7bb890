//! Scenario tests driving the full step loop against the mock seams.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use agent_core::{
    ActionExecutor, AgentAction, AgentError, AgentOrchestrator, AgentSettings, IntentRegistry,
    ReasoningProvider, RunStatus, ScriptedProvider, StepDecision, TaskRequest,
};
use device_bridge::mock::{InMemoryFileSystem, MockDevice, MockScreenCapture, ScriptedUserChannel};
use device_bridge::{AgentFileSystem, RawScreen};
use perception_hub::PerceptionCoordinator;

const BUTTON_MARKUP: &str =
    r#"<node class="android.widget.Button" text="Send" clickable="true" bounds="[0,0][100,50]"/>"#;

fn decision(actions: Vec<AgentAction>) -> StepDecision {
    StepDecision {
        next_goal: "advance the task".to_string(),
        actions,
        ..Default::default()
    }
}

fn done_decision(success: bool, text: &str) -> StepDecision {
    decision(vec![AgentAction::Done {
        success,
        text: text.to_string(),
        attachments: Vec::new(),
    }])
}

struct Fixture {
    orchestrator: AgentOrchestrator,
    device: Arc<MockDevice>,
}

fn fixture(provider: Arc<dyn ReasoningProvider>, settings: AgentSettings) -> Fixture {
    fixture_with_files(provider, settings, InMemoryFileSystem::new())
}

fn fixture_with_files(
    provider: Arc<dyn ReasoningProvider>,
    settings: AgentSettings,
    files: InMemoryFileSystem,
) -> Fixture {
    let capture = MockScreenCapture::with_frame(RawScreen::new(BUTTON_MARKUP, 1080, 2400));
    capture.set_activity("com.example/.Main");

    let device = Arc::new(MockDevice::new());
    let files: Arc<dyn AgentFileSystem> = Arc::new(files);
    let executor = ActionExecutor::new(
        device.clone(),
        files.clone(),
        Arc::new(ScriptedUserChannel::new()),
        Arc::new(IntentRegistry::new()),
    );

    Fixture {
        orchestrator: AgentOrchestrator::new(
            settings,
            PerceptionCoordinator::new(Arc::new(capture)),
            provider,
            executor,
            files,
            Arc::new(IntentRegistry::new()),
        ),
        device,
    }
}

/// Provider wrapper that records every state message it receives.
struct RecordingProvider {
    inner: ScriptedProvider,
    messages: Mutex<Vec<String>>,
}

impl RecordingProvider {
    fn new(inner: ScriptedProvider) -> Self {
        Self {
            inner,
            messages: Mutex::new(Vec::new()),
        }
    }

    fn messages(&self) -> Vec<String> {
        self.messages.lock().expect("messages lock").clone()
    }
}

#[async_trait]
impl ReasoningProvider for RecordingProvider {
    async fn decide(
        &self,
        system_prompt: &str,
        state_message: &str,
    ) -> Result<StepDecision, AgentError> {
        self.messages
            .lock()
            .expect("messages lock")
            .push(state_message.to_string());
        self.inner.decide(system_prompt, state_message).await
    }
}

#[tokio::test]
async fn test_run_completes_when_model_reports_done() {
    let provider = ScriptedProvider::new();
    provider.push_decision(decision(vec![AgentAction::TapElement { element_id: 1 }]));
    provider.push_decision(done_decision(true, "message sent"));

    let f = fixture(Arc::new(provider), AgentSettings::minimal());
    let report = f.orchestrator.run(&TaskRequest::new("send the message")).await;

    assert_eq!(report.status, RunStatus::Completed);
    assert!(report.is_success());
    assert_eq!(report.message, "message sent");
    assert_eq!(report.steps_taken, 2);
    assert_eq!(report.history.len(), 2);
    assert_eq!(f.device.calls(), vec!["tap(50,25)"]);
}

#[tokio::test]
async fn test_failed_done_is_completed_but_unsuccessful() {
    let provider = ScriptedProvider::new();
    provider.push_decision(done_decision(false, "login required, cannot proceed"));

    let f = fixture(Arc::new(provider), AgentSettings::minimal());
    let report = f.orchestrator.run(&TaskRequest::new("check the mail")).await;

    assert_eq!(report.status, RunStatus::Completed);
    assert!(!report.is_success());
    assert!(report.message.contains("login required"));
}

#[tokio::test]
async fn test_abort_after_exactly_max_failures_with_no_actions() {
    let provider = Arc::new(ScriptedProvider::always_fail());
    let settings = AgentSettings::minimal().max_failures(3);

    let f = fixture(provider.clone(), settings);
    let report = f.orchestrator.run(&TaskRequest::new("doomed task")).await;

    assert_eq!(report.status, RunStatus::Aborted);
    assert!(!report.success);
    assert!(report.message.contains("3 consecutive reasoning failures"));
    // minimal() gives each reasoning phase a single attempt, so the
    // failure counter advances once per call.
    assert_eq!(provider.call_count(), 3);
    assert_eq!(f.device.call_count(), 0);
}

#[tokio::test]
async fn test_failure_counter_resets_after_successful_think() {
    let provider = Arc::new(ScriptedProvider::new());
    // One failure, then a decision, then another failure, then done.
    // With max_failures = 2 the run only survives if the counter resets
    // after each successful reasoning phase.
    provider.push_failure("hiccup one");
    provider.push_decision(decision(vec![AgentAction::PressHome]));
    provider.push_failure("hiccup two");
    provider.push_decision(done_decision(true, "finished"));

    let settings = AgentSettings::minimal().max_failures(2);
    let f = fixture(provider.clone(), settings);
    let report = f.orchestrator.run(&TaskRequest::new("resilient task")).await;

    assert_eq!(report.status, RunStatus::Completed);
    assert!(report.is_success());
    assert_eq!(provider.call_count(), 4);
}

#[tokio::test]
async fn test_max_steps_reached() {
    let provider = ScriptedProvider::new();
    for _ in 0..5 {
        provider.push_decision(decision(vec![AgentAction::PressHome]));
    }

    let f = fixture(Arc::new(provider), AgentSettings::minimal().max_steps(2));
    let report = f.orchestrator.run(&TaskRequest::new("endless task")).await;

    assert_eq!(report.status, RunStatus::MaxStepsReached);
    assert!(!report.success);
    assert_eq!(report.steps_taken, 2);
}

#[tokio::test]
async fn test_done_stops_remaining_actions_in_step() {
    let provider = ScriptedProvider::new();
    provider.push_decision(decision(vec![
        AgentAction::TapElement { element_id: 1 },
        AgentAction::Done {
            success: true,
            text: "all set".to_string(),
            attachments: Vec::new(),
        },
        AgentAction::TapElement { element_id: 1 },
    ]));

    let settings = AgentSettings::minimal().actions_per_step(3);
    let f = fixture(Arc::new(provider), settings);
    let report = f.orchestrator.run(&TaskRequest::new("quick task")).await;

    assert_eq!(report.status, RunStatus::Completed);
    // The tap after done never executes.
    assert_eq!(f.device.calls(), vec!["tap(50,25)"]);
}

#[tokio::test]
async fn test_surplus_actions_beyond_step_limit_are_dropped() {
    let provider = ScriptedProvider::new();
    provider.push_decision(decision(vec![
        AgentAction::PressHome,
        AgentAction::PressBack,
        AgentAction::PressHome,
    ]));
    provider.push_decision(done_decision(true, "done"));

    let settings = AgentSettings::minimal().actions_per_step(2);
    let f = fixture(Arc::new(provider), settings);
    let report = f.orchestrator.run(&TaskRequest::new("chatty task")).await;

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(f.device.calls(), vec!["press_home", "press_back"]);
}

#[tokio::test]
async fn test_stop_finalizes_without_stepping() {
    let provider = ScriptedProvider::new();
    provider.push_decision(done_decision(true, "never reached"));

    let f = fixture(Arc::new(provider), AgentSettings::minimal());
    f.orchestrator.handle().stop();
    let report = f.orchestrator.run(&TaskRequest::new("stopped task")).await;

    assert_eq!(report.status, RunStatus::Stopped);
    assert_eq!(report.steps_taken, 0);
    assert_eq!(f.device.call_count(), 0);
}

#[tokio::test]
async fn test_pause_blocks_progress_until_resumed() {
    let provider = ScriptedProvider::new();
    provider.push_decision(done_decision(true, "resumed and finished"));

    let f = fixture(Arc::new(provider), AgentSettings::minimal());
    let orchestrator = Arc::new(f.orchestrator);
    let handle = orchestrator.handle();

    handle.pause();
    let join = tokio::spawn({
        let orchestrator = orchestrator.clone();
        async move { orchestrator.run(&TaskRequest::new("paused task")).await }
    });

    tokio::time::sleep(std::time::Duration::from_millis(250)).await;
    assert_eq!(orchestrator.step_count().await, 0);

    handle.resume();
    let report = join.await.expect("run task");
    assert_eq!(report.status, RunStatus::Completed);
}

#[tokio::test]
async fn test_element_error_feeds_back_to_next_prompt() {
    let scripted = ScriptedProvider::new();
    scripted.push_decision(decision(vec![AgentAction::TapElement { element_id: 99 }]));
    scripted.push_decision(done_decision(false, "giving up"));
    let provider = Arc::new(RecordingProvider::new(scripted));

    let f = fixture(provider.clone(), AgentSettings::minimal());
    let report = f.orchestrator.run(&TaskRequest::new("tap something")).await;

    assert_eq!(report.status, RunStatus::Completed);
    let messages = provider.messages();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].contains("no steps executed yet"));
    assert!(messages[1].contains("element 99 not found"));
    assert_eq!(f.device.call_count(), 0);
}

#[tokio::test]
async fn test_read_file_content_appears_once_in_read_state() {
    let scripted = ScriptedProvider::new();
    scripted.push_decision(decision(vec![AgentAction::ReadFile {
        name: "notes.txt".to_string(),
    }]));
    scripted.push_decision(decision(vec![AgentAction::PressHome]));
    scripted.push_decision(done_decision(true, "done"));
    let provider = Arc::new(RecordingProvider::new(scripted));

    let files = InMemoryFileSystem::with_files(&[("notes.txt", "pick up milk")]);
    let f = fixture_with_files(provider.clone(), AgentSettings::minimal(), files);
    let report = f.orchestrator.run(&TaskRequest::new("read my notes")).await;

    assert_eq!(report.status, RunStatus::Completed);
    let messages = provider.messages();
    assert_eq!(messages.len(), 3);
    assert!(!messages[0].contains("<read_state>"));
    // Shown exactly once, on the step after the read.
    assert!(messages[1].contains("<read_state>"));
    assert!(messages[1].contains("pick up milk"));
    assert!(!messages[2].contains("<read_state>"));
}

#[tokio::test]
async fn test_history_retention_is_bounded() {
    let provider = ScriptedProvider::new();
    for _ in 0..4 {
        provider.push_decision(decision(vec![AgentAction::PressHome]));
    }
    provider.push_decision(done_decision(true, "done"));

    let settings = AgentSettings::minimal().history_items(2);
    let f = fixture(Arc::new(provider), settings);
    let report = f.orchestrator.run(&TaskRequest::new("long task")).await;

    assert_eq!(report.status, RunStatus::Completed);
    assert_eq!(report.steps_taken, 5);
    assert_eq!(report.history.len(), 2);
    assert_eq!(report.history[0].step_number, 4);
    assert_eq!(report.history[1].step_number, 5);
}
