//! Agent orchestrator: the sense, prompt, think, act, record loop.
//!
//! One run is one strictly sequential step loop. Perception fans out
//! inside SENSE, reasoning retries live inside THINK, and every
//! recoverable failure is folded into history instead of escalating.
//! Only the consecutive-failure budget ends a run early; pause and stop
//! requests take effect at step boundaries, never mid-action.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use device_bridge::AgentFileSystem;
use perception_hub::PerceptionCoordinator;
use screenpilot_core_types::RunId;

use crate::actions::{ActionResult, AgentAction, IntentRegistry};
use crate::config::AgentSettings;
use crate::executor::ActionExecutor;
use crate::llm::{decide_with_backoff, ReasoningProvider, RetryPolicy};
use crate::prompt::{build_state_message, build_system_prompt, StateMessageContext};
use crate::types::{RunReport, StepDecision, StepRecord, TaskRequest};

/// How often the pause gate re-checks its flags.
const PAUSE_POLL: Duration = Duration::from_millis(100);

/// External control surface for a running task.
///
/// Explicit flags on the run context, checked at step boundaries: pausing
/// blocks before the next SENSE, stopping finalizes the run at the next
/// boundary without interrupting an in-flight gesture.
#[derive(Debug, Default)]
pub struct RunHandle {
    paused: AtomicBool,
    stopped: AtomicBool,
}

impl RunHandle {
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Mutable state of one run; owned exclusively by the orchestrator.
#[derive(Debug, Default)]
struct RunState {
    step: u32,
    consecutive_failures: u32,
    history: Vec<StepRecord>,
    memory_notes: Vec<String>,
    /// Content of the most recent file read, surfaced to the prompt once.
    pending_read_state: Option<String>,
}

/// Drives the step loop binding perception, reasoning, and execution.
pub struct AgentOrchestrator {
    settings: AgentSettings,
    perception: PerceptionCoordinator,
    provider: Arc<dyn ReasoningProvider>,
    executor: ActionExecutor,
    files: Arc<dyn AgentFileSystem>,
    intents: Arc<IntentRegistry>,
    handle: Arc<RunHandle>,
    state: Mutex<RunState>,
}

impl AgentOrchestrator {
    pub fn new(
        settings: AgentSettings,
        perception: PerceptionCoordinator,
        provider: Arc<dyn ReasoningProvider>,
        executor: ActionExecutor,
        files: Arc<dyn AgentFileSystem>,
        intents: Arc<IntentRegistry>,
    ) -> Self {
        Self {
            settings,
            perception,
            provider,
            executor,
            files,
            intents,
            handle: Arc::new(RunHandle::default()),
            state: Mutex::new(RunState::default()),
        }
    }

    /// Control handle for pausing and stopping this orchestrator's runs.
    pub fn handle(&self) -> Arc<RunHandle> {
        self.handle.clone()
    }

    pub async fn step_count(&self) -> u32 {
        self.state.lock().await.step
    }

    pub async fn history(&self) -> Vec<StepRecord> {
        self.state.lock().await.history.clone()
    }

    /// Run one task to completion. Every outcome, including aborts and
    /// step-limit exhaustion, comes back as the same [`RunReport`] shape.
    pub async fn run(&self, task: &TaskRequest) -> RunReport {
        let run_id = RunId::new();
        let run_started = Instant::now();
        let started_at = Utc::now();

        {
            let mut state = self.state.lock().await;
            *state = RunState::default();
        }

        let system_prompt = build_system_prompt(&self.settings, &self.intents);
        info!(
            target: "orchestrator",
            run_id = %run_id,
            task_id = %task.id,
            "run started"
        );

        loop {
            // Pause gate, then stop check, both at the step boundary.
            while self.handle.is_paused() && !self.handle.is_stopped() {
                tokio::time::sleep(PAUSE_POLL).await;
            }
            if self.handle.is_stopped() {
                let state = self.state.lock().await;
                info!(target: "orchestrator", run_id = %run_id, "run stopped on request");
                return RunReport::stopped(
                    run_id,
                    state.step,
                    state.history.clone(),
                    elapsed_ms(run_started),
                );
            }

            {
                let state = self.state.lock().await;
                if state.step >= self.settings.max_steps {
                    return RunReport::max_steps_reached(
                        run_id,
                        state.step,
                        state.history.clone(),
                        elapsed_ms(run_started),
                    );
                }
            }

            let step_number = {
                let mut state = self.state.lock().await;
                state.step += 1;
                state.step
            };
            let step_started = Instant::now();
            let step_deadline = step_started + Duration::from_millis(self.settings.step_timeout_ms);
            debug!(target: "orchestrator", step = step_number, "step started");

            // SENSE: perception never fails, the worst case is an empty
            // screen sentinel.
            let screen = self.perception.analyze().await;

            // PROMPT: build the state message, consuming any pending read
            // content so it is shown exactly once.
            let fs_description = self.files.describe().await;
            let todo_contents = self.files.todo_contents().await;
            let available_paths = self.files.available_paths().await;
            let state_message = {
                let mut state = self.state.lock().await;
                let read_state = state.pending_read_state.take();
                let ctx = StateMessageContext {
                    task,
                    history: &state.history,
                    memory_notes: &state.memory_notes,
                    screen: &screen,
                    fs_description: &fs_description,
                    todo_contents: &todo_contents,
                    available_paths: &available_paths,
                    step_number,
                    max_steps: self.settings.max_steps,
                    started_at,
                    read_state: read_state.as_deref(),
                };
                build_state_message(&ctx, self.settings.display_char_budget)
            };

            // THINK: bounded retries with backoff inside each attempt,
            // the failure counter across attempts, all within the step
            // budget.
            let decision = match self
                .think(&system_prompt, &state_message, step_deadline)
                .await
            {
                ThinkOutcome::Decision(decision) => decision,
                ThinkOutcome::StepExhausted => {
                    let duration = elapsed_ms(step_started);
                    let mut state = self.state.lock().await;
                    state.history.push(StepRecord::think_failure(
                        step_number,
                        screen,
                        "reasoning produced nothing within the step budget",
                        duration,
                    ));
                    trim_history(&mut state.history, self.settings.max_history_items);
                    continue;
                }
                ThinkOutcome::Abort { failures } => {
                    let duration = elapsed_ms(step_started);
                    let mut state = self.state.lock().await;
                    state.history.push(StepRecord::think_failure(
                        step_number,
                        screen,
                        format!("{failures} consecutive reasoning failures"),
                        duration,
                    ));
                    warn!(target: "orchestrator", run_id = %run_id, failures, "run aborted");
                    return RunReport::aborted(
                        run_id,
                        format!("Aborted after {failures} consecutive reasoning failures"),
                        state.step,
                        state.history.clone(),
                        elapsed_ms(run_started),
                    );
                }
            };

            // ACT: sequential execution, stopping at the first finishing
            // result.
            let max_actions = self.settings.max_actions_per_step as usize;
            if decision.actions.len() > max_actions {
                debug!(
                    target: "orchestrator",
                    proposed = decision.actions.len(),
                    max_actions,
                    "dropping surplus actions"
                );
            }

            let mut results: Vec<ActionResult> = Vec::new();
            let mut finishing: Option<ActionResult> = None;
            for action in decision.actions.iter().take(max_actions) {
                let result = self.executor.execute(action, &screen).await;
                self.absorb_result(action, &result).await;
                let is_done = result.is_done;
                results.push(result.clone());
                if is_done {
                    finishing = Some(result);
                    break;
                }
            }

            // RECORD: append the step and enforce retention.
            let duration = elapsed_ms(step_started);
            {
                let mut state = self.state.lock().await;
                state.history.push(StepRecord::new(
                    step_number,
                    decision.clone(),
                    results,
                    screen,
                    duration,
                ));
                trim_history(&mut state.history, self.settings.max_history_items);
            }

            if let Some(final_result) = finishing {
                let state = self.state.lock().await;
                info!(
                    target: "orchestrator",
                    run_id = %run_id,
                    success = final_result.success,
                    steps = state.step,
                    "run completed"
                );
                return RunReport::completed(
                    run_id,
                    final_result.success,
                    final_result
                        .extracted_content
                        .unwrap_or_else(|| "Task completed".to_string()),
                    final_result.attachments,
                    state.step,
                    state.history.clone(),
                    elapsed_ms(run_started),
                );
            }
        }
    }

    /// One THINK phase: repeat reasoning attempts (each with its own
    /// retry/backoff budget) until a decision lands, the failure budget is
    /// exhausted, or the step deadline passes.
    async fn think(
        &self,
        system_prompt: &str,
        state_message: &str,
        step_deadline: Instant,
    ) -> ThinkOutcome {
        let policy = RetryPolicy::from_settings(&self.settings);
        let retry_delay = Duration::from_millis(self.settings.retry_delay_ms);

        loop {
            let remaining = step_deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return ThinkOutcome::StepExhausted;
            }

            let attempt = tokio::time::timeout(
                remaining,
                decide_with_backoff(&*self.provider, system_prompt, state_message, &policy),
            )
            .await;

            match attempt {
                Ok(Some(decision)) => {
                    let mut state = self.state.lock().await;
                    state.consecutive_failures = 0;
                    return ThinkOutcome::Decision(decision);
                }
                Ok(None) | Err(_) => {
                    let failures = {
                        let mut state = self.state.lock().await;
                        state.consecutive_failures += 1;
                        state.consecutive_failures
                    };
                    if failures >= self.settings.max_failures {
                        return ThinkOutcome::Abort { failures };
                    }
                    tokio::time::sleep(retry_delay.min(
                        step_deadline.saturating_duration_since(Instant::now()),
                    ))
                    .await;
                }
            }
        }
    }

    /// Fold an action result into run state: memory notes accumulate, and
    /// freshly read file content is staged for the next prompt.
    async fn absorb_result(&self, action: &AgentAction, result: &ActionResult) {
        let mut state = self.state.lock().await;
        if let Some(note) = &result.long_term_memory {
            state.memory_notes.push(note.clone());
        }
        if matches!(action, AgentAction::ReadFile { .. }) && !result.failed() {
            state.pending_read_state = result.extracted_content.clone();
        }
    }
}

enum ThinkOutcome {
    Decision(StepDecision),
    /// The step budget ran out before the failure budget did.
    StepExhausted,
    Abort {
        failures: u32,
    },
}

fn trim_history(history: &mut Vec<StepRecord>, max_items: Option<usize>) {
    if let Some(max) = max_items {
        while history.len() > max {
            history.remove(0);
        }
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_handle_flags() {
        let handle = RunHandle::default();
        assert!(!handle.is_paused());
        handle.pause();
        assert!(handle.is_paused());
        handle.resume();
        assert!(!handle.is_paused());
        handle.stop();
        assert!(handle.is_stopped());
    }

    #[test]
    fn test_trim_history() {
        let screen = perception_hub::ScreenState::default();
        let mut history: Vec<StepRecord> = (1..=5)
            .map(|i| StepRecord::think_failure(i, screen.clone(), "x", 0))
            .collect();

        trim_history(&mut history, Some(3));
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].step_number, 3);

        trim_history(&mut history, None);
        assert_eq!(history.len(), 3);
    }
}
