//! Run-level data types: task requests, step decisions, history, reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use perception_hub::ScreenState;
use screenpilot_core_types::{RunId, TaskId};

use crate::actions::{ActionResult, AgentAction};

/// One natural-language task handed to the agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRequest {
    pub id: TaskId,
    pub goal: String,

    /// Reminder injected into the agent state block when the task touches
    /// data the model should handle carefully.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sensitive_note: Option<String>,
}

impl TaskRequest {
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            id: TaskId::new(),
            goal: goal.into(),
            sensitive_note: None,
        }
    }

    pub fn with_sensitive_note(mut self, note: impl Into<String>) -> Self {
        self.sensitive_note = Some(note.into());
        self
    }
}

/// Structured output of one reasoning call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepDecision {
    /// Model reasoning about the current situation.
    #[serde(default)]
    pub thinking: String,

    /// Assessment of whether the previous goal was achieved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation_previous_goal: Option<String>,

    /// Facts the model wants carried forward.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,

    /// Immediate objective for this step.
    #[serde(default)]
    pub next_goal: String,

    /// Actions to execute, in order.
    #[serde(default)]
    pub actions: Vec<AgentAction>,
}

impl StepDecision {
    pub fn is_done(&self) -> bool {
        self.actions.iter().any(AgentAction::is_done)
    }
}

/// Record of one completed (or failed) step. Append-only; retention is
/// bounded by the history setting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    /// 1-based step number.
    pub step_number: u32,

    /// The model decision, absent when the reasoning phase failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision: Option<StepDecision>,

    /// Results of the executed actions, in order.
    pub results: Vec<ActionResult>,

    /// Screen state the step acted on.
    pub screen: ScreenState,

    /// Failure note for steps whose reasoning phase produced nothing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub duration_ms: u64,
    pub at: DateTime<Utc>,
}

impl StepRecord {
    pub fn new(
        step_number: u32,
        decision: StepDecision,
        results: Vec<ActionResult>,
        screen: ScreenState,
        duration_ms: u64,
    ) -> Self {
        Self {
            step_number,
            decision: Some(decision),
            results,
            screen,
            error: None,
            duration_ms,
            at: Utc::now(),
        }
    }

    /// Record for a step whose reasoning phase failed entirely.
    pub fn think_failure(
        step_number: u32,
        screen: ScreenState,
        error: impl Into<String>,
        duration_ms: u64,
    ) -> Self {
        Self {
            step_number,
            decision: None,
            results: Vec::new(),
            screen,
            error: Some(error.into()),
            duration_ms,
            at: Utc::now(),
        }
    }
}

/// Final status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The model reported the task done (successfully or not).
    Completed,
    /// An external stop request finalized the run at a step boundary.
    Stopped,
    /// Consecutive reasoning failures exhausted the failure budget.
    Aborted,
    /// The step limit was reached without completion.
    MaxStepsReached,
}

/// Outcome of one task run. Aborted and timed-out runs share this shape
/// with successful ones so callers never special-case failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub status: RunStatus,

    /// Task-level success as reported by the final done action; always
    /// false for non-completed statuses.
    pub success: bool,

    /// Final text for the user: the done message or an explanation of why
    /// the run ended early.
    pub message: String,

    /// File names attached by the final done action.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,

    pub steps_taken: u32,
    pub total_time_ms: u64,
    pub history: Vec<StepRecord>,
}

impl RunReport {
    pub fn completed(
        run_id: RunId,
        success: bool,
        message: String,
        attachments: Vec<String>,
        steps_taken: u32,
        history: Vec<StepRecord>,
        total_time_ms: u64,
    ) -> Self {
        Self {
            run_id,
            status: RunStatus::Completed,
            success,
            message,
            attachments,
            steps_taken,
            total_time_ms,
            history,
        }
    }

    pub fn stopped(
        run_id: RunId,
        steps_taken: u32,
        history: Vec<StepRecord>,
        total_time_ms: u64,
    ) -> Self {
        Self {
            run_id,
            status: RunStatus::Stopped,
            success: false,
            message: "Run stopped on request".to_string(),
            attachments: Vec::new(),
            steps_taken,
            total_time_ms,
            history,
        }
    }

    pub fn aborted(
        run_id: RunId,
        reason: String,
        steps_taken: u32,
        history: Vec<StepRecord>,
        total_time_ms: u64,
    ) -> Self {
        Self {
            run_id,
            status: RunStatus::Aborted,
            success: false,
            message: reason,
            attachments: Vec::new(),
            steps_taken,
            total_time_ms,
            history,
        }
    }

    pub fn max_steps_reached(
        run_id: RunId,
        steps_taken: u32,
        history: Vec<StepRecord>,
        total_time_ms: u64,
    ) -> Self {
        Self {
            run_id,
            status: RunStatus::MaxStepsReached,
            success: false,
            message: format!("Reached the step limit of {steps_taken} without finishing"),
            attachments: Vec::new(),
            steps_taken,
            total_time_ms,
            history,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success && self.status == RunStatus::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_constructors() {
        let done = RunReport::completed(
            RunId::new(),
            true,
            "ordered the pizza".to_string(),
            Vec::new(),
            4,
            Vec::new(),
            1200,
        );
        assert!(done.is_success());

        let failed_done = RunReport::completed(
            RunId::new(),
            false,
            "login required".to_string(),
            Vec::new(),
            2,
            Vec::new(),
            800,
        );
        assert!(!failed_done.is_success());
        assert_eq!(failed_done.status, RunStatus::Completed);

        let aborted = RunReport::aborted(
            RunId::new(),
            "3 consecutive reasoning failures".to_string(),
            1,
            Vec::new(),
            500,
        );
        assert!(!aborted.is_success());
    }

    #[test]
    fn test_decision_is_done() {
        let mut decision = StepDecision::default();
        assert!(!decision.is_done());
        decision.actions.push(AgentAction::Done {
            success: true,
            text: "ok".to_string(),
            attachments: Vec::new(),
        });
        assert!(decision.is_done());
    }
}
