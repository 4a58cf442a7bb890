//! Type-safe action protocol between the reasoning model and the device.
//!
//! The vocabulary is closed: every action the model may request is a
//! variant of [`AgentAction`], and the static registry in [`registry`] is
//! the single source of truth consumed both by the prompt catalog and by
//! the deserializer, so the advertised and accepted sets cannot drift.

pub mod intents;
pub mod registry;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::AgentError;

pub use intents::{IntentRegistry, IntentSpec};
pub use registry::{parse_action, parse_actions, render_catalog, ActionSpec, ParamKind, ParamSpec};

/// One executable agent action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentAction {
    /// Tap the center of a surfaced element.
    TapElement { element_id: u32 },
    /// Long-press the center of a surfaced element.
    LongPressElement { element_id: u32 },
    /// Type into the currently focused input field.
    InputText { text: String },
    /// Tap an element, type into it, optionally submit.
    TapAndInput {
        element_id: u32,
        text: String,
        submit: bool,
    },
    ScrollUp { pixels: Option<i32> },
    ScrollDown { pixels: Option<i32> },
    /// Open an installed application by its launcher name.
    OpenApp { name: String },
    SwitchApp,
    PressBack,
    PressHome,
    Wait { seconds: u32 },
    /// Say something to the user without blocking.
    Speak { text: String },
    /// Ask the user a question and wait for the answer.
    AskUser { question: String },
    ReadFile { name: String },
    WriteFile { name: String, content: String },
    AppendFile { name: String, content: String },
    /// Launch a registered external capability by name.
    LaunchIntent {
        name: String,
        params: HashMap<String, String>,
    },
    /// Finish the run and report the outcome.
    Done {
        success: bool,
        text: String,
        attachments: Vec<String>,
    },
}

impl AgentAction {
    /// Wire name, identical to the registry entry.
    pub fn name(&self) -> &'static str {
        match self {
            Self::TapElement { .. } => "tap_element",
            Self::LongPressElement { .. } => "long_press_element",
            Self::InputText { .. } => "input_text",
            Self::TapAndInput { .. } => "tap_and_input",
            Self::ScrollUp { .. } => "scroll_up",
            Self::ScrollDown { .. } => "scroll_down",
            Self::OpenApp { .. } => "open_app",
            Self::SwitchApp => "switch_app",
            Self::PressBack => "press_back",
            Self::PressHome => "press_home",
            Self::Wait { .. } => "wait",
            Self::Speak { .. } => "speak",
            Self::AskUser { .. } => "ask_user",
            Self::ReadFile { .. } => "read_file",
            Self::WriteFile { .. } => "write_file",
            Self::AppendFile { .. } => "append_file",
            Self::LaunchIntent { .. } => "launch_intent",
            Self::Done { .. } => "done",
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }
}

/// Outcome of executing one action.
///
/// `success` is meaningful only on a finishing result; the constructors
/// below keep the invariant that `success` implies `is_done`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionResult {
    /// Whether this result finalizes the task.
    pub is_done: bool,

    /// Task-level success, only meaningful when `is_done` is set.
    pub success: bool,

    /// Structured description of what went wrong, fed back to the model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Note the agent wants to remember for the rest of the run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_term_memory: Option<String>,

    /// Content surfaced by the action (file contents, user answers).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_content: Option<String>,

    /// File names attached to a finishing result.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
}

impl ActionResult {
    /// Plain success for a non-finishing action.
    pub fn ok() -> Self {
        Self::default()
    }

    /// Success carrying content for the model.
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            extracted_content: Some(content.into()),
            ..Self::default()
        }
    }

    /// Recoverable failure described for the model.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            ..Self::default()
        }
    }

    /// Finishing result.
    pub fn done(success: bool, text: impl Into<String>) -> Self {
        Self {
            is_done: true,
            success,
            extracted_content: Some(text.into()),
            ..Self::default()
        }
    }

    /// Checked constructor enforcing the success-implies-done invariant.
    pub fn try_new(is_done: bool, success: bool) -> Result<Self, AgentError> {
        if success && !is_done {
            return Err(AgentError::protocol(
                "success=true requires is_done=true on an action result",
            ));
        }
        Ok(Self {
            is_done,
            success,
            ..Self::default()
        })
    }

    pub fn with_memory(mut self, note: impl Into<String>) -> Self {
        self.long_term_memory = Some(note.into());
        self
    }

    pub fn with_attachments(mut self, attachments: Vec<String>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}
