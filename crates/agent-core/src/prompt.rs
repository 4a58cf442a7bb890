//! Prompt assembly for the reasoning model.
//!
//! Two messages make up the contract: a system message built once per run
//! (role, rules, action and capability catalogs) and a state message built
//! every step from history, agent state, device state, and any pending
//! read content. Block order and tag names are stable; the model is
//! prompted against exactly this shape.

use chrono::{DateTime, Utc};

use perception_hub::ScreenState;

use crate::actions::{registry, ActionResult, IntentRegistry};
use crate::config::AgentSettings;
use crate::types::{StepRecord, TaskRequest};

/// Base system prompt. `{action_catalog}` and `{intent_catalog}` are
/// substituted at build time.
const SYSTEM_PROMPT_TEMPLATE: &str = r#"You are an autonomous agent operating a mobile device on behalf of its user. You are given a task, and at each step you see the current screen as a list of numbered elements. Decide the next action(s), observe the result, and repeat until the task is finished.

## How you see the screen
Interactive and labeled elements are listed one per line:
  [12]<Button> Send (clickable)
Only elements with a numeric id can be targeted. Markers at the top and bottom of the listing tell you whether more content is reachable by scrolling.

## How you act
Respond with a single JSON object in exactly this shape:
{
  "thinking": "brief reasoning about the current state",
  "evaluation_previous_goal": "did the last step achieve its goal",
  "memory": "facts worth keeping for later steps",
  "next_goal": "what this step should achieve",
  "action": [{"action_name": {"param": "value"}}]
}

Propose at most a few actions per step; they run in order and the rest of the step is skipped once one of them finishes the task. Use exactly the action names and parameters listed below. When the task is finished (or impossible), use the done action with an honest success flag and a clear final message.

## Available actions
{action_catalog}

## Available device capabilities
{intent_catalog}

## Rules
- Element ids change whenever the screen changes; only use ids from the current listing.
- If something went wrong, the result of the failed action tells you why; adjust instead of repeating it.
- Prefer scrolling when the target is likely beyond the viewport.
- Keep memory short and factual.
"#;

/// Build the per-run system message.
///
/// Settings may replace the template wholesale or append extra
/// instructions after it; the catalogs are substituted in either case.
pub fn build_system_prompt(settings: &AgentSettings, intents: &IntentRegistry) -> String {
    let template = settings
        .system_prompt_override
        .as_deref()
        .unwrap_or(SYSTEM_PROMPT_TEMPLATE);

    let mut prompt = template
        .replace("{action_catalog}", &registry::render_catalog())
        .replace("{intent_catalog}", &intents.render_catalog());

    if let Some(extra) = &settings.system_prompt_append {
        prompt.push('\n');
        prompt.push_str(extra);
    }
    prompt
}

/// Everything the per-step state message is assembled from.
pub struct StateMessageContext<'a> {
    pub task: &'a TaskRequest,
    pub history: &'a [StepRecord],
    pub memory_notes: &'a [String],
    pub screen: &'a ScreenState,
    pub fs_description: &'a str,
    pub todo_contents: &'a str,
    pub available_paths: &'a [String],
    pub step_number: u32,
    pub max_steps: u32,
    pub started_at: DateTime<Utc>,
    /// Content of a just-read file; shown once, then dropped.
    pub read_state: Option<&'a str>,
}

/// Build the per-step state message: four blocks in fixed order.
pub fn build_state_message(ctx: &StateMessageContext<'_>, display_char_budget: usize) -> String {
    let mut message = String::new();

    // Block 1: history.
    message.push_str("<agent_history>\n");
    if ctx.history.is_empty() {
        message.push_str("System note: agent initialized, no steps executed yet.\n");
    } else {
        for record in ctx.history {
            render_step_record(&mut message, record);
        }
    }
    message.push_str("</agent_history>\n\n");

    // Block 2: agent state.
    message.push_str("<agent_state>\n");
    message.push_str(&format!("Task: {}\n", ctx.task.goal));
    if let Some(note) = &ctx.task.sensitive_note {
        message.push_str(&format!("Sensitive data note: {note}\n"));
    }
    message.push_str(&format!("File system: {}\n", ctx.fs_description));
    if !ctx.todo_contents.trim().is_empty() {
        message.push_str(&format!("Todo contents:\n{}\n", ctx.todo_contents));
    }
    if !ctx.memory_notes.is_empty() {
        message.push_str(&format!("Memory: {}\n", ctx.memory_notes.join("; ")));
    }
    message.push_str(&format!(
        "Step {} of {}\n",
        ctx.step_number, ctx.max_steps
    ));
    message.push_str(&format!(
        "Current time: {} (run started {})\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
        ctx.started_at.format("%H:%M:%S UTC")
    ));
    if !ctx.available_paths.is_empty() {
        message.push_str(&format!(
            "Available files: {}\n",
            ctx.available_paths.join(", ")
        ));
    }
    message.push_str("</agent_state>\n\n");

    // Block 3: device state.
    message.push_str("<device_state>\n");
    message.push_str(&format!("Foreground activity: {}\n", ctx.screen.activity));
    message.push_str(&format!(
        "Keyboard: {}\n",
        if ctx.screen.keyboard_open {
            "open"
        } else {
            "closed"
        }
    ));
    message.push_str(&truncate_display(&ctx.screen.display, display_char_budget));
    message.push_str("\n</device_state>\n");

    // Block 4: read state, present only while fresh.
    if let Some(content) = ctx.read_state {
        message.push_str("\n<read_state>\n");
        message.push_str(content);
        message.push_str("\n</read_state>\n");
    }

    message
}

fn render_step_record(message: &mut String, record: &StepRecord) {
    message.push_str(&format!("<step_{}>\n", record.step_number));
    match &record.decision {
        Some(decision) => {
            if let Some(eval) = &decision.evaluation_previous_goal {
                message.push_str(&format!("Evaluation: {eval}\n"));
            }
            if let Some(memory) = &decision.memory {
                message.push_str(&format!("Memory: {memory}\n"));
            }
            if !decision.next_goal.is_empty() {
                message.push_str(&format!("Goal: {}\n", decision.next_goal));
            }
            for (action, result) in decision.actions.iter().zip(&record.results) {
                message.push_str(&format!(
                    "{} -> {}\n",
                    action.name(),
                    render_result(result)
                ));
            }
        }
        None => {
            let error = record.error.as_deref().unwrap_or("unknown failure");
            message.push_str(&format!("Step failed: {error}\n"));
        }
    }
    message.push_str(&format!("</step_{}>\n", record.step_number));
}

fn render_result(result: &ActionResult) -> String {
    if let Some(error) = &result.error {
        return format!("Error: {error}");
    }
    if let Some(content) = &result.extracted_content {
        return truncate_chars(content, 200);
    }
    "OK".to_string()
}

/// Truncate the element listing to the char budget, appending an explicit
/// notice so the model knows content was cut.
fn truncate_display(display: &str, budget: usize) -> String {
    let char_count = display.chars().count();
    if char_count <= budget {
        return display.to_string();
    }
    let kept: String = display.chars().take(budget).collect();
    format!(
        "{kept}\n[device state truncated: showing {budget} of {char_count} characters]"
    )
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::AgentAction;
    use crate::types::StepDecision;

    fn test_screen() -> ScreenState {
        ScreenState {
            display: "[1]<Button> OK (clickable)".to_string(),
            keyboard_open: false,
            activity: "com.example/.Main".to_string(),
            lookup: Default::default(),
            pixels_above: 0,
            pixels_below: 0,
        }
    }

    fn test_context<'a>(
        task: &'a TaskRequest,
        history: &'a [StepRecord],
        screen: &'a ScreenState,
    ) -> StateMessageContext<'a> {
        StateMessageContext {
            task,
            history,
            memory_notes: &[],
            screen,
            fs_description: "file area is empty",
            todo_contents: "",
            available_paths: &[],
            step_number: 1,
            max_steps: 10,
            started_at: Utc::now(),
            read_state: None,
        }
    }

    #[test]
    fn test_system_prompt_contains_catalogs() {
        let prompt = build_system_prompt(&AgentSettings::default(), &IntentRegistry::new());
        assert!(prompt.contains("<name>tap_element</name>"));
        assert!(prompt.contains("<name>done</name>"));
        assert!(prompt.contains("no external capabilities"));
        assert!(!prompt.contains("{action_catalog}"));
    }

    #[test]
    fn test_system_prompt_override_and_append() {
        let settings = AgentSettings {
            system_prompt_override: Some("Custom base. {action_catalog}".to_string()),
            system_prompt_append: Some("Extra rule.".to_string()),
            ..Default::default()
        };
        let prompt = build_system_prompt(&settings, &IntentRegistry::new());
        assert!(prompt.starts_with("Custom base."));
        assert!(prompt.contains("<name>tap_element</name>"));
        assert!(prompt.ends_with("Extra rule."));
    }

    #[test]
    fn test_state_message_block_order() {
        let task = TaskRequest::new("open the clock app");
        let screen = test_screen();
        let message = build_state_message(&test_context(&task, &[], &screen), 4_000);

        let history = message.find("<agent_history>").unwrap();
        let agent = message.find("<agent_state>").unwrap();
        let device = message.find("<device_state>").unwrap();
        assert!(history < agent && agent < device);
        assert!(message.contains("no steps executed yet"));
        assert!(message.contains("Task: open the clock app"));
        assert!(message.contains("[1]<Button> OK"));
        assert!(!message.contains("<read_state>"));
    }

    #[test]
    fn test_history_steps_are_tagged() {
        let task = TaskRequest::new("demo");
        let screen = test_screen();
        let decision = StepDecision {
            next_goal: "tap the button".to_string(),
            actions: vec![AgentAction::TapElement { element_id: 1 }],
            ..Default::default()
        };
        let records = vec![StepRecord::new(
            1,
            decision,
            vec![crate::actions::ActionResult::ok()],
            screen.clone(),
            15,
        )];

        let mut ctx = test_context(&task, &records, &screen);
        ctx.step_number = 2;
        let message = build_state_message(&ctx, 4_000);

        assert!(message.contains("<step_1>"));
        assert!(message.contains("tap_element -> OK"));
        assert!(message.contains("</step_1>"));
    }

    #[test]
    fn test_read_state_block() {
        let task = TaskRequest::new("demo");
        let screen = test_screen();
        let mut ctx = test_context(&task, &[], &screen);
        ctx.read_state = Some("file contents here");
        let message = build_state_message(&ctx, 4_000);
        assert!(message.contains("<read_state>\nfile contents here"));
    }

    #[test]
    fn test_device_state_truncation_notice() {
        let task = TaskRequest::new("demo");
        let mut screen = test_screen();
        screen.display = "x".repeat(500);
        let message = build_state_message(&test_context(&task, &[], &screen), 100);
        assert!(message.contains("[device state truncated: showing 100 of 500 characters]"));
    }
}
