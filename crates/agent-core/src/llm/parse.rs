//! Tolerant extraction and parsing of structured model output.

use serde::Deserialize;
use serde_json::Value;

use crate::actions::registry::parse_actions;
use crate::errors::AgentError;
use crate::types::StepDecision;

/// Pull the first JSON object out of raw model output.
///
/// Handles plain objects, fenced code blocks, and objects embedded in
/// prose (balanced-brace scan).
pub fn extract_json_object(raw: &str) -> Option<String> {
    if raw.trim_start().starts_with('{') {
        return Some(trim_symmetric(raw));
    }

    let fence = "```";
    if let Some(start) = raw.find(fence) {
        let after_fence = &raw[start + fence.len()..];
        let after_lang = after_fence.trim_start_matches(|c: char| c.is_alphanumeric() || c == '_');
        if let Some(end) = after_lang.find(fence) {
            let block = &after_lang[..end];
            if block.contains('{') {
                return Some(trim_symmetric(block));
            }
        }
    }

    raw.split('{').nth(1).and_then(|rest| {
        let mut depth = 1i32;
        for (idx, ch) in rest.char_indices() {
            match ch {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        let mut candidate = String::from("{");
                        candidate.push_str(&rest[..=idx]);
                        return Some(trim_symmetric(&candidate));
                    }
                }
                _ => {}
            }
        }
        None
    })
}

fn trim_symmetric(value: &str) -> String {
    value.trim().trim_matches('`').trim().to_string()
}

/// Wire shape of a reasoning response before action validation.
#[derive(Debug, Deserialize)]
struct WireDecision {
    #[serde(default)]
    thinking: String,
    #[serde(default)]
    evaluation_previous_goal: Option<String>,
    #[serde(default)]
    memory: Option<String>,
    #[serde(default)]
    next_goal: String,
    #[serde(default, alias = "actions")]
    action: Vec<Value>,
}

/// Parse raw model output into a validated [`StepDecision`].
///
/// Action entries go through the protocol registry, so an unknown action
/// name or a bad parameter fails the whole payload (and the call is
/// retried like any other failure).
pub fn parse_step_decision(raw: &str) -> Result<StepDecision, AgentError> {
    let json = extract_json_object(raw)
        .ok_or_else(|| AgentError::payload("no JSON object in model output"))?;

    let wire: WireDecision = serde_json::from_str(&json)
        .map_err(|err| AgentError::payload(format!("malformed decision JSON: {err}")))?;

    let actions = parse_actions(&wire.action)?;

    Ok(StepDecision {
        thinking: wire.thinking,
        evaluation_previous_goal: wire.evaluation_previous_goal,
        memory: wire.memory,
        next_goal: wire.next_goal,
        actions,
    })
}
