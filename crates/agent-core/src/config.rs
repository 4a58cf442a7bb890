//! Per-run agent configuration.

use serde::{Deserialize, Serialize};

/// Immutable configuration for one task run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Maximum steps before the run is finalized as incomplete.
    pub max_steps: u32,

    /// Actions executed per model decision, surplus is dropped.
    pub max_actions_per_step: u32,

    /// Consecutive failed reasoning phases before the run aborts.
    pub max_failures: u32,

    /// Pause between failed reasoning phases, in milliseconds.
    pub retry_delay_ms: u64,

    /// Timeout for a single reasoning call, in milliseconds.
    pub llm_timeout_ms: u64,

    /// Timeout for one whole step (sense through record), in milliseconds.
    pub step_timeout_ms: u64,

    /// Retries inside one reasoning phase before it reports failure.
    pub llm_max_retries: u32,

    /// First backoff delay between reasoning retries, doubled per attempt.
    pub llm_backoff_base_ms: u64,

    /// Ceiling for the reasoning retry backoff.
    pub llm_backoff_cap_ms: u64,

    /// Step records retained in history; `None` keeps everything.
    pub max_history_items: Option<usize>,

    /// Character budget for the device state block in the prompt.
    pub display_char_budget: usize,

    /// Full replacement for the built-in system prompt.
    pub system_prompt_override: Option<String>,

    /// Extra instructions appended to the system prompt.
    pub system_prompt_append: Option<String>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_steps: 100,
            max_actions_per_step: 3,
            max_failures: 3,
            retry_delay_ms: 1_000,
            llm_timeout_ms: 60_000,
            step_timeout_ms: 180_000,
            llm_max_retries: 3,
            llm_backoff_base_ms: 500,
            llm_backoff_cap_ms: 8_000,
            max_history_items: None,
            display_char_budget: 16_000,
            system_prompt_override: None,
            system_prompt_append: None,
        }
    }
}

impl AgentSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tight limits for tests.
    pub fn minimal() -> Self {
        Self {
            max_steps: 10,
            max_actions_per_step: 2,
            max_failures: 2,
            retry_delay_ms: 10,
            llm_timeout_ms: 5_000,
            step_timeout_ms: 10_000,
            llm_max_retries: 1,
            llm_backoff_base_ms: 10,
            llm_backoff_cap_ms: 40,
            max_history_items: Some(20),
            display_char_budget: 4_000,
            system_prompt_override: None,
            system_prompt_append: None,
        }
    }

    /// Builder: set max steps.
    pub fn max_steps(mut self, steps: u32) -> Self {
        self.max_steps = steps;
        self
    }

    /// Builder: set the consecutive-failure budget.
    pub fn max_failures(mut self, failures: u32) -> Self {
        self.max_failures = failures;
        self
    }

    /// Builder: set actions per step.
    pub fn actions_per_step(mut self, count: u32) -> Self {
        self.max_actions_per_step = count;
        self
    }

    /// Builder: cap history retention.
    pub fn history_items(mut self, items: usize) -> Self {
        self.max_history_items = Some(items);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = AgentSettings::default();
        assert_eq!(settings.max_steps, 100);
        assert_eq!(settings.max_failures, 3);
        assert!(settings.max_history_items.is_none());
    }

    #[test]
    fn test_builder() {
        let settings = AgentSettings::new()
            .max_steps(5)
            .max_failures(1)
            .history_items(3);
        assert_eq!(settings.max_steps, 5);
        assert_eq!(settings.max_failures, 1);
        assert_eq!(settings.max_history_items, Some(3));
    }

    #[test]
    fn test_partial_deserialization_uses_defaults() {
        let settings: AgentSettings = serde_json::from_str(r#"{"max_steps": 7}"#).unwrap();
        assert_eq!(settings.max_steps, 7);
        assert_eq!(settings.max_actions_per_step, 3);
    }
}
