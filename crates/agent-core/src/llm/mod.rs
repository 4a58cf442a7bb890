//! Reasoning client: provider trait, retry discipline, transports.
//!
//! One `decide` interface, several implementations: the scripted provider
//! for tests and offline work, and the chat-completion transports in
//! [`remote`] selected by configuration precedence in [`dispatch`].

pub mod dispatch;
pub mod parse;
pub mod remote;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::config::AgentSettings;
use crate::errors::AgentError;
use crate::types::StepDecision;

pub use dispatch::{provider_from_config, ReasoningConfig};
pub use parse::{extract_json_object, parse_step_decision};
pub use remote::{ChatCompletionProvider, RemoteEndpoint};

/// Abstraction over reasoning backends so multiple transports can plug
/// into the agent core.
#[async_trait]
pub trait ReasoningProvider: Send + Sync {
    /// Produce the next decision from the run's system prompt and the
    /// current state message. Implementations enforce structured output;
    /// a malformed payload is an error, not a panic.
    async fn decide(
        &self,
        system_prompt: &str,
        state_message: &str,
    ) -> Result<StepDecision, AgentError>;
}

/// Retry discipline around one reasoning phase.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per phase (1 means no retry).
    pub max_attempts: u32,
    /// Per-call timeout.
    pub call_timeout: Duration,
    /// First backoff delay; doubled after every failed attempt.
    pub base_delay: Duration,
    /// Backoff ceiling.
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_settings(settings: &AgentSettings) -> Self {
        Self {
            max_attempts: settings.llm_max_retries.max(1),
            call_timeout: Duration::from_millis(settings.llm_timeout_ms),
            base_delay: Duration::from_millis(settings.llm_backoff_base_ms),
            max_delay: Duration::from_millis(settings.llm_backoff_cap_ms),
        }
    }
}

/// Call the provider with bounded retries and exponential backoff.
///
/// Returns `None` only once every attempt has failed; the caller counts
/// that toward the run's consecutive-failure budget.
pub async fn decide_with_backoff(
    provider: &dyn ReasoningProvider,
    system_prompt: &str,
    state_message: &str,
    policy: &RetryPolicy,
) -> Option<StepDecision> {
    let mut delay = policy.base_delay;

    for attempt in 1..=policy.max_attempts {
        let call = provider.decide(system_prompt, state_message);
        match tokio::time::timeout(policy.call_timeout, call).await {
            Ok(Ok(decision)) => return Some(decision),
            Ok(Err(err)) => {
                warn!(
                    target: "reasoning",
                    attempt,
                    max_attempts = policy.max_attempts,
                    error = %err,
                    "reasoning call failed"
                );
            }
            Err(_) => {
                warn!(
                    target: "reasoning",
                    attempt,
                    max_attempts = policy.max_attempts,
                    timeout_ms = policy.call_timeout.as_millis() as u64,
                    "reasoning call timed out"
                );
            }
        }

        if attempt < policy.max_attempts {
            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(policy.max_delay);
        }
    }

    None
}

/// Scripted reply used by [`ScriptedProvider`].
#[derive(Debug, Clone)]
enum ScriptedReply {
    Decision(StepDecision),
    Failure(String),
}

/// Deterministic provider for tests and offline development.
///
/// Replies play back in order; an exhausted script fails every further
/// call. `always_fail` builds a provider that never succeeds.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<ScriptedReply>>,
    calls: AtomicU32,
    fail_forever: bool,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provider whose every call fails.
    pub fn always_fail() -> Self {
        Self {
            fail_forever: true,
            ..Self::default()
        }
    }

    pub fn push_decision(&self, decision: StepDecision) {
        self.replies
            .lock()
            .expect("replies lock")
            .push_back(ScriptedReply::Decision(decision));
    }

    pub fn push_failure(&self, message: impl Into<String>) {
        self.replies
            .lock()
            .expect("replies lock")
            .push_back(ScriptedReply::Failure(message.into()));
    }

    /// Number of decide calls received so far.
    pub fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReasoningProvider for ScriptedProvider {
    async fn decide(
        &self,
        _system_prompt: &str,
        _state_message: &str,
    ) -> Result<StepDecision, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_forever {
            return Err(AgentError::reasoning("scripted failure"));
        }
        match self.replies.lock().expect("replies lock").pop_front() {
            Some(ScriptedReply::Decision(decision)) => Ok(decision),
            Some(ScriptedReply::Failure(message)) => Err(AgentError::reasoning(message)),
            None => Err(AgentError::reasoning("script exhausted")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::AgentAction;

    fn quick_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            call_timeout: Duration::from_millis(500),
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(4),
        }
    }

    fn press_home_decision() -> StepDecision {
        StepDecision {
            next_goal: "go home".to_string(),
            actions: vec![AgentAction::PressHome],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_success_on_third_attempt() {
        let provider = ScriptedProvider::new();
        provider.push_failure("first");
        provider.push_failure("second");
        provider.push_decision(press_home_decision());

        let decision =
            decide_with_backoff(&provider, "sys", "state", &quick_policy(3)).await;

        assert_eq!(provider.call_count(), 3);
        assert_eq!(decision.unwrap().actions, vec![AgentAction::PressHome]);
    }

    #[tokio::test]
    async fn test_exhausted_retries_return_none() {
        let provider = ScriptedProvider::always_fail();
        let decision =
            decide_with_backoff(&provider, "sys", "state", &quick_policy(3)).await;
        assert!(decision.is_none());
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn test_single_attempt_policy() {
        let provider = ScriptedProvider::new();
        provider.push_failure("only");
        provider.push_decision(press_home_decision());

        let decision =
            decide_with_backoff(&provider, "sys", "state", &quick_policy(1)).await;
        assert!(decision.is_none());
        assert_eq!(provider.call_count(), 1);
    }
}
