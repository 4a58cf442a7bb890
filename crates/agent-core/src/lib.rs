//! Agent core: action protocol, prompting, reasoning client, executor,
//! and the orchestrating step loop.
//!
//! # Architecture
//!
//! ```text
//! while !done && steps < max:
//!     screen   = perception.analyze()     // SENSE (concurrent captures)
//!     message  = prompt.build(...)        // PROMPT (history + state)
//!     decision = reasoning.decide(...)    // THINK (retry with backoff)
//!     results  = executor.execute(...)    // ACT  (sequential actions)
//!     history.push(record)                // RECORD (bounded retention)
//! ```
//!
//! The action vocabulary is closed: a single static registry feeds both
//! the prompt catalog and the deserializer, so what the model is offered
//! and what the executor accepts cannot drift apart.

pub mod actions;
pub mod config;
pub mod errors;
pub mod executor;
pub mod llm;
pub mod orchestrator;
pub mod prompt;
pub mod types;

pub use actions::{ActionResult, AgentAction, IntentRegistry, IntentSpec};
pub use config::AgentSettings;
pub use errors::AgentError;
pub use executor::ActionExecutor;
pub use llm::{
    provider_from_config, ChatCompletionProvider, ReasoningConfig, ReasoningProvider,
    ScriptedProvider,
};
pub use orchestrator::{AgentOrchestrator, RunHandle};
pub use prompt::{build_state_message, build_system_prompt, StateMessageContext};
pub use types::{RunReport, RunStatus, StepDecision, StepRecord, TaskRequest};
