//! Chat-completion transport for remote reasoning backends.
//!
//! All three transports (direct vendor API, trusted relay, self-hosted
//! endpoint) speak the same wire protocol; they differ only in base URL
//! and credential handling, so one provider type serves them all.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::errors::AgentError;
use crate::llm::parse::parse_step_decision;
use crate::llm::ReasoningProvider;
use crate::types::StepDecision;

/// Connection parameters for one chat-completion endpoint.
#[derive(Debug, Clone)]
pub struct RemoteEndpoint {
    /// Base URL, `/chat/completions` is appended.
    pub base_url: String,
    /// Bearer credentials, tried in order on rate limits. May be empty
    /// for unauthenticated self-hosted endpoints.
    pub api_keys: Vec<String>,
    pub model: String,
    pub temperature: f32,
    pub timeout: Duration,
}

/// Reasoning provider backed by an OpenAI-compatible chat endpoint.
pub struct ChatCompletionProvider {
    transport: &'static str,
    client: Client,
    endpoint: RemoteEndpoint,
}

impl ChatCompletionProvider {
    /// Direct vendor API; requires at least one API key.
    pub fn direct(endpoint: RemoteEndpoint) -> Result<Self, AgentError> {
        if endpoint.api_keys.is_empty() {
            return Err(AgentError::config("missing API key for direct transport"));
        }
        Self::build("direct", endpoint)
    }

    /// Trusted relay; the device token travels as the bearer credential.
    pub fn relay(endpoint: RemoteEndpoint) -> Result<Self, AgentError> {
        if endpoint.api_keys.is_empty() {
            return Err(AgentError::config("missing device token for relay transport"));
        }
        Self::build("relay", endpoint)
    }

    /// Self-hosted compatible endpoint; credentials optional.
    pub fn self_hosted(endpoint: RemoteEndpoint) -> Result<Self, AgentError> {
        Self::build("self-hosted", endpoint)
    }

    pub fn transport(&self) -> &'static str {
        self.transport
    }

    fn build(transport: &'static str, endpoint: RemoteEndpoint) -> Result<Self, AgentError> {
        let client = Client::builder()
            .timeout(endpoint.timeout)
            .build()
            .map_err(|err| AgentError::config(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            transport,
            client,
            endpoint,
        })
    }

    /// Send one request, rotating to the next credential on rate limits.
    async fn send(&self, system_prompt: &str, state_message: &str) -> Result<String, AgentError> {
        let url = format!(
            "{}/chat/completions",
            self.endpoint.base_url.trim_end_matches('/')
        );
        let body = ChatCompletionRequest {
            model: self.endpoint.model.clone(),
            temperature: self.endpoint.temperature,
            response_format: ResponseFormat {
                r#type: "json_object".to_string(),
            },
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: state_message.to_string(),
                },
            ],
        };

        // An endpoint without credentials gets exactly one anonymous try.
        let keys: Vec<Option<&str>> = if self.endpoint.api_keys.is_empty() {
            vec![None]
        } else {
            self.endpoint.api_keys.iter().map(|k| Some(k.as_str())).collect()
        };

        let mut last_error: Option<AgentError> = None;
        for (index, key) in keys.iter().enumerate() {
            let mut request = self.client.post(&url).json(&body);
            if let Some(key) = key {
                request = request.bearer_auth(key);
            }

            let response = match request.send().await {
                Ok(resp) => resp,
                Err(err) => {
                    last_error = Some(AgentError::reasoning(format!(
                        "{} request failed: {err}",
                        self.transport
                    )));
                    continue;
                }
            };

            if !response.status().is_success() {
                let status = response.status();
                let text = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "<response unavailable>".to_string());
                if status.as_u16() == 429 && index + 1 < keys.len() {
                    warn!(
                        target: "reasoning",
                        transport = self.transport,
                        attempt = index + 1,
                        remaining = keys.len() - index - 1,
                        "rate limited, switching credential"
                    );
                    last_error = Some(AgentError::reasoning(format!(
                        "{} rate limited: {text}",
                        self.transport
                    )));
                    continue;
                }
                return Err(AgentError::reasoning(format!(
                    "{} returned {status}: {text}",
                    self.transport
                )));
            }

            let response: ChatCompletionResponse = response.json().await.map_err(|err| {
                AgentError::reasoning(format!("{} response invalid: {err}", self.transport))
            })?;

            return response
                .choices
                .first()
                .and_then(|choice| choice.message.content.as_text())
                .ok_or_else(|| {
                    AgentError::reasoning(format!("{} response missing content", self.transport))
                });
        }

        Err(last_error.unwrap_or_else(|| {
            AgentError::reasoning(format!("{} request exhausted all credentials", self.transport))
        }))
    }
}

#[async_trait]
impl ReasoningProvider for ChatCompletionProvider {
    async fn decide(
        &self,
        system_prompt: &str,
        state_message: &str,
    ) -> Result<StepDecision, AgentError> {
        let content = self.send(system_prompt, state_message).await?;
        parse_step_decision(&content)
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    temperature: f32,
    response_format: ResponseFormat,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    r#type: String,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    content: ChatCompletionContent,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChatCompletionContent {
    Text(String),
    Parts(Vec<ChatCompletionPart>),
}

impl ChatCompletionContent {
    fn as_text(&self) -> Option<String> {
        match self {
            ChatCompletionContent::Text(value) => Some(value.clone()),
            ChatCompletionContent::Parts(parts) => {
                let text = parts
                    .iter()
                    .filter_map(|part| part.text.as_ref())
                    .cloned()
                    .collect::<Vec<_>>()
                    .join("\n");
                if text.is_empty() {
                    None
                } else {
                    Some(text)
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionPart {
    #[serde(default)]
    text: Option<String>,
}
