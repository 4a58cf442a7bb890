//! Transport selection by configuration precedence.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AgentError;
use crate::llm::remote::{ChatCompletionProvider, RemoteEndpoint};
use crate::llm::ReasoningProvider;

/// Reasoning transport configuration, usually loaded from the host's
/// config file. Precedence when several transports are configured:
/// self-hosted endpoint, then relay, then direct API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReasoningConfig {
    /// Base URL of the direct vendor API.
    pub api_base: Option<String>,

    /// API keys for the direct transport, rotated on rate limits.
    pub api_keys: Vec<String>,

    pub model: String,
    pub temperature: f32,
    pub request_timeout_ms: u64,

    /// Trusted relay base URL.
    pub relay_url: Option<String>,

    /// Device token presented to the relay.
    pub relay_token: Option<String>,

    /// Self-hosted OpenAI-compatible endpoint.
    pub self_hosted_url: Option<String>,

    /// Optional key for the self-hosted endpoint.
    pub self_hosted_key: Option<String>,
}

impl Default for ReasoningConfig {
    fn default() -> Self {
        Self {
            api_base: None,
            api_keys: Vec::new(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
            request_timeout_ms: 60_000,
            relay_url: None,
            relay_token: None,
            self_hosted_url: None,
            self_hosted_key: None,
        }
    }
}

impl ReasoningConfig {
    fn endpoint(&self, base_url: String, api_keys: Vec<String>) -> RemoteEndpoint {
        RemoteEndpoint {
            base_url,
            api_keys,
            model: self.model.clone(),
            temperature: self.temperature,
            timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }
}

/// Build the reasoning provider for this configuration.
///
/// Fails only when no transport is configured at all; each constructor
/// validates its own credential requirements.
pub fn provider_from_config(
    config: &ReasoningConfig,
) -> Result<Arc<dyn ReasoningProvider>, AgentError> {
    if let Some(url) = &config.self_hosted_url {
        let keys = config.self_hosted_key.iter().cloned().collect();
        let provider = ChatCompletionProvider::self_hosted(config.endpoint(url.clone(), keys))?;
        info!(target: "reasoning", transport = provider.transport(), "reasoning transport selected");
        return Ok(Arc::new(provider));
    }

    if let Some(url) = &config.relay_url {
        let keys = config.relay_token.iter().cloned().collect();
        let provider = ChatCompletionProvider::relay(config.endpoint(url.clone(), keys))?;
        info!(target: "reasoning", transport = provider.transport(), "reasoning transport selected");
        return Ok(Arc::new(provider));
    }

    if let Some(base) = &config.api_base {
        let provider =
            ChatCompletionProvider::direct(config.endpoint(base.clone(), config.api_keys.clone()))?;
        info!(target: "reasoning", transport = provider.transport(), "reasoning transport selected");
        return Ok(Arc::new(provider));
    }

    Err(AgentError::config(
        "no reasoning transport configured: set self_hosted_url, relay_url, or api_base",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_transport_is_config_error() {
        let err = provider_from_config(&ReasoningConfig::default()).err().unwrap();
        assert!(err.to_string().contains("no reasoning transport"));
    }

    #[test]
    fn test_self_hosted_takes_precedence() {
        let config = ReasoningConfig {
            self_hosted_url: Some("http://localhost:8080/v1".to_string()),
            relay_url: Some("https://relay.example".to_string()),
            relay_token: Some("tok".to_string()),
            api_base: Some("https://api.example".to_string()),
            api_keys: vec!["key".to_string()],
            ..Default::default()
        };
        // Selection succeeds even though every transport is configured;
        // the self-hosted endpoint needs no credentials.
        assert!(provider_from_config(&config).is_ok());
    }

    #[test]
    fn test_relay_requires_token() {
        let config = ReasoningConfig {
            relay_url: Some("https://relay.example".to_string()),
            ..Default::default()
        };
        assert!(provider_from_config(&config).is_err());
    }

    #[test]
    fn test_direct_requires_key() {
        let config = ReasoningConfig {
            api_base: Some("https://api.example".to_string()),
            ..Default::default()
        };
        assert!(provider_from_config(&config).is_err());
    }
}
