//! Registry of externally provided device capabilities.
//!
//! Hosts register capabilities (alarms, messages, camera, anything the
//! platform exposes as a launchable intent) at startup; the catalog is
//! advertised in the system prompt next to the built-in actions, and the
//! `launch_intent` action resolves against this registry at execution
//! time.

use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use device_bridge::IntentPayload;

/// Failures distinguished when resolving a capability launch.
#[derive(Debug, Error)]
pub enum IntentError {
    #[error("capability not found: {0}")]
    NotFound(String),

    #[error("invalid parameters for {name}: {reason}")]
    InvalidParams { name: String, reason: String },
}

/// One parameter of a registered capability.
#[derive(Debug, Clone)]
pub struct IntentParam {
    pub name: String,
    pub description: String,
}

/// One registered capability.
#[derive(Debug, Clone)]
pub struct IntentSpec {
    pub name: String,
    pub description: String,
    pub params: Vec<IntentParam>,
}

impl IntentSpec {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.params.push(IntentParam {
            name: name.into(),
            description: description.into(),
        });
        self
    }
}

/// Name-keyed capability registry.
#[derive(Debug, Clone, Default)]
pub struct IntentRegistry {
    intents: BTreeMap<String, IntentSpec>,
}

impl IntentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, spec: IntentSpec) {
        self.intents.insert(spec.name.clone(), spec);
    }

    pub fn get(&self, name: &str) -> Option<&IntentSpec> {
        self.intents.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    /// Validate parameters against the spec and build the launch payload.
    ///
    /// Every declared parameter must be present and no undeclared ones are
    /// accepted, so the model learns the exact shape from the catalog.
    pub fn build_payload(
        &self,
        name: &str,
        params: &HashMap<String, String>,
    ) -> Result<IntentPayload, IntentError> {
        let spec = self
            .intents
            .get(name)
            .ok_or_else(|| IntentError::NotFound(name.to_string()))?;

        for declared in &spec.params {
            if !params.contains_key(&declared.name) {
                return Err(IntentError::InvalidParams {
                    name: name.to_string(),
                    reason: format!("missing parameter {}", declared.name),
                });
            }
        }
        for key in params.keys() {
            if !spec.params.iter().any(|p| &p.name == key) {
                return Err(IntentError::InvalidParams {
                    name: name.to_string(),
                    reason: format!("unexpected parameter {key}"),
                });
            }
        }

        Ok(IntentPayload {
            name: name.to_string(),
            extras: params.clone(),
        })
    }

    /// Render the `<intent>` catalog for the system prompt.
    pub fn render_catalog(&self) -> String {
        if self.intents.is_empty() {
            return "(no external capabilities registered)".to_string();
        }
        let mut out = String::new();
        for spec in self.intents.values() {
            out.push_str("<intent>\n");
            out.push_str(&format!("  <name>{}</name>\n", spec.name));
            out.push_str(&format!("  <description>{}</description>\n", spec.description));
            out.push_str("  <parameters>\n");
            for param in &spec.params {
                out.push_str(&format!(
                    "    <param><name>{}</name><type>string</type><description>{}</description></param>\n",
                    param.name, param.description
                ));
            }
            out.push_str("  </parameters>\n");
            out.push_str("</intent>\n");
        }
        out
    }
}
