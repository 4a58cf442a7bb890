//! CLI runner configuration loaded from YAML.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use agent_core::{AgentSettings, ReasoningConfig};

/// Top-level config file shape.
///
/// Every field is optional; omitted sections fall back to defaults so a
/// config file only needs the keys it wants to change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub agent: AgentSettings,
    pub reasoning: ReasoningConfig,
}

impl RunnerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Load the file when present, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            info!(target: "cli", path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }
}
