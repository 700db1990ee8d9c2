//! Agent persona configuration
//!
//! Exactly two personas exist: the anonymous general assistant and the
//! authenticated account manager. Both are loaded from one YAML document at
//! boot and are immutable afterwards; a persona failing validation aborts
//! startup.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use voice_gateway_core::AgentRole;

use crate::ConfigError;

/// Server-side voice-activity-detection parameters forwarded to the upstream
/// peer in `session.update`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VadParams {
    pub threshold: f32,
    pub prefix_padding_ms: u32,
    pub silence_duration_ms: u32,
    #[serde(default = "default_true")]
    pub create_response: bool,
}

fn default_true() -> bool {
    true
}

impl Default for VadParams {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            prefix_padding_ms: 300,
            silence_duration_ms: 500,
            create_response: true,
        }
    }
}

/// One argument of a tool schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolArgSpec {
    /// JSON type name ("string", "integer", "number", "boolean").
    #[serde(rename = "type")]
    pub arg_type: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: Option<String>,
}

/// Declared shape of a tool exposed to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    /// Argument name to spec. BTreeMap keeps wire output deterministic.
    #[serde(default)]
    pub arguments: BTreeMap<String, ToolArgSpec>,
}

impl ToolSchema {
    /// Names of required arguments, in declaration order.
    pub fn required_arguments(&self) -> Vec<&str> {
        self.arguments
            .iter()
            .filter(|(_, spec)| spec.required)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// One agent persona, immutable after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Persona {
    pub role_id: String,
    pub voice_id: String,
    pub intro_utterance: String,
    pub instructions: String,
    #[serde(default)]
    pub tools: Vec<ToolSchema>,
    #[serde(default)]
    pub vad: VadParams,
    /// Delay before the browser is told to hand off, so the current
    /// utterance can finish. Must fall in 800..=2500.
    #[serde(default = "default_handoff_delay_ms")]
    pub handoff_delay_ms: u64,
}

fn default_handoff_delay_ms() -> u64 {
    1500
}

/// The two personas of the gateway, keyed by role.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PersonaSet {
    pub general: Persona,
    pub account: Persona,
}

impl PersonaSet {
    /// Load and validate the persona document.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&raw)
    }

    /// Parse and validate a YAML persona document.
    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        let set: PersonaSet =
            serde_yaml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        set.validate()?;
        Ok(set)
    }

    /// Persona for a role.
    pub fn persona(&self, role: AgentRole) -> &Persona {
        match role {
            AgentRole::General => &self.general,
            AgentRole::Account => &self.account,
        }
    }

    /// Validate both personas; the first violation aborts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, persona) in [("general", &self.general), ("account", &self.account)] {
            persona
                .validate()
                .map_err(|message| ConfigError::Persona {
                    role: key.to_string(),
                    message,
                })?;
        }
        Ok(())
    }
}

impl Persona {
    fn validate(&self) -> Result<(), String> {
        if self.role_id.trim().is_empty() {
            return Err("role_id is empty".to_string());
        }
        if self.voice_id.trim().is_empty() {
            return Err("voice_id is empty".to_string());
        }
        if self.intro_utterance.trim().is_empty() {
            return Err("intro_utterance is empty".to_string());
        }
        if self.instructions.trim().is_empty() {
            return Err("instructions are empty".to_string());
        }
        if !(self.vad.threshold > 0.0 && self.vad.threshold < 1.0) {
            return Err(format!(
                "vad.threshold {} must be strictly between 0 and 1",
                self.vad.threshold
            ));
        }
        if self.vad.prefix_padding_ms > 5000 {
            return Err("vad.prefix_padding_ms above 5000".to_string());
        }
        if self.vad.silence_duration_ms > 5000 {
            return Err("vad.silence_duration_ms above 5000".to_string());
        }
        if !(800..=2500).contains(&self.handoff_delay_ms) {
            return Err(format!(
                "handoff_delay_ms {} outside 800..=2500",
                self.handoff_delay_ms
            ));
        }
        for tool in &self.tools {
            if tool.name.trim().is_empty() {
                return Err("tool with empty name".to_string());
            }
            for (arg, spec) in &tool.arguments {
                if spec.arg_type.trim().is_empty() {
                    return Err(format!("tool {}: argument {} has no type", tool.name, arg));
                }
            }
        }
        Ok(())
    }
}
