//! Configuration for the voice gateway
//!
//! Two documents feed the process:
//! - `Settings`: runtime wiring (upstream peer, embedding service, backend
//!   API, server binding), layered from an optional YAML file and flat
//!   environment variables.
//! - `PersonaSet`: the two agent personas, loaded once at boot and validated
//!   before the first session is accepted.

pub mod persona;
pub mod settings;

pub use persona::{Persona, PersonaSet, ToolArgSpec, ToolSchema, VadParams};
pub use settings::{
    load_settings, BackendSettings, EmbeddingSettings, ObservabilitySettings, RetrievalSettings,
    ServerSettings, Settings, UpstreamSettings,
};

use thiserror::Error;

/// Configuration errors. All of these are fatal at boot.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(String),

    #[error("missing required setting: {0}")]
    Missing(&'static str),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("invalid persona '{role}': {message}")]
    Persona { role: String, message: String },
}
