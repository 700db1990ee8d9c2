//! Runtime settings
//!
//! Priority: environment variables > config file > built-in defaults.
//! The environment names are flat (`UPSTREAM_REALTIME_ENDPOINT`, `PORT`, ...)
//! so the gateway can be configured without a file at all.

use config::{Config, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::ConfigError;

/// Main application settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Upstream realtime peer.
    #[serde(default)]
    pub upstream: UpstreamSettings,

    /// Embedding service used by the retrieval index.
    #[serde(default)]
    pub embedding: EmbeddingSettings,

    /// Backend account API.
    #[serde(default)]
    pub backend: BackendSettings,

    /// Retrieval service knobs.
    #[serde(default)]
    pub retrieval: RetrievalSettings,

    /// HTTP/WebSocket server.
    #[serde(default)]
    pub server: ServerSettings,

    /// Logging configuration.
    #[serde(default)]
    pub observability: ObservabilitySettings,
}

/// Upstream realtime peer connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamSettings {
    /// WebSocket endpoint of the realtime model.
    #[serde(default)]
    pub endpoint: String,
    /// API credential, sent as a request header, never in the URL.
    #[serde(default)]
    pub api_key: String,
    /// Deployment (model) name appended as a query parameter where the
    /// upstream requires one.
    #[serde(default)]
    pub deployment: String,
    /// Connect timeout in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            deployment: String::new(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

/// Embedding service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Maximum texts per embedding request.
    #[serde(default = "default_embedding_batch")]
    pub batch_size: usize,
    #[serde(default = "default_embedding_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_batch() -> usize {
    50
}

fn default_embedding_timeout_ms() -> u64 {
    30_000
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            model: default_embedding_model(),
            batch_size: default_embedding_batch(),
            timeout_ms: default_embedding_timeout_ms(),
        }
    }
}

/// Backend account API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendSettings {
    #[serde(default = "default_backend_base")]
    pub base_url: String,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_backend_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_backend_base() -> String {
    "http://localhost:8001".to_string()
}

fn default_backend_timeout_ms() -> u64 {
    5_000
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: default_backend_base(),
            timeout_ms: default_backend_timeout_ms(),
        }
    }
}

/// Retrieval service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalSettings {
    /// Corpus file of delimiter-separated sections.
    #[serde(default = "default_corpus_path")]
    pub corpus_path: String,
    /// Directory holding the persisted vector store.
    #[serde(default = "default_persist_dir")]
    pub persist_dir: String,
    /// When false the keyword fallback is always used.
    #[serde(default = "default_true")]
    pub use_vector_store: bool,
    /// Rebuild the index at boot even if a persisted store exists.
    #[serde(default)]
    pub force_reindex: bool,
    /// Target chunk size in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Overlap between adjacent chunks in characters.
    #[serde(default = "default_overlap")]
    pub overlap: usize,
    /// Default result count for knowledge queries.
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,
}

fn default_corpus_path() -> String {
    "data/knowledge.txt".to_string()
}

fn default_persist_dir() -> String {
    "data/vector_store".to_string()
}

fn default_true() -> bool {
    true
}

fn default_chunk_size() -> usize {
    500
}

fn default_overlap() -> usize {
    100
}

fn default_top_k() -> usize {
    3
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            corpus_path: default_corpus_path(),
            persist_dir: default_persist_dir(),
            use_vector_store: true,
            force_reindex: false,
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
            default_top_k: default_top_k(),
        }
    }
}

/// Server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins; empty means permissive (development).
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
    /// Persona config document.
    #[serde(default = "default_personas_path")]
    pub personas_path: String,
    /// Upper bound on concurrently live sessions.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_personas_path() -> String {
    "config/personas.yaml".to_string()
}

fn default_max_sessions() -> usize {
    100
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_allowed_origins: Vec::new(),
            personas_path: default_personas_path(),
            max_sessions: default_max_sessions(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilitySettings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

/// Load settings from an optional YAML file, then apply environment
/// overrides.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();
    if let Some(p) = path {
        builder = builder.add_source(File::from(p).required(false));
    }
    let raw = builder
        .build()
        .map_err(|e| ConfigError::Parse(e.to_string()))?;
    let mut settings: Settings = raw
        .try_deserialize()
        .map_err(|e| ConfigError::Parse(e.to_string()))?;
    settings.apply_env();
    Ok(settings)
}

impl Settings {
    /// Apply the flat environment variable overrides recognized by the
    /// gateway.
    pub fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("UPSTREAM_REALTIME_ENDPOINT") {
            self.upstream.endpoint = v;
        }
        if let Ok(v) = std::env::var("UPSTREAM_API_KEY") {
            self.upstream.api_key = v;
        }
        if let Ok(v) = std::env::var("UPSTREAM_DEPLOYMENT_NAME") {
            self.upstream.deployment = v;
        }
        if let Ok(v) = std::env::var("EMBEDDING_ENDPOINT") {
            self.embedding.endpoint = v;
        }
        if let Ok(v) = std::env::var("EMBEDDING_API_KEY") {
            self.embedding.api_key = v;
        }
        if let Ok(v) = std::env::var("EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Ok(v) = std::env::var("BACKEND_API_BASE") {
            self.backend.base_url = v;
        }
        if let Ok(v) = std::env::var("USE_VECTOR_STORE") {
            self.retrieval.use_vector_store = parse_bool(&v);
        }
        if let Ok(v) = std::env::var("HOST") {
            self.server.host = v;
        }
        if let Ok(v) = std::env::var("PORT") {
            if let Ok(port) = v.parse() {
                self.server.port = port;
            } else {
                tracing::warn!(value = %v, "Ignoring unparseable PORT");
            }
        }
        if let Ok(v) = std::env::var("CORS_ALLOWED_ORIGINS") {
            self.server.cors_allowed_origins = v
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
    }

    /// Validate settings required to serve traffic. Retrieval settings are
    /// validated separately because the fallback path works without the
    /// embedding service.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.upstream.endpoint.is_empty() {
            return Err(ConfigError::Missing("UPSTREAM_REALTIME_ENDPOINT"));
        }
        if self.upstream.api_key.is_empty() {
            return Err(ConfigError::Missing("UPSTREAM_API_KEY"));
        }
        if self.retrieval.chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retrieval.chunk_size".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.retrieval.overlap >= self.retrieval.chunk_size {
            return Err(ConfigError::InvalidValue {
                field: "retrieval.overlap".to_string(),
                message: format!(
                    "overlap {} must be smaller than chunk_size {}",
                    self.retrieval.overlap, self.retrieval.chunk_size
                ),
            });
        }
        if self.embedding.batch_size == 0 || self.embedding.batch_size > 50 {
            return Err(ConfigError::InvalidValue {
                field: "embedding.batch_size".to_string(),
                message: "must be in 1..=50".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
