//! Configuration management for Lumina services
//!
//! Supports loading configuration from:
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Environment variables (prefixed with APP__)
//! - The flat variables of the original deployment (CLUSTER_URL, LLM, ...)
//! - Default values

use crate::errors::{AppError, Result};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Flat environment variables mapped onto their structured keys.
///
/// These override every other source.
const LEGACY_ENV_VARS: &[(&str, &str)] = &[
    ("VECTORIZER_MODEL", "vectorizer.model"),
    ("HuggingFace_API", "vectorizer.api_key"),
    ("CLUSTER_URL", "store.cluster_url"),
    ("WEAVIATE_API_KEY", "store.api_key"),
    ("LLM", "completion.model"),
    ("OPENROUTER_KEY", "completion.api_key"),
    ("BASE_URL", "completion.base_url"),
];

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Vector store (Weaviate) configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Vectorizer module attached to the collection
    #[serde(default)]
    pub vectorizer: VectorizerConfig,

    /// LLM completion provider configuration
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Chunking configuration
    #[serde(default)]
    pub chunking: ChunkingSettings,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted upload body in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Upper bound on one request, including the external calls it makes
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Cluster URL; a bare host is treated as https
    pub cluster_url: Option<String>,

    /// API key sent as a bearer token
    pub api_key: Option<String>,

    /// Name of the single collection holding chunk records
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Objects per batch request
    #[serde(default = "default_store_batch_size")]
    pub batch_size: usize,

    /// Request timeout in seconds
    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VectorizerConfig {
    /// Vectorizer module configured on the collection
    #[serde(default = "default_vectorizer_module")]
    pub module: String,

    /// Embedding model identifier
    pub model: Option<String>,

    /// Embedding provider API key, forwarded by the store
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CompletionConfig {
    /// OpenAI-compatible API base URL
    pub base_url: Option<String>,

    /// API key
    pub api_key: Option<String>,

    /// Model name
    pub model: Option<String>,

    /// System instruction sent ahead of every prompt
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Request timeout in seconds
    #[serde(default = "default_completion_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChunkingSettings {
    /// Maximum chunk length in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared with the preceding chunk
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// How stored record ids are derived
    #[serde(default)]
    pub id_strategy: IdStrategy,
}

/// Record id derivation strategy
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    /// UUIDv5 of the chunk's sequence index; re-ingestion overwrites
    #[default]
    Positional,
    /// UUIDv5 of document hash, index and body; documents accumulate
    ContentAddressed,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error) used when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Service name reported in logs
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 5000 }
fn default_max_upload_bytes() -> usize { 20 * 1024 * 1024 }
fn default_request_timeout() -> u64 { 300 }
fn default_collection() -> String { crate::DEFAULT_COLLECTION.to_string() }
fn default_store_batch_size() -> usize { 100 }
fn default_store_timeout() -> u64 { 30 }
fn default_vectorizer_module() -> String { "text2vec-huggingface".to_string() }
fn default_system_prompt() -> String { crate::DEFAULT_SYSTEM_PROMPT.to_string() }
fn default_completion_timeout() -> u64 { 60 }
fn default_chunk_size() -> usize { 1000 }
fn default_chunk_overlap() -> usize { 200 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_service_name() -> String { "lumina".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cluster_url: None,
            api_key: None,
            collection: default_collection(),
            batch_size: default_store_batch_size(),
            timeout_secs: default_store_timeout(),
        }
    }
}

impl Default for VectorizerConfig {
    fn default() -> Self {
        Self {
            module: default_vectorizer_module(),
            model: None,
            api_key: None,
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            model: None,
            system_prompt: default_system_prompt(),
            timeout_secs: default_completion_timeout(),
        }
    }
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            id_strategy: IdStrategy::default(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            service_name: default_service_name(),
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> std::result::Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let mut builder = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__STORE__CLUSTER_URL=https://...
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            );

        for (var, key) in LEGACY_ENV_VARS {
            builder = builder.set_override_option(*key, std::env::var(var).ok())?;
        }

        builder.build()?.try_deserialize()
    }

    /// Fail fast on missing or inconsistent settings
    pub fn validate(&self) -> Result<()> {
        required(&self.store.cluster_url, "store.cluster_url", "CLUSTER_URL")?;
        required(&self.store.api_key, "store.api_key", "WEAVIATE_API_KEY")?;
        required(&self.vectorizer.model, "vectorizer.model", "VECTORIZER_MODEL")?;
        required(&self.vectorizer.api_key, "vectorizer.api_key", "HuggingFace_API")?;
        required(&self.completion.base_url, "completion.base_url", "BASE_URL")?;
        required(&self.completion.api_key, "completion.api_key", "OPENROUTER_KEY")?;
        required(&self.completion.model, "completion.model", "LLM")?;

        if self.chunking.chunk_size == 0 {
            return Err(AppError::Configuration {
                message: "chunking.chunk_size must be greater than zero".to_string(),
            });
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(AppError::Configuration {
                message: format!(
                    "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                    self.chunking.chunk_overlap, self.chunking.chunk_size
                ),
            });
        }
        if self.store.batch_size == 0 {
            return Err(AppError::Configuration {
                message: "store.batch_size must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Socket address string to bind
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Get store request timeout as Duration
    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store.timeout_secs)
    }

    /// Get completion request timeout as Duration
    pub fn completion_timeout(&self) -> Duration {
        Duration::from_secs(self.completion.timeout_secs)
    }
}

/// Return a required, non-blank setting or name it in the error.
pub fn required<'a>(value: &'a Option<String>, key: &str, env_var: &str) -> Result<&'a str> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::ConfigurationMissing {
            key: format!(
                "{} (set APP__{} or {})",
                key,
                key.to_uppercase().replace('.', "__"),
                env_var
            ),
        }),
    }
}
