//! Configuration types for the enrichment proxy
//!
//! Configuration is read once at start-up and passed explicitly into the
//! pipeline and the HTTP surface; nothing reads process-wide state afterwards.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{ProxyError, Result};
use crate::path::PathExpression;

/// Default Titan text embedding model
pub const DEFAULT_EMBEDDING_MODEL: &str = "amazon.titan-embed-text-v2:0";

/// Main proxy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Base URL of the downstream document store
    pub store_url: String,

    /// Path expressions of the fields to enrich, applied in order
    pub paths: Vec<String>,

    /// Compute the enriched payload but never forward it
    pub dry_run: bool,

    /// Listen port
    pub port: u16,

    /// Mount point of the proxy routes (e.g. "/opensearch")
    pub mount_path: String,

    /// Maximum number of bulk pairs enriched at once
    pub max_concurrency: usize,

    /// Response field receiving the pipeline latency in milliseconds
    pub latency_field: String,

    /// Skip TLS certificate verification towards the store.
    ///
    /// On by default so self-signed development clusters work out of the
    /// box; set to `false` for stores with trusted certificates.
    pub accept_invalid_certs: bool,

    /// Timeout for downstream store requests
    #[serde(with = "humantime_serde")]
    pub store_timeout: Duration,

    /// Largest inbound request body accepted, in bytes
    pub max_body_size: usize,

    /// Embedding provider configuration
    pub embeddings: EmbeddingsConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            store_url: "https://localhost:9200".to_string(),
            paths: Vec::new(),
            dry_run: false,
            port: 8080,
            mount_path: "/opensearch".to_string(),
            max_concurrency: 10,
            latency_field: "ingest_took".to_string(),
            accept_invalid_certs: true,
            store_timeout: Duration::from_secs(60),
            max_body_size: 100 * 1024 * 1024,
            embeddings: EmbeddingsConfig::default(),
        }
    }
}

/// Embedding provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    /// Amazon Bedrock runtime (Titan text embeddings wire format)
    #[default]
    Bedrock,
    /// OpenAI-compatible `/embeddings` endpoint
    OpenAI,
}

/// Embeddings configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingsConfig {
    /// Provider type
    pub provider: EmbeddingProvider,

    /// Model identifier
    pub model: String,

    /// Output dimensionality, sent to models that accept it
    pub dimensions: usize,

    /// Bedrock region (falls back to AWS_REGION, then us-west-2)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Endpoint override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// API key (prefer provider-specific env vars)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Timeout for a single embedding call
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::Bedrock,
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimensions: 1024,
            region: None,
            base_url: None,
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl ProxyConfig {
    /// Load configuration from file and environment variables.
    ///
    /// Loads in this order:
    /// 1. Default configuration
    /// 2. Configuration file (vectorproxy.toml, then VECTORPROXY_CONFIG_PATH)
    /// 3. Explicit file passed by the caller
    /// 4. Environment variable overrides (`VECTORPROXY_`, nested keys split on `__`)
    ///
    /// The result is not validated so that command-line overrides can still
    /// be applied; call [`ProxyConfig::validate`] once they are.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        use figment::{
            Figment,
            providers::{Env, Format, Serialized, Toml},
        };

        let mut figment = Figment::from(Serialized::defaults(ProxyConfig::default()))
            .merge(Toml::file("vectorproxy.toml"));

        if let Ok(path) = std::env::var("VECTORPROXY_CONFIG_PATH") {
            figment = figment.merge(Toml::file(path));
        }

        if let Some(path) = file {
            figment = figment.merge(Toml::file(path));
        }

        figment
            .merge(Env::prefixed("VECTORPROXY_").split("__").ignore(&["config_path"]))
            .extract()
            .map_err(|e| ProxyError::Configuration(format!("Failed to load configuration: {}", e)))
    }

    /// Load and validate configuration from a specific file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        use figment::{
            Figment,
            providers::{Format, Serialized, Toml},
        };

        let config: ProxyConfig = Figment::from(Serialized::defaults(ProxyConfig::default()))
            .merge(Toml::file(path.as_ref()))
            .extract()
            .map_err(|e| {
                ProxyError::Configuration(format!("Failed to load configuration file: {}", e))
            })?;

        config.validate()?;
        Ok(config)
    }

    /// Replace the configured paths with a comma-separated list.
    pub fn set_paths_csv(&mut self, csv: &str) {
        self.paths = split_paths(csv);
    }

    /// Parse every configured path expression, in configured order.
    pub fn path_expressions(&self) -> Result<Vec<PathExpression>> {
        self.paths.iter().map(|p| PathExpression::parse(p)).collect()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a setting is out of range or a path expression is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.store_url.trim().is_empty() {
            return Err(ProxyError::Configuration("store_url must not be empty".to_string()));
        }
        if self.max_concurrency == 0 {
            return Err(ProxyError::Configuration(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.max_body_size == 0 {
            return Err(ProxyError::Configuration(
                "max_body_size must be at least 1 byte".to_string(),
            ));
        }
        if self.latency_field.trim().is_empty() {
            return Err(ProxyError::Configuration(
                "latency_field must not be empty".to_string(),
            ));
        }
        if !self.mount_path.starts_with('/') {
            return Err(ProxyError::Configuration(format!(
                "mount_path must start with '/': {}",
                self.mount_path
            )));
        }
        if self.embeddings.model.trim().is_empty() {
            return Err(ProxyError::Configuration(
                "embeddings.model must not be empty".to_string(),
            ));
        }
        self.path_expressions()?;
        Ok(())
    }
}

/// Split a comma-separated list of path expressions, dropping blanks.
pub fn split_paths(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}
