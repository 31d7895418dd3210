//! Configuration management

use crate::error::{CodeweaveError, Result};
use crate::search::FusionConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Retrieval pipeline tuning
    #[serde(default)]
    pub search: SearchConfig,

    /// Embedding and rerank service configuration
    #[serde(default)]
    pub services: ServiceConfig,
}

/// Limits and switches for every retrieval stage.
///
/// A zero limit disables the corresponding expansion strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub vector_top_k: usize,
    pub lexical_top_k: usize,
    pub fusion: FusionConfig,
    /// Candidates kept per file before rerank; `<= 0` keeps everything
    pub pre_rerank_per_file_cap: i64,
    pub rerank_top_n: usize,
    pub enable_smart_cutoff: bool,
    pub neighbor_hops: usize,
    pub breadcrumb_expand_limit: usize,
    pub import_files_per_seed: usize,
    pub chunks_per_import_file: usize,
    pub max_segments_per_file: usize,
    pub max_total_chars: usize,
    pub channel_timeout_ms: u64,
    pub rerank_timeout_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            vector_top_k: 100,
            lexical_top_k: 100,
            fusion: FusionConfig::default(),
            pre_rerank_per_file_cap: 3,
            rerank_top_n: 20,
            enable_smart_cutoff: false,
            neighbor_hops: 2,
            breadcrumb_expand_limit: 3,
            import_files_per_seed: 0,
            chunks_per_import_file: 0,
            max_segments_per_file: 3,
            max_total_chars: 48_000,
            channel_timeout_ms: 30_000,
            rerank_timeout_ms: 15_000,
        }
    }
}

impl SearchConfig {
    /// Check the embedded fusion parameters
    pub fn validate(&self) -> Result<()> {
        self.fusion.validate()?;
        if self.vector_top_k == 0 || self.lexical_top_k == 0 {
            return Err(CodeweaveError::Config(
                "vector_top_k and lexical_top_k must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn channel_timeout(&self) -> Duration {
        Duration::from_millis(self.channel_timeout_ms)
    }

    pub fn rerank_timeout(&self) -> Duration {
        Duration::from_millis(self.rerank_timeout_ms)
    }
}

/// External embedding and rerank services
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Full URL of an OpenAI-compatible embeddings endpoint
    #[serde(default)]
    pub embeddings_url: Option<String>,

    #[serde(default = "default_embeddings_model")]
    pub embeddings_model: String,

    #[serde(default)]
    pub embeddings_api_key: Option<String>,

    /// Embedding dimensions (defaults to 1024 when not specified)
    #[serde(default)]
    pub embeddings_dimensions: Option<usize>,

    /// Full URL of a Cohere-compatible rerank endpoint; rerank is skipped when unset
    #[serde(default)]
    pub rerank_url: Option<String>,

    #[serde(default = "default_rerank_model")]
    pub rerank_model: String,

    #[serde(default)]
    pub rerank_api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            embeddings_url: std::env::var("CODEWEAVE_EMBEDDINGS_URL").ok(),
            embeddings_model: default_embeddings_model(),
            embeddings_api_key: std::env::var("CODEWEAVE_EMBEDDINGS_API_KEY").ok(),
            embeddings_dimensions: std::env::var("CODEWEAVE_EMBEDDINGS_DIMENSIONS")
                .ok()
                .and_then(|s| s.parse().ok()),
            rerank_url: std::env::var("CODEWEAVE_RERANK_URL").ok(),
            rerank_model: default_rerank_model(),
            rerank_api_key: std::env::var("CODEWEAVE_RERANK_API_KEY").ok(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_embeddings_model() -> String {
    std::env::var("CODEWEAVE_EMBEDDINGS_MODEL").unwrap_or_else(|_| "BAAI/bge-m3".to_string())
}

fn default_rerank_model() -> String {
    std::env::var("CODEWEAVE_RERANK_MODEL")
        .unwrap_or_else(|_| "BAAI/bge-reranker-v2-m3".to_string())
}

fn default_timeout() -> u64 {
    30
}

impl Config {
    /// Load config from default path
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path())
    }

    /// Load config from an explicit path, falling back to defaults when absent
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_yaml::from_str::<Config>(&content)?
        } else {
            Config::default()
        };
        config.search.validate()?;
        Ok(config)
    }

    /// Save config to default path
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }
}
