//! Embedding backend configuration.
//!
//! Configuration is environment-variable driven with defaults from
//! `quire_core::defaults`:
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `QUIRE_OLLAMA_URL` | `http://127.0.0.1:11434` | Ollama base URL |
//! | `QUIRE_EMBED_MODEL` | `all-minilm` | Embedding model name |
//! | `QUIRE_EMBED_DIM` | `384` | Expected vector dimension |
//! | `QUIRE_EMBED_TIMEOUT_SECS` | `30` | Per-request timeout |

use serde::{Deserialize, Serialize};

use quire_core::{defaults, Error, Result};

/// Configuration for the embedding backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Base URL for the Ollama API.
    pub base_url: String,
    /// Embedding model name.
    pub model: String,
    /// Expected embedding vector dimension.
    pub dimension: usize,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::OLLAMA_URL.to_string(),
            model: defaults::EMBED_MODEL.to_string(),
            dimension: defaults::EMBED_DIMENSION,
            timeout_secs: defaults::EMBED_TIMEOUT_SECS,
        }
    }
}

impl EmbeddingConfig {
    /// Create config from environment variables (with defaults).
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("QUIRE_OLLAMA_URL").unwrap_or_else(|_| defaults::OLLAMA_URL.to_string());
        let model =
            std::env::var("QUIRE_EMBED_MODEL").unwrap_or_else(|_| defaults::EMBED_MODEL.to_string());
        let dimension = std::env::var("QUIRE_EMBED_DIM")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::EMBED_DIMENSION);
        let timeout_secs = std::env::var("QUIRE_EMBED_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::EMBED_TIMEOUT_SECS);

        Self {
            base_url,
            model,
            dimension,
            timeout_secs,
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "Base URL must start with http:// or https://, got: {}",
                self.base_url
            )));
        }
        if self.model.is_empty() {
            return Err(Error::Config("Embedding model cannot be empty".to_string()));
        }
        if self.dimension == 0 {
            return Err(Error::Config(
                "Embedding dimension must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = EmbeddingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.dimension, 384);
        assert_eq!(config.model, "all-minilm");
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let config = EmbeddingConfig {
            base_url: "localhost:11434".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_model() {
        let config = EmbeddingConfig {
            model: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_dimension() {
        let config = EmbeddingConfig {
            dimension: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
