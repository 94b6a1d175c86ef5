//! Ollama embedding backend implementation.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use quire_core::{EmbeddingBackend, Error, Result, Vector};

use crate::config::EmbeddingConfig;

/// Ollama embedding backend.
///
/// Talks to a local Ollama instance over HTTP. Model weights live inside the
/// Ollama process; from quire's side "loading the model" means confirming the
/// configured model is present (`ensure_model`) and then batching texts
/// through `/api/embed`.
pub struct OllamaBackend {
    client: Client,
    config: EmbeddingConfig,
}

#[derive(Serialize)]
struct EmbedRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Deserialize)]
struct TagsResponse {
    models: Vec<TagModel>,
}

#[derive(Deserialize)]
struct TagModel {
    name: String,
}

impl OllamaBackend {
    /// Create a new Ollama backend with default settings.
    pub fn new() -> Self {
        Self::with_config(EmbeddingConfig::default())
    }

    /// Create a new Ollama backend with custom configuration.
    pub fn with_config(config: EmbeddingConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    /// Create from environment variables.
    pub fn from_env() -> Self {
        Self::with_config(EmbeddingConfig::from_env())
    }

    /// Verify the configured model is present in the Ollama instance.
    ///
    /// Fails with `ModelUnavailable` when the instance is unreachable or the
    /// model has not been pulled.
    pub async fn ensure_model(&self) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.config.base_url))
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| {
                Error::ModelUnavailable(format!(
                    "Ollama unreachable at {}: {}",
                    self.config.base_url, e
                ))
            })?;

        if !response.status().is_success() {
            return Err(Error::ModelUnavailable(format!(
                "Ollama returned {} from /api/tags",
                response.status()
            )));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| Error::ModelUnavailable(format!("Failed to parse model list: {}", e)))?;

        // Ollama reports names with a tag suffix ("all-minilm:latest")
        let wanted = &self.config.model;
        let present = tags
            .models
            .iter()
            .any(|m| m.name == *wanted || m.name.split(':').next() == Some(wanted.as_str()));

        if !present {
            return Err(Error::ModelUnavailable(format!(
                "Model '{}' not found; pull it with `ollama pull {}`",
                wanted, wanted
            )));
        }

        Ok(())
    }

    /// Check if the backend is reachable.
    pub async fn health_check(&self) -> Result<bool> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.config.base_url))
            .timeout(Duration::from_secs(5))
            .send()
            .await;

        match response {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }
}

impl Default for OllamaBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingBackend for OllamaBackend {
    #[instrument(skip(self, texts), fields(subsystem = "inference", component = "ollama", op = "embed_texts", model = %self.config.model, input_count = texts.len()))]
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vector>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let start = Instant::now();

        let request = EmbedRequest {
            model: self.config.model.clone(),
            input: texts.to_vec(),
        };

        let response = self
            .client
            .post(format!("{}/api/embed", self.config.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::ModelUnavailable(format!("Embed request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::ModelUnavailable(format!(
                "Ollama returned {}: {}",
                status, body
            )));
        }

        let result: EmbedResponse = response
            .json()
            .await
            .map_err(|e| Error::ModelUnavailable(format!("Failed to parse response: {}", e)))?;

        if result.embeddings.len() != texts.len() {
            return Err(Error::ModelUnavailable(format!(
                "Ollama returned {} vectors for {} inputs",
                result.embeddings.len(),
                texts.len()
            )));
        }

        let elapsed = start.elapsed().as_millis() as u64;
        debug!(
            result_count = result.embeddings.len(),
            duration_ms = elapsed,
            "Embedding complete"
        );
        if elapsed > 5000 {
            warn!(
                duration_ms = elapsed,
                input_count = texts.len(),
                slow = true,
                "Slow embedding operation"
            );
        }

        Ok(result.embeddings)
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}
